/// A measurement of the hidden state, taken at a point in time.
pub trait Sample {
    /// Time of the measurement in milliseconds since the epoch.
    fn time(&self) -> i64;
}
