/// Cost function of an edge, consumed by a [`Router`](crate::topology::Router)
/// for searching and bounding.
///
/// The cost of a fraction of an edge is, unless overridden,
/// linear in the fraction.
pub trait Cost<E>: Send + Sync {
    /// The cost of traversing the entire edge.
    fn cost(&self, edge: &E) -> f64;

    /// The cost of traversing the given fraction of the edge.
    fn cost_fraction(&self, edge: &E, fraction: f64) -> f64 {
        self.cost(edge) * fraction
    }
}
