use chrono::DateTime;
use geo::Point;
use serde_json::{json, Map, Value};
use wkt::{ToWkt, TryFromWkt};

use crate::markov::Sample;
use crate::matcher::MatchError;

/// Format of textual sample times, such as `2014-09-10 06:54:07+0200`.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%#z";

/// A position measurement to be matched, with an optional heading.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherSample {
    id: String,
    time: i64,
    point: Point,
    azimuth: Option<f64>,
}

impl MatcherSample {
    /// A sample at `time`, in milliseconds since the epoch.
    pub fn new(id: impl Into<String>, time: i64, point: Point) -> Self {
        Self {
            id: id.into(),
            time,
            point,
            azimuth: None,
        }
    }

    /// Sets the heading in degrees clockwise from north.
    pub fn with_azimuth(mut self, azimuth: f64) -> Self {
        self.azimuth = Some(azimuth.rem_euclid(360.0));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn point(&self) -> Point {
        self.point
    }

    pub fn azimuth(&self) -> Option<f64> {
        self.azimuth
    }

    pub fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert("id".into(), json!(self.id));
        json.insert("time".into(), json!(self.time));
        json.insert("point".into(), json!(self.point.wkt_string()));

        if let Some(azimuth) = self.azimuth {
            json.insert("azimuth".into(), json!(azimuth));
        }

        Value::Object(json)
    }

    /// Reads a sample, whose time is either in epoch milliseconds or
    /// a timestamp with offset such as `2014-09-10 06:54:07+0200`.
    pub fn from_json(json: &Value) -> Result<Self, MatchError> {
        let malformed = |reason: &str| MatchError::MalformedSample(format!("{reason} in {json}"));

        let id = match json.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };

        let time = match json.get("time") {
            Some(Value::Number(time)) => time.as_i64().ok_or_else(|| malformed("invalid time"))?,
            Some(Value::String(time)) => DateTime::parse_from_str(time, TIME_FORMAT)
                .map_err(|_| malformed("invalid time"))?
                .timestamp_millis(),
            _ => return Err(malformed("missing time")),
        };

        let point = json
            .get("point")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("missing point"))?;
        let point = Point::<f64>::try_from_wkt_str(point).map_err(|_| malformed("invalid point"))?;

        let sample = Self::new(id, time, point);
        Ok(match json.get("azimuth").and_then(Value::as_f64) {
            Some(azimuth) => sample.with_azimuth(azimuth),
            None => sample,
        })
    }
}

impl Sample for MatcherSample {
    fn time(&self) -> i64 {
        self.time
    }
}
