use std::sync::Arc;

use serde_json::Value;

use crate::markov::{Factory, KState, StateCandidate, StateError};
use crate::matcher::MatcherSample;
use crate::roadmap::{RoadMap, RoadPoint, Route};

/// The route between the points of two candidates of subsequent samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcherTransition {
    route: Route,
}

impl MatcherTransition {
    pub fn new(route: Route) -> Self {
        Self { route }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }
}

/// A position on the road network hypothesised for a sample.
pub type MatcherCandidate = StateCandidate<RoadPoint, MatcherTransition>;

/// The match state over a window of samples.
pub type MatcherKState = KState<RoadPoint, MatcherTransition, MatcherSample>;

/// Reads and writes the map matching parts of a state snapshot, resolving
/// roads against the map.
#[derive(Debug, Clone)]
pub struct MatcherFactory {
    map: Arc<RoadMap>,
}

impl MatcherFactory {
    pub fn new(map: Arc<RoadMap>) -> Self {
        Self { map }
    }
}

fn malformed(error: impl ToString) -> StateError {
    StateError::MalformedSnapshot(error.to_string())
}

impl Factory for MatcherFactory {
    type Payload = RoadPoint;
    type Transition = MatcherTransition;
    type Sample = MatcherSample;

    const PAYLOAD: &'static str = "point";

    fn payload_to_json(&self, payload: &RoadPoint) -> Result<Value, StateError> {
        Ok(payload.to_json())
    }

    fn payload(&self, json: &Value) -> Result<RoadPoint, StateError> {
        RoadPoint::from_json(json, &self.map).map_err(malformed)
    }

    fn transition_to_json(&self, transition: &MatcherTransition) -> Result<Value, StateError> {
        Ok(serde_json::json!({ "route": transition.route.to_json() }))
    }

    fn transition(&self, json: &Value) -> Result<MatcherTransition, StateError> {
        let route = json
            .get("route")
            .ok_or_else(|| malformed("transition is missing its route"))?;

        Route::from_json(route, &self.map)
            .map(MatcherTransition::new)
            .map_err(malformed)
    }

    fn sample_to_json(&self, sample: &MatcherSample) -> Result<Value, StateError> {
        Ok(sample.to_json())
    }

    fn sample(&self, json: &Value) -> Result<MatcherSample, StateError> {
        MatcherSample::from_json(json).map_err(malformed)
    }
}
