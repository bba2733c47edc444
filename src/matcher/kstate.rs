//! Exports of a match state: the matched path as GeoJSON, compact and debug
//! JSON of the matched sequence, and the current estimate for live monitoring.

use geo::{LineString, MultiLineString};
use serde_json::{json, Value};
use wkt::ToWkt;

use crate::markov::Sample;
use crate::matcher::{MatcherCandidate, MatcherKState};
use crate::roadmap::RoadMap;

/// Formats a [`MatcherKState`] for consumers outside the matcher.
pub trait StateExport {
    /// The routes of the matched sequence as a GeoJSON `MultiLineString`.
    fn to_geojson(&self, map: &RoadMap) -> Value;

    /// Per matched sample, its time and point, with the route leading to it as WKT.
    fn to_slim_json(&self, map: &RoadMap) -> Value;

    /// The samples alongside the matched sequence and its geometries.
    fn to_debug_json(&self, map: &RoadMap) -> Value;

    /// The current estimate, the path leading to it and every
    /// candidate of the latest sample with its probability.
    fn to_monitor_json(&self, map: &RoadMap) -> Value;
}

fn route_geometry(candidate: &MatcherCandidate, map: &RoadMap) -> Option<LineString> {
    candidate
        .transition()
        .map(|transition| transition.route().geometry(map))
}

fn routes(state: &MatcherKState, map: &RoadMap) -> MultiLineString {
    MultiLineString::new(
        state
            .sequence()
            .into_iter()
            .filter_map(|candidate| route_geometry(candidate, map))
            .collect(),
    )
}

impl StateExport for MatcherKState {
    fn to_geojson(&self, map: &RoadMap) -> Value {
        let coordinates = routes(self, map)
            .0
            .iter()
            .map(|line| {
                line.coords()
                    .map(|coord| json!([coord.x, coord.y]))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        json!({
            "type": "MultiLineString",
            "coordinates": coordinates,
        })
    }

    fn to_slim_json(&self, map: &RoadMap) -> Value {
        let sequence = self.sequence();

        Value::Array(
            self.samples()
                .zip(sequence)
                .map(|(sample, candidate)| {
                    let mut entry = json!({
                        "time": sample.time(),
                        "point": candidate.payload().to_json(),
                    });

                    if let Some(route) = route_geometry(candidate, map) {
                        entry["route"] = json!(route.wkt_string());
                    }

                    entry
                })
                .collect(),
        )
    }

    fn to_debug_json(&self, map: &RoadMap) -> Value {
        let samples = self.samples().map(|sample| sample.to_json()).collect::<Vec<_>>();

        let sequence = self
            .samples()
            .zip(self.sequence())
            .map(|(sample, candidate)| {
                let point = candidate.payload();
                let mut entry = json!({
                    "time": sample.time() / 1000,
                    "id": candidate.id().as_str(),
                    "road": point.road(),
                    "frac": point.fraction(),
                    "geom": point.position().wkt_string(),
                    "filtprob": candidate.filtprob(),
                });

                if let Some(route) = route_geometry(candidate, map) {
                    entry["route"] = json!(route.wkt_string());
                }

                entry
            })
            .collect::<Vec<_>>();

        json!({
            "samples": samples,
            "sequence": sequence,
        })
    }

    fn to_monitor_json(&self, map: &RoadMap) -> Value {
        let Some(estimate) = self.estimate() else {
            return json!({});
        };

        let candidates = self
            .vector()
            .into_iter()
            .map(|candidate| {
                let mut entry = json!({
                    "point": candidate.payload().position().wkt_string(),
                    "prob": candidate.filtprob(),
                });

                if let Some(route) = route_geometry(candidate, map) {
                    entry["route"] = json!(route.wkt_string());
                }

                entry
            })
            .collect::<Vec<_>>();

        json!({
            "time": self.time(),
            "point": estimate.payload().position().wkt_string(),
            "route": routes(self, map).wkt_string(),
            "candidates": candidates,
        })
    }
}
