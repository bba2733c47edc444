use rustc_hash::{FxHashMap, FxHashSet};

use crate::roadmap::{Road, RoadPoint};
use crate::topology::{Edge, EdgeId, Graph};

/// Fractions equal within this precision are considered equal.
pub const PRECISION: f64 = 1e-8;

fn round(value: f64) -> f64 {
    (value / PRECISION).round() * PRECISION
}

/// Reduces the points around a sample, one per road, to those which are not
/// redundant with another point.
///
/// A point at the very start of a road is redundant with a point at the very end
/// of a road leading into it, and the point at the end is redundant itself if each
/// of its road's successors holds a point. That is, of a junction, only the points
/// on the roads leaving it are kept, unless any of these roads lacks a point.
pub fn minimize(candidates: &[RoadPoint], graph: &Graph<Road>) -> Vec<RoadPoint> {
    let points = candidates
        .iter()
        .map(|point| (point.road(), point))
        .collect::<FxHashMap<EdgeId, &RoadPoint>>();

    let mut misses = FxHashMap::<EdgeId, usize>::default();
    let mut removes = FxHashSet::<EdgeId>::default();

    for candidate in candidates {
        let missed = misses.entry(candidate.road()).or_default();

        for successor in graph.successors(candidate.road()) {
            match points.get(&successor.id()) {
                None => *missed += 1,
                Some(point) if round(point.fraction()) == 0.0 => {
                    removes.insert(successor.id());
                    *missed += 1;
                }
                Some(_) => {}
            }
        }
    }

    for candidate in candidates {
        let id = candidate.road();
        if !removes.contains(&id)
            && round(candidate.fraction()) == 1.0
            && misses.get(&id).copied().unwrap_or_default() == 0
        {
            removes.insert(id);
        }
    }

    let mut kept = FxHashSet::default();
    candidates
        .iter()
        .filter(|point| !removes.contains(&point.road()) && kept.insert(point.road()))
        .copied()
        .collect()
}
