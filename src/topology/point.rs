use serde::{Deserialize, Serialize};

use crate::topology::EdgeId;

/// A position upon an edge, expressed as the edge's identifier and
/// the fraction of the edge covered, where `0` is the edge's source
/// and `1` is its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePoint {
    pub edge: EdgeId,
    pub fraction: f64,
}

impl EdgePoint {
    pub fn new(edge: EdgeId, fraction: f64) -> Self {
        Self { edge, fraction }
    }
}
