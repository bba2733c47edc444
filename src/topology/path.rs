use serde::{Deserialize, Serialize};

use crate::topology::{Cost, Edge, EdgeId, EdgePoint, Graph, TopologyError};

/// A connected sequence of edges between two points on the network.
///
/// The first edge is the source point's edge and the last edge is the target
/// point's edge. Each pair of consecutive edges is linked as successors, and a
/// path of a single edge never runs backwards along it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    source: EdgePoint,
    target: EdgePoint,
    edges: Vec<EdgeId>,
}

impl Path {
    /// A path that starts and ends at the same point.
    pub fn single(point: EdgePoint) -> Self {
        Self {
            source: point,
            target: point,
            edges: vec![point.edge],
        }
    }

    /// Creates a path, failing if it is not [valid](Path::valid) within the graph.
    pub fn new<E: Edge>(
        source: EdgePoint,
        target: EdgePoint,
        edges: Vec<EdgeId>,
        graph: &Graph<E>,
    ) -> Result<Self, TopologyError> {
        let path = Self {
            source,
            target,
            edges,
        };

        if !path.valid(graph) {
            return Err(TopologyError::InvalidPath {
                from: path.source.edge,
                to: path.target.edge,
            });
        }

        Ok(path)
    }

    pub fn source(&self) -> &EdgePoint {
        &self.source
    }

    pub fn target(&self) -> &EdgePoint {
        &self.target
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn valid<E: Edge>(&self, graph: &Graph<E>) -> bool {
        let (Some(first), Some(last)) = (self.edges.first(), self.edges.last()) else {
            return false;
        };

        if *first != self.source.edge || *last != self.target.edge {
            return false;
        }

        if self.source.edge == self.target.edge
            && self.source.fraction > self.target.fraction
            && self.edges.len() == 1
        {
            return false;
        }

        self.edges
            .windows(2)
            .all(|pair| graph.is_successor(pair[0], pair[1]))
    }

    /// The cost of the path, which is the remainder of the source edge, every
    /// following edge in full, less the remainder of the target edge.
    pub fn cost<E: Edge>(&self, graph: &Graph<E>, cost: &dyn Cost<E>) -> f64 {
        let remainder = |point: &EdgePoint| {
            graph
                .get(point.edge)
                .map(|edge| cost.cost_fraction(edge, 1.0 - point.fraction))
                .unwrap_or_default()
        };

        let interior: f64 = self
            .edges
            .iter()
            .skip(1)
            .filter_map(|id| graph.get(*id))
            .map(|edge| cost.cost(edge))
            .sum();

        remainder(&self.source) + interior - remainder(&self.target)
    }

    /// Appends another path which continues from this path's target,
    /// returning whether the two paths were contiguous.
    ///
    /// Paths are contiguous if the other path starts exactly where this path
    /// ends, or if this path ends at the very end of its edge and the other path
    /// starts at the very beginning of an edge leaving that vertex.
    pub fn add<E: Edge>(&mut self, other: &Path, graph: &Graph<E>) -> bool {
        if self.target.edge == other.source.edge {
            if self.target.fraction != other.source.fraction {
                return false;
            }

            self.edges.extend(other.edges.iter().skip(1));
        } else {
            let adjacent = match (graph.get(self.target.edge), graph.get(other.source.edge)) {
                (Some(end), Some(start)) => end.target() == start.source(),
                _ => false,
            };

            if !adjacent || self.target.fraction != 1.0 || other.source.fraction != 0.0 {
                return false;
            }

            self.edges.extend(other.edges.iter());
        }

        self.target = other.target;
        true
    }
}
