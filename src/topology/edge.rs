use crate::topology::Cost;

pub type EdgeId = i64;
pub type VertexId = i64;

/// A directed arc of a [`Graph`](crate::topology::Graph), identified by its id
/// and connecting its source vertex to its target vertex.
///
/// Successor and neighbor links are not held by the edge itself, these belong
/// to the graph's adjacency which is produced by
/// [`Graph::construct`](crate::topology::Graph::construct).
pub trait Edge {
    fn id(&self) -> EdgeId;
    fn source(&self) -> VertexId;
    fn target(&self) -> VertexId;
}

/// A plain weighted edge, useful for routing over topologies
/// which carry no geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge {
    pub id: EdgeId,
    pub source: VertexId,
    pub target: VertexId,
    pub weight: f64,
}

impl WeightedEdge {
    pub fn new(id: EdgeId, source: VertexId, target: VertexId, weight: f64) -> Self {
        Self {
            id,
            source,
            target,
            weight,
        }
    }
}

impl Edge for WeightedEdge {
    #[inline]
    fn id(&self) -> EdgeId {
        self.id
    }

    #[inline]
    fn source(&self) -> VertexId {
        self.source
    }

    #[inline]
    fn target(&self) -> VertexId {
        self.target
    }
}

/// Costs a [`WeightedEdge`] by its weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct Weight;

impl Cost<WeightedEdge> for Weight {
    fn cost(&self, edge: &WeightedEdge) -> f64 {
        edge.weight
    }
}
