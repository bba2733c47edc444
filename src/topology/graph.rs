use std::fmt::{Debug, Formatter};
use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use log::debug;
use petgraph::unionfind::UnionFind;
use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::topology::{Edge, EdgeId, VertexId};

pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Successor indices of a single edge.
pub type Adjacency = SmallVec<[usize; 4]>;

/// Directed multigraph of edges.
///
/// Edges are held in an arena, addressable both by their [`EdgeId`] and
/// by their (insertion-ordered) index. The adjacency, being the successor
/// edges of every edge and the neighbor ring of edges sharing a source vertex,
/// only exists between [`construct`](Graph::construct) and
/// [`deconstruct`](Graph::deconstruct). Mutating the graph drops it.
pub struct Graph<E> {
    edges: FxIndexMap<EdgeId, E>,
    successors: Vec<Adjacency>,
    neighbors: Vec<Option<usize>>,
}

impl<E: Edge> Debug for Graph<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Graph with Edges: {} (constructed: {})",
            self.edges.len(),
            self.is_constructed()
        )
    }
}

impl<E> Default for Graph<E> {
    fn default() -> Self {
        Self {
            edges: FxIndexMap::default(),
            successors: Vec::new(),
            neighbors: Vec::new(),
        }
    }
}

impl<E: Edge> Graph<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an edge, replacing any edge of the same identifier.
    pub fn add(&mut self, edge: E) -> &mut Self {
        self.deconstruct();
        self.edges.insert(edge.id(), edge);
        self
    }

    /// Removes the edge of the given identifier, returning it if present.
    pub fn remove(&mut self, id: EdgeId) -> Option<E> {
        self.deconstruct();
        self.edges.shift_remove(&id)
    }

    #[inline]
    pub fn get(&self, id: EdgeId) -> Option<&E> {
        self.edges.get(&id)
    }

    #[inline]
    pub fn index_of(&self, id: EdgeId) -> Option<usize> {
        self.edges.get_index_of(&id)
    }

    #[inline]
    pub fn at(&self, index: usize) -> Option<&E> {
        self.edges.get_index(index).map(|(_, edge)| edge)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &E> {
        self.edges.values()
    }

    pub fn is_constructed(&self) -> bool {
        !self.edges.is_empty() && self.successors.len() == self.edges.len()
    }

    /// Builds the adjacency of the graph.
    ///
    /// Edges are grouped by their source vertex, in insertion order. The successors
    /// of an edge are the group at its target vertex, and each edge's neighbor is the
    /// next edge of its own group, wrapping around to the first.
    pub fn construct(&mut self) -> &mut Self {
        let mut groups: FxIndexMap<VertexId, Adjacency> = FxIndexMap::default();
        for (index, edge) in self.edges.values().enumerate() {
            groups.entry(edge.source()).or_default().push(index);
        }

        self.successors = self
            .edges
            .values()
            .map(|edge| groups.get(&edge.target()).cloned().unwrap_or_default())
            .collect();

        self.neighbors = vec![None; self.edges.len()];
        for group in groups.values() {
            for (position, index) in group.iter().enumerate() {
                self.neighbors[*index] = Some(group[(position + 1) % group.len()]);
            }
        }

        debug!(
            "Constructed topology of {} edges over {} vertices",
            self.edges.len(),
            groups.len()
        );

        self
    }

    /// Drops the adjacency of the graph, leaving every edge without successors.
    pub fn deconstruct(&mut self) {
        self.successors.clear();
        self.neighbors.clear();
    }

    /// Successor indices of the edge at the given index, empty
    /// if the graph is not constructed.
    #[inline]
    pub fn successor_indices(&self, index: usize) -> &[usize] {
        self.successors
            .get(index)
            .map(|adjacency| adjacency.as_slice())
            .unwrap_or(&[])
    }

    /// The edges leaving the target vertex of the given edge.
    pub fn successors(&self, id: EdgeId) -> impl Iterator<Item = &E> {
        let indices: &[usize] = match self.index_of(id) {
            Some(index) => self.successor_indices(index),
            None => &[],
        };

        indices.iter().filter_map(move |index| self.at(*index))
    }

    /// The next edge sharing the source vertex of the given edge.
    pub fn neighbor(&self, id: EdgeId) -> Option<&E> {
        let index = self.index_of(id)?;
        let neighbor = (*self.neighbors.get(index)?)?;
        self.at(neighbor)
    }

    /// Whether `next` is a successor of `edge`.
    pub fn is_successor(&self, edge: EdgeId, next: EdgeId) -> bool {
        self.successors(edge).any(|successor| successor.id() == next)
    }

    /// Partitions the edges into weakly connected components, where an edge is
    /// connected to its successors and to its neighbors.
    ///
    /// Components are ordered by their first edge in insertion order.
    pub fn components(&self) -> Vec<Vec<EdgeId>> {
        let mut union = UnionFind::<usize>::new(self.edges.len());

        for index in 0..self.edges.len() {
            for successor in self.successor_indices(index) {
                union.union(index, *successor);
            }

            if let Some(Some(neighbor)) = self.neighbors.get(index) {
                union.union(index, *neighbor);
            }
        }

        let mut components: FxIndexMap<usize, Vec<EdgeId>> = FxIndexMap::default();
        for (index, id) in self.edges.keys().enumerate() {
            components.entry(union.find(index)).or_default().push(*id);
        }

        components.into_values().collect()
    }
}

impl<E: Edge> FromIterator<E> for Graph<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        let mut graph = Graph::new();
        for edge in iter {
            graph.edges.insert(edge.id(), edge);
        }
        graph
    }
}
