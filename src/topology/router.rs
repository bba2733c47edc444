use crate::topology::{Cost, Edge, EdgeId, EdgePoint, Graph};

/// Bounds a search by a secondary cost, such that labels whose
/// bounding cost exceeds `max` end the search.
pub struct Bound<'a, E> {
    pub cost: &'a dyn Cost<E>,
    pub max: f64,
}

impl<'a, E> Bound<'a, E> {
    pub fn new(cost: &'a dyn Cost<E>, max: f64) -> Self {
        Self { cost, max }
    }
}

impl<E> Clone for Bound<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Bound<'_, E> {}

/// The edges of a route, alongside the source point it was found from.
pub type Routed = (EdgePoint, Vec<EdgeId>);

/// Finds minimum-cost paths between points on a [`Graph`].
///
/// Results for multiple targets are returned in the same order as the
/// targets were given, with `None` where no path exists within the bound.
pub trait Router<E: Edge> {
    /// Routes from any of the sources to each of the targets, reporting the
    /// source the winning path started from.
    fn route_many(
        &self,
        graph: &Graph<E>,
        sources: &[EdgePoint],
        targets: &[EdgePoint],
        cost: &dyn Cost<E>,
        bound: Option<Bound<'_, E>>,
    ) -> Vec<Option<Routed>>;

    /// Routes from a single source to each of the targets.
    fn route_targets(
        &self,
        graph: &Graph<E>,
        source: &EdgePoint,
        targets: &[EdgePoint],
        cost: &dyn Cost<E>,
        bound: Option<Bound<'_, E>>,
    ) -> Vec<Option<Vec<EdgeId>>> {
        self.route_many(graph, std::slice::from_ref(source), targets, cost, bound)
            .into_iter()
            .map(|routed| routed.map(|(_, edges)| edges))
            .collect()
    }

    /// Routes from a single source to a single target.
    fn route(
        &self,
        graph: &Graph<E>,
        source: &EdgePoint,
        target: &EdgePoint,
        cost: &dyn Cost<E>,
        bound: Option<Bound<'_, E>>,
    ) -> Option<Vec<EdgeId>> {
        self.route_targets(graph, source, std::slice::from_ref(target), cost, bound)
            .into_iter()
            .next()
            .flatten()
    }
}
