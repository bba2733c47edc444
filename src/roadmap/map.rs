use std::sync::Arc;

use geo::Point;
use log::info;
use measure_time::debug_time;

use crate::roadmap::{BaseRoad, Heading, Road, RoadMapError, RoadPoint};
use crate::spatial::{Geography, Interception, RTreeIndex, SpatialIndex};
use crate::topology::{Edge, EdgeId, Graph};

/// The road network, being the directed [`Road`]s of its [`BaseRoad`]s
/// alongside a spatial index over their geometries.
///
/// Roads are routable and searchable once the map is [constructed](RoadMap::construct).
#[derive(Debug, Default)]
pub struct RoadMap {
    graph: Graph<Road>,
    index: Option<RTreeIndex<Geography>>,
}

impl RoadMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The directed roads of a base road: its forward road and,
    /// unless it is one-way, its backward road.
    pub fn split(base: BaseRoad) -> Vec<Road> {
        let base = Arc::new(base);

        let mut roads = vec![Road::new(Arc::clone(&base), Heading::Forward)];
        if !base.is_oneway() {
            roads.push(Road::new(base, Heading::Backward));
        }

        roads
    }

    /// Adds the roads of a base road, dropping any constructed topology and index.
    pub fn add(&mut self, base: BaseRoad) -> &mut Self {
        self.index = None;
        for road in Self::split(base) {
            self.graph.add(road);
        }

        self
    }

    /// Builds the road topology and the spatial index.
    pub fn construct(&mut self) -> &mut Self {
        debug_time!("construct road map");
        info!("index and topology constructing ...");

        self.graph.construct();

        let geometries = self
            .graph
            .edges()
            .filter(|road| road.heading() == Heading::Forward)
            .map(|road| (road.base().id(), road.base().geometry().clone()));

        self.index = Some(RTreeIndex::bulk_load(Geography, geometries));

        info!(
            "index and topology constructed with {} roads",
            self.graph.size()
        );
        self
    }

    pub fn deconstruct(&mut self) {
        self.graph.deconstruct();
        self.index = None;
        info!("road map deconstructed");
    }

    pub fn is_constructed(&self) -> bool {
        self.index.is_some() && self.graph.is_constructed()
    }

    pub fn graph(&self) -> &Graph<Road> {
        &self.graph
    }

    pub fn road(&self, id: EdgeId) -> Option<&Road> {
        self.graph.get(id)
    }

    pub fn size(&self) -> usize {
        self.graph.size()
    }

    /// The point at a fraction of a road.
    pub fn point(&self, road: EdgeId, fraction: f64) -> Result<RoadPoint, RoadMapError> {
        self.road(road)
            .map(|road| RoadPoint::new(road, fraction))
            .ok_or(RoadMapError::UnknownRoad(road))
    }

    /// Spatial search of road points, failing if the map is not constructed.
    pub fn spatial(&self) -> Result<RoadIndex<'_>, RoadMapError> {
        self.index
            .as_ref()
            .map(|index| RoadIndex { map: self, index })
            .ok_or(RoadMapError::IndexNotConstructed)
    }
}

impl FromIterator<BaseRoad> for RoadMap {
    fn from_iter<T: IntoIterator<Item = BaseRoad>>(iter: T) -> Self {
        let mut map = RoadMap::new();
        for base in iter {
            map.add(base);
        }

        map
    }
}

/// Searches the roads of a [`RoadMap`] for their points closest to a position.
///
/// The index holds base road geometries, so every hit yields the point on the
/// forward road and, for bidirectional roads, its counterpart on the backward road.
#[derive(Debug, Clone, Copy)]
pub struct RoadIndex<'a> {
    map: &'a RoadMap,
    index: &'a RTreeIndex<Geography>,
}

impl RoadIndex<'_> {
    fn split(&self, interceptions: Vec<Interception>) -> Vec<RoadPoint> {
        let mut points = Vec::with_capacity(interceptions.len() * 2);

        for hit in interceptions {
            if let Some(road) = self.map.road(hit.id * 2) {
                points.push(RoadPoint::new(road, hit.fraction));
            }

            if let Some(road) = self.map.road(hit.id * 2 + 1) {
                points.push(RoadPoint::new(road, 1.0 - hit.fraction));
            }
        }

        points
    }

    pub fn nearest(&self, point: Point) -> Vec<RoadPoint> {
        self.split(self.index.nearest(point))
    }

    pub fn radius(&self, point: Point, radius: f64) -> Vec<RoadPoint> {
        self.split(self.index.radius(point, radius))
    }

    pub fn knearest(&self, point: Point, k: usize) -> Vec<RoadPoint> {
        self.split(self.index.knearest(point, k))
    }
}
