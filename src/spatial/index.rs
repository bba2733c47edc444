use geo::{Distance, Euclidean, LineString, Point};
use log::trace;
use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

use crate::spatial::{Geography, SpatialOperator};

/// A line string intercepted by a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interception {
    /// Identifier the line string was indexed with.
    pub id: i64,
    /// Fraction of the line string closest to the query point.
    pub fraction: f64,
    /// Distance of that closest point to the query point, in metres.
    pub distance: f64,
}

/// Spatial lookup of indexed line strings, by their closest points to a query point.
pub trait SpatialIndex: Send + Sync {
    /// The line strings closest to the point, being more than one if
    /// several are equally close.
    fn nearest(&self, point: Point) -> Vec<Interception>;

    /// The line strings within the radius of the point.
    fn radius(&self, point: Point, radius: f64) -> Vec<Interception>;

    /// The `k` line strings closest to the point, nearest first.
    fn knearest(&self, point: Point, k: usize) -> Vec<Interception>;
}

#[derive(Debug, Clone)]
pub struct IndexedLine {
    id: i64,
    geometry: LineString,
    envelope: AABB<Point>,
}

impl IndexedLine {
    pub fn new(id: i64, geometry: LineString) -> Self {
        let envelope = geometry
            .points()
            .map(AABB::from_point)
            .reduce(|a, b| a.merged(&b))
            .unwrap_or_else(|| AABB::from_point(Point::new(0.0, 0.0)));

        Self {
            id,
            geometry,
            envelope,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn geometry(&self) -> &LineString {
        &self.geometry
    }
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedLine {
    /// Squared planar distance in coordinate units, which orders
    /// candidates for the nearest-neighbour walk.
    fn distance_2(&self, point: &Point) -> f64 {
        Euclidean.distance(point, &self.geometry).powi(2)
    }
}

/// [`SpatialIndex`] backed by an R*-tree of line strings.
#[derive(Debug)]
pub struct RTreeIndex<O = Geography> {
    tree: RTree<IndexedLine>,
    ids: FxHashSet<i64>,
    operator: O,
}

impl Default for RTreeIndex<Geography> {
    fn default() -> Self {
        Self::new(Geography)
    }
}

impl<O: SpatialOperator> RTreeIndex<O> {
    pub fn new(operator: O) -> Self {
        Self {
            tree: RTree::new(),
            ids: FxHashSet::default(),
            operator,
        }
    }

    /// Builds the index in bulk, ignoring repeated identifiers.
    pub fn bulk_load(operator: O, lines: impl IntoIterator<Item = (i64, LineString)>) -> Self {
        let mut ids = FxHashSet::default();
        let lines = lines
            .into_iter()
            .filter(|(id, _)| ids.insert(*id))
            .map(|(id, geometry)| IndexedLine::new(id, geometry))
            .collect();

        Self {
            tree: RTree::bulk_load(lines),
            ids,
            operator,
        }
    }

    /// Indexes a line string, returning `false` if its identifier is already indexed.
    pub fn insert(&mut self, id: i64, geometry: LineString) -> bool {
        if !self.ids.insert(id) {
            return false;
        }

        self.tree.insert(IndexedLine::new(id, geometry));
        true
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    fn intercept(&self, line: &IndexedLine, point: Point) -> Interception {
        let fraction = self.operator.intercept(&line.geometry, point);
        let closest = self.operator.interpolate(&line.geometry, fraction);

        Interception {
            id: line.id,
            fraction,
            distance: self.operator.distance(closest, point),
        }
    }
}

impl<O: SpatialOperator> SpatialIndex for RTreeIndex<O> {
    fn nearest(&self, point: Point) -> Vec<Interception> {
        let mut nearest: Vec<Interception> = Vec::new();

        // Planar and metric order may differ slightly, so equally close
        // neighbours are gathered from the leading planar candidates.
        for line in self.tree.nearest_neighbor_iter(&point).take(8) {
            let interception = self.intercept(line, point);

            match nearest.first().map(|first| first.distance) {
                Some(distance) if interception.distance > distance => continue,
                Some(distance) if interception.distance < distance => nearest.clear(),
                _ => {}
            }

            nearest.push(interception);
        }

        nearest
    }

    fn radius(&self, point: Point, radius: f64) -> Vec<Interception> {
        let envelope = self.operator.envelope(point, radius);

        let within = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|line| self.intercept(line, point))
            .filter(|interception| interception.distance <= radius)
            .collect::<Vec<_>>();

        trace!("{} line strings within {radius}m", within.len());
        within
    }

    fn knearest(&self, point: Point, k: usize) -> Vec<Interception> {
        let mut nearest = self
            .tree
            .nearest_neighbor_iter(&point)
            .take(k)
            .map(|line| self.intercept(line, point))
            .collect::<Vec<_>>();

        nearest.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        nearest
    }
}
