use geo::{Coord, LineString};
use serde_json::{json, Value};

use crate::roadmap::{Distance, Road, RoadMap, RoadMapError, RoadPoint, Time};
use crate::spatial::{Geography, SpatialOperator};
use crate::topology::{Cost, Edge, EdgeId, Path};

/// A path over the road network between two [`RoadPoint`]s, with
/// its length (metres) and travel time (seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    path: Path,
    source: RoadPoint,
    target: RoadPoint,
    length: f64,
    time: f64,
}

impl Route {
    /// A route that starts and ends at the point.
    pub fn single(point: RoadPoint) -> Self {
        Self {
            path: Path::single(point.edge_point()),
            source: point,
            target: point,
            length: 0.0,
            time: 0.0,
        }
    }

    /// A route over the roads, failing if these do not form a path
    /// from the source to the target.
    pub fn new(
        source: RoadPoint,
        target: RoadPoint,
        roads: Vec<EdgeId>,
        map: &RoadMap,
    ) -> Result<Self, RoadMapError> {
        let path = Path::new(source.edge_point(), target.edge_point(), roads, map.graph())?;

        let mut route = Self {
            path,
            source,
            target,
            length: 0.0,
            time: 0.0,
        };

        route.measure(map);
        Ok(route)
    }

    fn measure(&mut self, map: &RoadMap) {
        self.length = self.cost(map, &Distance);
        self.time = self.cost(map, &Time);
    }

    pub fn source(&self) -> &RoadPoint {
        &self.source
    }

    pub fn target(&self) -> &RoadPoint {
        &self.target
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn roads(&self) -> &[EdgeId] {
        self.path.edges()
    }

    pub fn size(&self) -> usize {
        self.path.edges().len()
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn cost(&self, map: &RoadMap, cost: &dyn Cost<Road>) -> f64 {
        self.path.cost(map.graph(), cost)
    }

    /// Appends a route continuing from this route's target,
    /// returning whether the routes were contiguous.
    pub fn add(&mut self, other: &Route, map: &RoadMap) -> bool {
        if !self.path.add(&other.path, map.graph()) {
            return false;
        }

        self.target = other.target;
        self.measure(map);
        true
    }

    /// The route's geometry, from the source point along
    /// the roads' geometries to the target point.
    pub fn geometry(&self, map: &RoadMap) -> LineString {
        let mut coords: Vec<Coord> = vec![self.source.position().0];
        let roads = self.roads();

        let (Some(first), Some(last)) = (
            roads.first().and_then(|id| map.road(*id)),
            roads.last().and_then(|id| map.road(*id)),
        ) else {
            coords.push(self.target.position().0);
            return LineString::new(coords);
        };

        // Vertices of the road geometry beyond the given distance from its start.
        let walk = |road: &Road, after: f64, before: f64, coords: &mut Vec<Coord>, last: bool| {
            let geometry = road.geometry();
            let count = geometry.0.len();
            let end = if last { count.saturating_sub(1) } else { count };
            let mut covered = 0.0;

            for i in 1..end {
                let (a, b) = (geometry.0[i - 1], geometry.0[i]);
                covered += Geography.distance(a.into(), b.into());

                if covered <= after {
                    continue;
                }
                if covered >= before {
                    break;
                }

                coords.push(b);
            }
        };

        if first.id() != last.id() {
            walk(first, first.length() * self.source.fraction(), f64::INFINITY, &mut coords, false);

            for id in roads.iter().skip(1).take(roads.len().saturating_sub(2)) {
                if let Some(road) = map.road(*id) {
                    coords.extend(road.geometry().0.iter().skip(1));
                }
            }

            walk(last, f64::NEG_INFINITY, last.length() * self.target.fraction(), &mut coords, true);
        } else {
            walk(
                first,
                first.length() * self.source.fraction(),
                first.length() * self.target.fraction(),
                &mut coords,
                true,
            );
        }

        coords.push(self.target.position().0);
        LineString::new(coords)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "source": self.source.to_json(),
            "target": self.target.to_json(),
            "roads": self.roads(),
        })
    }

    pub fn from_json(json: &Value, map: &RoadMap) -> Result<Self, RoadMapError> {
        let field = |key: &str| {
            json.get(key)
                .ok_or_else(|| RoadMapError::Malformed(format!("route is missing '{key}'")))
        };

        let source = RoadPoint::from_json(field("source")?, map)?;
        let target = RoadPoint::from_json(field("target")?, map)?;

        let roads = field("roads")?
            .as_array()
            .ok_or_else(|| RoadMapError::Malformed("route roads are not an array".into()))?
            .iter()
            .map(|road| {
                road.as_i64()
                    .ok_or_else(|| RoadMapError::Malformed(format!("invalid road {road}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(source, target, roads, map)
    }
}
