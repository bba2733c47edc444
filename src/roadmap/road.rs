use std::sync::Arc;

use geo::{LineString, Point};
use serde_json::{json, Value};

use crate::roadmap::{BaseRoad, Heading, RoadMap, RoadMapError};
use crate::spatial::{Geography, SpatialOperator};
use crate::topology::{Edge, EdgeId, EdgePoint, VertexId};

/// A [`BaseRoad`] travelled in one direction, being an edge of the road network.
///
/// The forward road of base road `n` has identifier `2n`, its backward road `2n + 1`.
#[derive(Debug, Clone)]
pub struct Road {
    base: Arc<BaseRoad>,
    heading: Heading,
    geometry: Arc<LineString>,
}

impl Road {
    pub fn new(base: Arc<BaseRoad>, heading: Heading) -> Self {
        let geometry = match heading {
            Heading::Forward => base.shared_geometry(),
            Heading::Backward => {
                let mut coords = base.geometry().0.clone();
                coords.reverse();
                Arc::new(LineString::new(coords))
            }
        };

        Self {
            base,
            heading,
            geometry,
        }
    }

    pub fn base(&self) -> &BaseRoad {
        &self.base
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn class(&self) -> i16 {
        self.base.class()
    }

    pub fn priority(&self) -> f64 {
        self.base.priority()
    }

    /// Speed limit in the road's direction, in km/h.
    pub fn maxspeed(&self) -> f64 {
        self.base.maxspeed(self.heading)
    }

    /// Length in metres.
    pub fn length(&self) -> f64 {
        self.base.length()
    }

    /// Geometry in the road's direction of travel.
    pub fn geometry(&self) -> &LineString {
        &self.geometry
    }
}

impl Edge for Road {
    #[inline]
    fn id(&self) -> EdgeId {
        match self.heading {
            Heading::Forward => self.base.id() * 2,
            Heading::Backward => self.base.id() * 2 + 1,
        }
    }

    #[inline]
    fn source(&self) -> VertexId {
        match self.heading {
            Heading::Forward => self.base.source(),
            Heading::Backward => self.base.target(),
        }
    }

    #[inline]
    fn target(&self) -> VertexId {
        match self.heading {
            Heading::Forward => self.base.target(),
            Heading::Backward => self.base.source(),
        }
    }
}

/// A position on a [`Road`], with its coordinate and the road's heading there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadPoint {
    point: EdgePoint,
    position: Point,
    azimuth: f64,
}

impl RoadPoint {
    pub fn new(road: &Road, fraction: f64) -> Self {
        Self {
            point: EdgePoint::new(road.id(), fraction),
            position: Geography.interpolate(road.geometry(), fraction),
            azimuth: Geography.azimuth(road.geometry(), fraction),
        }
    }

    #[inline]
    pub fn road(&self) -> EdgeId {
        self.point.edge
    }

    #[inline]
    pub fn fraction(&self) -> f64 {
        self.point.fraction
    }

    #[inline]
    pub fn edge_point(&self) -> EdgePoint {
        self.point
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Heading of the road at the point, in degrees clockwise from north.
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn to_json(&self) -> Value {
        json!({ "road": self.road(), "frac": self.fraction() })
    }

    pub fn from_json(json: &Value, map: &RoadMap) -> Result<Self, RoadMapError> {
        let road = json
            .get("road")
            .and_then(Value::as_i64)
            .ok_or_else(|| RoadMapError::Malformed(format!("missing road in {json}")))?;

        let fraction = json
            .get("frac")
            .and_then(Value::as_f64)
            .ok_or_else(|| RoadMapError::Malformed(format!("missing frac in {json}")))?;

        map.point(road, fraction)
    }
}
