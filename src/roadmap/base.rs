use std::sync::Arc;

use geo::LineString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::spatial::{Geography, SpatialOperator};
use crate::topology::VertexId;

/// Direction of travel along a [`BaseRoad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    /// From the base road's source to its target.
    Forward,
    /// From the base road's target to its source.
    Backward,
}

/// An undirected road segment between two intersections, as read from the source map data.
///
/// Routable roads are derived from it by [`RoadMap`](crate::roadmap::RoadMap), one
/// for each direction it may be travelled in.
#[derive(Debug, Clone)]
pub struct BaseRoad {
    id: i64,
    refid: i64,
    source: VertexId,
    target: VertexId,
    oneway: bool,
    class: i16,
    priority: f64,
    maxspeed_forward: f64,
    maxspeed_backward: f64,
    length: f64,
    geometry: Arc<LineString>,
}

impl BaseRoad {
    /// A bidirectional road of the geometry's length, with unit priority and a
    /// speed limit of 50 km/h in both directions.
    pub fn new(id: i64, source: VertexId, target: VertexId, geometry: LineString) -> Self {
        Self {
            id,
            refid: id,
            source,
            target,
            oneway: false,
            class: 0,
            priority: 1.0,
            maxspeed_forward: 50.0,
            maxspeed_backward: 50.0,
            length: Geography.length(&geometry),
            geometry: Arc::new(geometry),
        }
    }

    pub fn with_refid(mut self, refid: i64) -> Self {
        self.refid = refid;
        self
    }

    pub fn with_oneway(mut self, oneway: bool) -> Self {
        self.oneway = oneway;
        self
    }

    pub fn with_class(mut self, class: i16) -> Self {
        self.class = class;
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Speed limits in km/h.
    pub fn with_maxspeed(mut self, forward: f64, backward: f64) -> Self {
        self.maxspeed_forward = forward;
        self.maxspeed_backward = backward;
        self
    }

    /// Overrides the length in metres, which otherwise is the geometry's.
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Identifier of the road in the source data, which may be
    /// split into many base roads at its intersections.
    pub fn refid(&self) -> i64 {
        self.refid
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn target(&self) -> VertexId {
        self.target
    }

    pub fn is_oneway(&self) -> bool {
        self.oneway
    }

    pub fn class(&self) -> i16 {
        self.class
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn maxspeed(&self, heading: Heading) -> f64 {
        match heading {
            Heading::Forward => self.maxspeed_forward,
            Heading::Backward => self.maxspeed_backward,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn geometry(&self) -> &LineString {
        &self.geometry
    }

    pub(crate) fn shared_geometry(&self) -> Arc<LineString> {
        Arc::clone(&self.geometry)
    }
}
