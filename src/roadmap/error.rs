use thiserror::Error;

use crate::topology::{EdgeId, TopologyError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoadMapError {
    #[error("spatial index is not constructed")]
    IndexNotConstructed,

    #[error("road {0} is not part of the map")]
    UnknownRoad(EdgeId),

    #[error("malformed road reference: {0}")]
    Malformed(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}
