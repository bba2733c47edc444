use thiserror::Error;

use crate::topology::EdgeId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("path from edge {from} to edge {to} is not connected")]
    InvalidPath { from: EdgeId, to: EdgeId },

    #[error("edge {0} is not part of the graph")]
    UnknownEdge(EdgeId),
}
