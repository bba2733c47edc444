use thiserror::Error;

use crate::impl_err;
use crate::markov::StateError;
use crate::matcher::{MatchError, SchedulerError};
use crate::roadmap::RoadMapError;
use crate::topology::TopologyError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("topology error: {0}")]
    Topology(TopologyError),

    #[error("road map error: {0}")]
    RoadMap(RoadMapError),

    #[error("state memory error: {0}")]
    State(StateError),

    #[error("matching failed: {0}")]
    Match(MatchError),

    #[error("routing scheduler failed: {0}")]
    Scheduler(SchedulerError),
}

impl_err!(TopologyError, Topology);
impl_err!(RoadMapError, RoadMap);
impl_err!(StateError, State);
impl_err!(MatchError, Match);
impl_err!(SchedulerError, Scheduler);
