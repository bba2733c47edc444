use thiserror::Error;

use crate::markov::StateError;
use crate::roadmap::RoadMapError;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("routing tasks did not complete: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("state update failed: {0}")]
    State(#[from] StateError),

    #[error("road map unavailable: {0}")]
    RoadMap(#[from] RoadMapError),

    #[error("malformed sample: {0}")]
    MalformedSample(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("timed out with {completed} of {expected} tasks completed")]
    Timeout { completed: usize, expected: usize },

    #[error("a task panicked")]
    TaskPanicked,

    #[error("could not create worker pool: {0}")]
    PoolCreation(String),
}
