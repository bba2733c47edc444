use thiserror::Error;

use crate::markov::CandidateId;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("out-of-order state update at {time}, last update was at {last}")]
    OutOfOrder { last: i64, time: i64 },

    #[error("inconsistent update vector, predecessor {predecessor} of candidate {candidate} is not part of the last vector")]
    InconsistentVector {
        candidate: CandidateId,
        predecessor: CandidateId,
    },

    #[error("malformed state snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("could not (de)serialize state snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}
