use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::markov::StateError;

/// Identifier of a [`StateCandidate`], unique within the memory holding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    /// A new random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A hypothesis of the hidden state at a single time step.
///
/// Holds the payload describing the hypothesis (for map matching, the position
/// upon the road network), and the filter's bookkeeping:
///
/// * The `predecessor`, being the identifier of the most likely candidate of the
///   previous time step, which forms the backpointer chain of the Viterbi sequence.
/// * The `transition` from that predecessor to this candidate.
/// * The `seqprob`, the log10-scaled probability of the most likely sequence ending here.
/// * The `filtprob`, the normalised forward-filter belief in this candidate.
#[derive(Debug, Clone)]
pub struct StateCandidate<P, T> {
    id: CandidateId,
    payload: P,
    predecessor: Option<CandidateId>,
    transition: Option<T>,
    seqprob: f64,
    filtprob: f64,
}

impl<P, T> StateCandidate<P, T> {
    pub fn new(payload: P) -> Self {
        Self::with_id(CandidateId::generate(), payload)
    }

    pub fn with_id(id: impl Into<CandidateId>, payload: P) -> Self {
        Self {
            id: id.into(),
            payload,
            predecessor: None,
            transition: None,
            seqprob: 0.0,
            filtprob: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> &CandidateId {
        &self.id
    }

    #[inline]
    pub fn payload(&self) -> &P {
        &self.payload
    }

    #[inline]
    pub fn predecessor(&self) -> Option<&CandidateId> {
        self.predecessor.as_ref()
    }

    pub fn set_predecessor(&mut self, predecessor: Option<CandidateId>) {
        self.predecessor = predecessor;
    }

    #[inline]
    pub fn transition(&self) -> Option<&T> {
        self.transition.as_ref()
    }

    pub fn set_transition(&mut self, transition: Option<T>) {
        self.transition = transition;
    }

    #[inline]
    pub fn seqprob(&self) -> f64 {
        self.seqprob
    }

    pub fn set_seqprob(&mut self, seqprob: f64) {
        self.seqprob = seqprob;
    }

    #[inline]
    pub fn filtprob(&self) -> f64 {
        self.filtprob
    }

    pub fn set_filtprob(&mut self, filtprob: f64) {
        self.filtprob = filtprob;
    }
}

/// Writes a probability, where non-finite values become
/// strings as JSON numbers cannot hold them.
pub fn probability_to_json(value: f64) -> Value {
    match serde_json::Number::from_f64(value) {
        Some(number) => Value::Number(number),
        None if value.is_nan() => Value::String("NaN".to_string()),
        None if value > 0.0 => Value::String("Infinity".to_string()),
        None => Value::String("-Infinity".to_string()),
    }
}

pub fn probability_from_json(value: &Value) -> Result<f64, StateError> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| StateError::MalformedSnapshot(format!("invalid probability {number}"))),
        Value::String(text) => match text.as_str() {
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            other => other
                .parse()
                .map_err(|_| StateError::MalformedSnapshot(format!("invalid probability {other}"))),
        },
        other => Err(StateError::MalformedSnapshot(format!(
            "invalid probability {other}"
        ))),
    }
}
