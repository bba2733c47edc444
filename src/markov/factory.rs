use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::markov::{probability_from_json, probability_to_json, StateCandidate, StateError};

/// A candidate's JSON object, whose payload is keyed by [`Factory::PAYLOAD`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CandidateSnapshot {
    id: String,
    filtprob: Value,
    seqprob: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transition: Option<Value>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

/// Converts the domain parts of a state memory (candidate payloads,
/// transitions and samples) to and from their JSON representation.
///
/// Restoring may need context that the JSON does not carry, such as the
/// road network a candidate's position refers to, which the factory holds.
pub trait Factory {
    type Payload;
    type Transition;
    type Sample;

    /// Key of the payload within a candidate's JSON object.
    const PAYLOAD: &'static str = "payload";

    fn payload_to_json(&self, payload: &Self::Payload) -> Result<Value, StateError>;
    fn payload(&self, json: &Value) -> Result<Self::Payload, StateError>;

    fn transition_to_json(&self, transition: &Self::Transition) -> Result<Value, StateError>;
    fn transition(&self, json: &Value) -> Result<Self::Transition, StateError>;

    fn sample_to_json(&self, sample: &Self::Sample) -> Result<Value, StateError>;
    fn sample(&self, json: &Value) -> Result<Self::Sample, StateError>;

    /// A candidate as JSON object, without its predecessor.
    fn candidate_to_json(
        &self,
        candidate: &StateCandidate<Self::Payload, Self::Transition>,
    ) -> Result<Value, StateError> {
        let mut payload = Map::new();
        payload.insert(
            Self::PAYLOAD.into(),
            self.payload_to_json(candidate.payload())?,
        );

        let snapshot = CandidateSnapshot {
            id: candidate.id().to_string(),
            filtprob: probability_to_json(candidate.filtprob()),
            seqprob: probability_to_json(candidate.seqprob()),
            transition: candidate
                .transition()
                .map(|transition| self.transition_to_json(transition))
                .transpose()?,
            payload,
        };

        Ok(serde_json::to_value(snapshot)?)
    }

    fn candidate(
        &self,
        json: &Value,
    ) -> Result<StateCandidate<Self::Payload, Self::Transition>, StateError> {
        let snapshot = CandidateSnapshot::deserialize(json)?;

        let payload = snapshot.payload.get(Self::PAYLOAD).ok_or_else(|| {
            StateError::MalformedSnapshot(format!("candidate is missing field '{}'", Self::PAYLOAD))
        })?;

        let mut candidate = StateCandidate::with_id(snapshot.id, self.payload(payload)?);
        candidate.set_filtprob(probability_from_json(&snapshot.filtprob)?);
        candidate.set_seqprob(probability_from_json(&snapshot.seqprob)?);

        if let Some(transition) = &snapshot.transition {
            candidate.set_transition(Some(self.transition(transition)?));
        }

        Ok(candidate)
    }
}
