use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::markov::{Factory, Sample, StateCandidate, StateError};

/// State memory holding only the latest state vector and its sample.
///
/// Suited to online filtering, where only the current estimate is of interest
/// and the most likely sequence is not needed.
#[derive(Debug, Clone)]
pub struct StateMemory<P, T, S> {
    candidates: Vec<StateCandidate<P, T>>,
    sample: Option<S>,
}

impl<P, T, S> Default for StateMemory<P, T, S> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            sample: None,
        }
    }
}

impl<P, T, S> StateMemory<P, T, S>
where
    S: Sample,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn size(&self) -> usize {
        self.candidates.len()
    }

    pub fn sample(&self) -> Option<&S> {
        self.sample.as_ref()
    }

    pub fn time(&self) -> Option<i64> {
        self.sample.as_ref().map(Sample::time)
    }

    pub fn vector(&self) -> Vec<&StateCandidate<P, T>> {
        self.candidates.iter().collect()
    }

    /// Replaces the held vector. An empty vector leaves the memory unchanged.
    pub fn update(&mut self, vector: Vec<StateCandidate<P, T>>, sample: S) -> Result<(), StateError> {
        if vector.is_empty() {
            return Ok(());
        }

        if let Some(last) = self.time() {
            if last > sample.time() {
                return Err(StateError::OutOfOrder {
                    last,
                    time: sample.time(),
                });
            }
        }

        self.candidates = vector;
        self.sample = Some(sample);
        Ok(())
    }

    /// The candidate with the highest filter probability.
    pub fn estimate(&self) -> Option<&StateCandidate<P, T>> {
        self.candidates.iter().fold(None, |estimate, candidate| match estimate {
            Some(estimate) if candidate.filtprob() <= estimate.filtprob() => Some(estimate),
            _ => Some(candidate),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct MemorySnapshot {
    candidates: Vec<Value>,
    sample: Option<Value>,
}

impl<P, T, S> StateMemory<P, T, S>
where
    S: Sample,
{
    pub fn to_snapshot<F>(&self, factory: &F) -> Result<Value, StateError>
    where
        F: Factory<Payload = P, Transition = T, Sample = S>,
    {
        let snapshot = MemorySnapshot {
            candidates: self
                .candidates
                .iter()
                .map(|candidate| factory.candidate_to_json(candidate))
                .collect::<Result<_, _>>()?,
            sample: self
                .sample
                .as_ref()
                .map(|sample| factory.sample_to_json(sample))
                .transpose()?,
        };

        Ok(serde_json::to_value(snapshot)?)
    }

    pub fn from_snapshot<F>(json: &Value, factory: &F) -> Result<Self, StateError>
    where
        F: Factory<Payload = P, Transition = T, Sample = S>,
    {
        let snapshot = MemorySnapshot::deserialize(json)?;

        Ok(Self {
            candidates: snapshot
                .candidates
                .iter()
                .map(|candidate| factory.candidate(candidate))
                .collect::<Result<_, _>>()?,
            sample: snapshot
                .sample
                .as_ref()
                .map(|sample| factory.sample(sample))
                .transpose()?,
        })
    }
}
