use std::collections::VecDeque;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::markov::{CandidateId, Factory, Sample, StateCandidate, StateError};

/// A single time step of the sequence.
#[derive(Debug, Clone)]
struct Step<S> {
    vector: Vec<CandidateId>,
    sample: S,
    /// Candidate of the step with the highest sequence probability.
    estimate: CandidateId,
}

#[derive(Debug, Clone)]
struct Slot<P, T> {
    candidate: StateCandidate<P, T>,
    /// Number of candidates in the next step naming this candidate as predecessor.
    count: usize,
}

/// State memory of a Hidden Markov Model which keeps the state vectors of a
/// window of time steps, such that the most likely sequence within that window
/// can be read out with [`KState::sequence`].
///
/// Candidates which are no longer predecessor (directly or transitively) of any
/// candidate of the latest state vector are dropped as soon as they become
/// unreachable, except for the candidate of each step with the highest sequence
/// probability.
///
/// The window is bounded by `k`, keeping at most `k + 1` steps, and by `t`, keeping
/// only steps at most `t` milliseconds older than the latest. Without either bound
/// the whole sequence is kept.
#[derive(Debug, Clone)]
pub struct KState<P, T, S> {
    k: Option<usize>,
    t: Option<u64>,
    sequence: VecDeque<Step<S>>,
    slots: FxHashMap<CandidateId, Slot<P, T>>,
    breaks: usize,
    broken: bool,
}

impl<P, T, S: Sample> Default for KState<P, T, S> {
    fn default() -> Self {
        Self::bounded(None, None)
    }
}

impl<P, T, S> KState<P, T, S>
where
    S: Sample,
{
    /// A state memory keeping the whole sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// A state memory bounded to at most `k + 1` steps and to steps no
    /// older than `t` milliseconds than the latest, where `t = 0` is unbounded.
    pub fn bounded(k: Option<usize>, t: Option<u64>) -> Self {
        Self {
            k,
            t: t.filter(|t| *t > 0),
            sequence: VecDeque::new(),
            slots: FxHashMap::default(),
            breaks: 0,
            broken: false,
        }
    }

    pub fn k(&self) -> Option<usize> {
        self.k
    }

    pub fn t(&self) -> Option<u64> {
        self.t
    }

    /// Whether no candidate is held.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The number of candidates held across all steps.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// The number of steps held.
    pub fn steps(&self) -> usize {
        self.sequence.len()
    }

    /// The number of empty updates, being samples the filter
    /// found no candidate for.
    pub fn breaks(&self) -> usize {
        self.breaks
    }

    /// Whether the latest update was empty, in which case the next vector
    /// starts a new chain and must not name any predecessor.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn time(&self) -> Option<i64> {
        self.sample().map(Sample::time)
    }

    pub fn sample(&self) -> Option<&S> {
        self.sequence.back().map(|step| &step.sample)
    }

    pub fn samples(&self) -> impl Iterator<Item = &S> {
        self.sequence.iter().map(|step| &step.sample)
    }

    pub fn candidate(&self, id: &CandidateId) -> Option<&StateCandidate<P, T>> {
        self.slots.get(id).map(|slot| &slot.candidate)
    }

    /// The latest state vector, empty if there was no update yet.
    pub fn vector(&self) -> Vec<&StateCandidate<P, T>> {
        self.sequence
            .back()
            .map(|step| self.resolve(&step.vector))
            .unwrap_or_default()
    }

    /// The state vectors of all steps held, oldest first, with their samples.
    pub fn vectors(&self) -> impl Iterator<Item = (Vec<&StateCandidate<P, T>>, &S)> {
        self.sequence
            .iter()
            .map(|step| (self.resolve(&step.vector), &step.sample))
    }

    fn resolve(&self, ids: &[CandidateId]) -> Vec<&StateCandidate<P, T>> {
        ids.iter().filter_map(|id| self.candidate(id)).collect()
    }

    /// The candidate of the latest state vector with the highest filter probability.
    pub fn estimate(&self) -> Option<&StateCandidate<P, T>> {
        self.vector().into_iter().fold(None, |estimate, candidate| match estimate {
            Some(estimate) if candidate.filtprob() <= estimate.filtprob() => Some(estimate),
            _ => Some(candidate),
        })
    }

    /// The most likely sequence of candidates, one per step held, oldest first.
    ///
    /// Walks the predecessors back from the latest step's most likely candidate. Where
    /// the chain is broken, the walk continues from the most likely candidate of that step.
    pub fn sequence(&self) -> Vec<&StateCandidate<P, T>> {
        let mut sequence = Vec::with_capacity(self.sequence.len());
        let mut next: Option<&CandidateId> = None;

        for step in self.sequence.iter().rev() {
            let candidate = next
                .and_then(|id| self.candidate(id))
                .or_else(|| self.candidate(&step.estimate));

            let Some(candidate) = candidate else {
                break;
            };

            sequence.push(candidate);
            next = candidate.predecessor();
        }

        sequence.reverse();
        sequence
    }

    /// Appends the state vector of a sample.
    ///
    /// An empty vector means the filter found no candidates for the sample, which
    /// is counted as a break and leaves the memory unchanged apart from marking it
    /// broken. Fails, without any change, if the sample is older than the latest,
    /// or if a candidate names a predecessor not part of the latest vector. After a
    /// break no predecessor is accepted.
    pub fn update(&mut self, vector: Vec<StateCandidate<P, T>>, sample: S) -> Result<(), StateError> {
        if vector.is_empty() {
            self.breaks += 1;
            self.broken = true;
            debug!("skipping empty state update at {}", sample.time());
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

        let latest = self
            .sequence
            .back()
            .filter(|_| !self.broken)
            .map(|step| step.vector.iter().collect::<FxHashSet<_>>())
            .unwrap_or_default();

        for candidate in &vector {
            if let Some(predecessor) = candidate.predecessor() {
                if !latest.contains(predecessor) || !self.slots.contains_key(predecessor) {
                    return Err(StateError::InconsistentVector {
                        candidate: candidate.id().clone(),
                        predecessor: predecessor.clone(),
                    });
                }
            }
        }

        let mut estimate: Option<&StateCandidate<P, T>> = None;
        for candidate in &vector {
            if estimate.map_or(true, |estimate| candidate.seqprob() > estimate.seqprob()) {
                estimate = Some(candidate);
            }
        }
        let estimate = estimate.map(|candidate| candidate.id().clone());

        for candidate in &vector {
            if let Some(slot) = candidate
                .predecessor()
                .and_then(|predecessor| self.slots.get_mut(predecessor))
            {
                slot.count += 1;
            }
        }

        if let Some(last) = self.sequence.len().checked_sub(1) {
            let deletes = self.sequence[last]
                .vector
                .iter()
                .filter(|id| self.slots.get(*id).is_some_and(|slot| slot.count == 0))
                .cloned()
                .collect::<Vec<_>>();

            for candidate in deletes {
                self.remove(candidate, last);
            }
        }

        let ids = vector.iter().map(|candidate| candidate.id().clone()).collect();
        for candidate in vector {
            self.slots
                .insert(candidate.id().clone(), Slot { candidate, count: 0 });
        }

        if let Some(estimate) = estimate {
            self.sequence.push_back(Step {
                vector: ids,
                sample,
                estimate,
            });
        }

        self.broken = false;
        self.evict();
        Ok(())
    }

    /// Removes an unreachable candidate of the step at the given index, and
    /// each predecessor becoming unreachable through it, sparing the most
    /// likely candidate of each step.
    fn remove(&mut self, candidate: CandidateId, index: usize) {
        let mut next = Some((candidate, index));

        while let Some((candidate, index)) = next.take() {
            let Some(step) = self.sequence.get_mut(index) else {
                break;
            };

            if step.estimate == candidate {
                break;
            }

            step.vector.retain(|id| *id != candidate);
            let Some(removed) = self.slots.remove(&candidate) else {
                break;
            };

            trace!("removed candidate {} of step {}", candidate, index);

            let Some(predecessor) = removed.candidate.predecessor() else {
                break;
            };

            if let Some(slot) = self.slots.get_mut(predecessor) {
                slot.count = slot.count.saturating_sub(1);
                if slot.count == 0 {
                    next = index
                        .checked_sub(1)
                        .map(|previous| (predecessor.clone(), previous));
                }
            }
        }
    }

    fn evict(&mut self) {
        let Some(time) = self.time() else {
            return;
        };

        while self.sequence.len() > 1 {
            let Some(front) = self.sequence.front() else {
                break;
            };

            let expired = self
                .t
                .is_some_and(|t| time - front.sample.time() > t as i64);
            let exceeded = self.k.is_some_and(|k| self.sequence.len() > k + 1);

            if !expired && !exceeded {
                break;
            }

            if let Some(evicted) = self.sequence.pop_front() {
                for id in &evicted.vector {
                    self.slots.remove(id);
                }
            }

            if let Some(front) = self.sequence.front() {
                for id in &front.vector {
                    if let Some(slot) = self.slots.get_mut(id) {
                        slot.candidate.set_predecessor(None);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkSnapshot {
    candid: String,
    predid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StepSnapshot {
    vector: Vec<LinkSnapshot>,
    sample: Value,
    kestid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CountSnapshot {
    candidate: Value,
    count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KStateSnapshot {
    k: i64,
    t: i64,
    sequence: Vec<StepSnapshot>,
    candidates: Vec<CountSnapshot>,
    #[serde(default)]
    broken: bool,
}

impl<P, T, S> KState<P, T, S>
where
    S: Sample,
{
    /// The structural snapshot of the memory, from which it can be restored
    /// with [`KState::from_snapshot`].
    pub fn to_snapshot<F>(&self, factory: &F) -> Result<Value, StateError>
    where
        F: Factory<Payload = P, Transition = T, Sample = S>,
    {
        let sequence = self
            .sequence
            .iter()
            .map(|step| -> Result<StepSnapshot, StateError> {
                let vector = self
                    .resolve(&step.vector)
                    .into_iter()
                    .map(|candidate| LinkSnapshot {
                        candid: candidate.id().to_string(),
                        predid: candidate
                            .predecessor()
                            .map(|id| id.to_string())
                            .unwrap_or_default(),
                    })
                    .collect();

                Ok(StepSnapshot {
                    vector,
                    sample: factory.sample_to_json(&step.sample)?,
                    kestid: step.estimate.to_string(),
                })
            })
            .collect::<Result<Vec<_>, StateError>>()?;

        let candidates = self
            .slots
            .values()
            .map(|slot| -> Result<CountSnapshot, StateError> {
                Ok(CountSnapshot {
                    candidate: factory.candidate_to_json(&slot.candidate)?,
                    count: slot.count,
                })
            })
            .collect::<Result<Vec<_>, StateError>>()?;

        let snapshot = KStateSnapshot {
            k: self.k.map_or(-1, |k| k as i64),
            t: self.t.map_or(-1, |t| t as i64),
            sequence,
            candidates,
            broken: self.broken,
        };

        Ok(serde_json::to_value(snapshot)?)
    }

    /// Restores a memory from its structural snapshot, failing if the snapshot
    /// references candidates it does not contain.
    pub fn from_snapshot<F>(json: &Value, factory: &F) -> Result<Self, StateError>
    where
        F: Factory<Payload = P, Transition = T, Sample = S>,
    {
        let snapshot = KStateSnapshot::deserialize(json)?;

        let mut state = Self::bounded(
            usize::try_from(snapshot.k).ok(),
            u64::try_from(snapshot.t).ok(),
        );

        for entry in snapshot.candidates {
            let candidate = factory.candidate(&entry.candidate)?;
            state.slots.insert(
                candidate.id().clone(),
                Slot {
                    candidate,
                    count: entry.count,
                },
            );
        }

        let inconsistent = || StateError::MalformedSnapshot("inconsistent candidates".into());

        let mut sequence = Vec::with_capacity(snapshot.sequence.len());
        for step in snapshot.sequence {
            let mut vector = Vec::with_capacity(step.vector.len());

            for link in step.vector {
                let id = CandidateId::from(link.candid);
                let predecessor = match link.predid.is_empty() {
                    true => None,
                    false => Some(CandidateId::from(link.predid)),
                };

                if predecessor
                    .as_ref()
                    .is_some_and(|predecessor| !state.slots.contains_key(predecessor))
                {
                    return Err(inconsistent());
                }

                let slot = state.slots.get_mut(&id).ok_or_else(inconsistent)?;
                slot.candidate.set_predecessor(predecessor);
                vector.push(id);
            }

            let estimate = CandidateId::from(step.kestid);
            if !state.slots.contains_key(&estimate) {
                return Err(inconsistent());
            }

            sequence.push(Step {
                vector,
                sample: factory.sample(&step.sample)?,
                estimate,
            });
        }

        sequence.sort_by_key(|step| step.sample.time());
        state.sequence = sequence.into();
        state.broken = snapshot.broken;

        Ok(state)
    }
}
