use log::{info, trace};
use rustc_hash::FxHashMap;

use crate::markov::{CandidateId, Sample, StateCandidate};

/// The candidate type of a [`Filter`].
pub type CandidateOf<F> = StateCandidate<<F as Filter>::Payload, <F as Filter>::Transition>;

/// Transitions of every predecessor (outer key) to each candidate (inner key)
/// it can transition to, with the transition's probability.
pub type Transitions<T> = FxHashMap<CandidateId, FxHashMap<CandidateId, (T, f64)>>;

/// Hidden Markov Model filter, determining for a measurement sample and the
/// state vector of the previous sample the state vector of the sample.
///
/// Implementors provide the state candidates of a sample with their emission
/// probabilities, and the transitions between candidates of subsequent samples.
/// The filter then performs the forward-filter and Viterbi update in [`Filter::execute`].
pub trait Filter {
    type Payload: Clone;
    type Transition: Clone;
    type Sample: Sample;
    type Error;

    /// The state candidates of the sample, with their emission probabilities.
    fn candidates(
        &self,
        predecessors: &[&CandidateOf<Self>],
        sample: &Self::Sample,
    ) -> Result<Vec<(CandidateOf<Self>, f64)>, Self::Error>;

    /// The transition between a pair of candidates of subsequent samples,
    /// or `None` if there is no such transition.
    fn transition(
        &self,
        predecessor: (&Self::Sample, &CandidateOf<Self>),
        candidate: (&Self::Sample, &CandidateOf<Self>),
    ) -> Result<Option<(Self::Transition, f64)>, Self::Error>;

    /// The transitions from each predecessor to each candidate.
    ///
    /// Defaults to calling [`Filter::transition`] for every pair, implementors
    /// may compute these in batch instead.
    fn transitions(
        &self,
        predecessors: (&Self::Sample, &[&CandidateOf<Self>]),
        candidates: (&Self::Sample, &[&CandidateOf<Self>]),
    ) -> Result<Transitions<Self::Transition>, Self::Error> {
        let (previous, predecessors) = predecessors;
        let (sample, candidates) = candidates;

        let mut transitions = Transitions::default();
        for predecessor in predecessors {
            let mut reachable = FxHashMap::default();
            for candidate in candidates {
                if let Some(transition) =
                    self.transition((previous, *predecessor), (sample, *candidate))?
                {
                    reachable.insert(candidate.id().clone(), transition);
                }
            }

            transitions.insert(predecessor.id().clone(), reachable);
        }

        Ok(transitions)
    }

    /// Executes a filter iteration for the sample, given the state vector of
    /// the previous sample.
    ///
    /// The predecessors may be empty, either initially or after an HMM break, in
    /// which case (as well as when no previous sample is given) each candidate is
    /// scored by its emission probability alone. The same holds if no candidate has
    /// a transition from any predecessor.
    ///
    /// Returns the state vector of the sample with filter probabilities normalised,
    /// which is empty if there are no candidates with non-zero emission probability.
    fn execute(
        &self,
        predecessors: &[&CandidateOf<Self>],
        previous: Option<&Self::Sample>,
        sample: &Self::Sample,
    ) -> Result<Vec<CandidateOf<Self>>, Self::Error> {
        let candidates = self.candidates(predecessors, sample)?;
        trace!("{} state candidates", candidates.len());

        let mut result = Vec::with_capacity(candidates.len());
        let mut normsum = 0.0;

        if let (Some(previous), false) = (previous, predecessors.is_empty()) {
            let states = candidates
                .iter()
                .map(|(candidate, _)| candidate)
                .collect::<Vec<_>>();

            let mut transitions =
                self.transitions((previous, predecessors), (sample, states.as_slice()))?;

            for (candidate, emission) in &candidates {
                let mut candidate = candidate.clone();
                candidate.set_filtprob(0.0);
                candidate.set_seqprob(f64::NEG_INFINITY);

                for predecessor in predecessors {
                    let Some((transition, probability)) = transitions
                        .get_mut(predecessor.id())
                        .and_then(|reachable| reachable.remove(candidate.id()))
                    else {
                        continue;
                    };

                    if probability == 0.0 {
                        continue;
                    }

                    candidate
                        .set_filtprob(candidate.filtprob() + probability * predecessor.filtprob());

                    let seqprob = predecessor.seqprob() + probability.log10() + emission.log10();

                    trace!(
                        "state transition {} -> {} ({}, {}, {})",
                        predecessor.id(),
                        candidate.id(),
                        predecessor.seqprob(),
                        probability.log10(),
                        emission.log10()
                    );

                    if seqprob > candidate.seqprob() {
                        candidate.set_predecessor(Some(predecessor.id().clone()));
                        candidate.set_transition(Some(transition));
                        candidate.set_seqprob(seqprob);
                    }
                }

                if candidate.filtprob() == 0.0 {
                    continue;
                }

                candidate.set_filtprob(candidate.filtprob() * emission);
                normsum += candidate.filtprob();
                result.push(candidate);
            }

            if !candidates.is_empty() && result.is_empty() {
                info!("HMM break - no state transitions");
            }
        }

        if result.is_empty() {
            for (mut candidate, emission) in candidates {
                if emission == 0.0 {
                    continue;
                }

                candidate.set_predecessor(None);
                candidate.set_transition(None);
                candidate.set_filtprob(emission);
                candidate.set_seqprob(emission.log10());

                normsum += emission;
                result.push(candidate);
            }
        }

        if result.is_empty() {
            info!("HMM break - no state emissions");
        }

        for candidate in result.iter_mut() {
            candidate.set_filtprob(candidate.filtprob() / normsum);
        }

        trace!("{} state candidates for state update", result.len());
        Ok(result)
    }
}
