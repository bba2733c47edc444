use std::f64::consts::PI;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, trace, warn};
use measure_time::debug_time;
use rustc_hash::FxHashMap;

use crate::markov::{CandidateId, Filter, Sample, Transitions};
use crate::matcher::{
    minset, MatchError, MatcherCandidate, MatcherConfig, MatcherKState, MatcherSample,
    MatcherTransition, Scheduler,
};
use crate::roadmap::{Distance, RoadMap, RoadPoint, Route, TimePriority, HEURISTIC_SPEED};
use crate::spatial::{Geography, SpatialOperator};
use crate::topology::{Bound, Dijkstra, Edge, EdgeId, EdgePoint, Router};

#[cfg(feature = "tracing")]
use tracing::Level;

/// Lower bound of the routing distance between two samples, in metres.
const MIN_ROUTING_DISTANCE: f64 = 1000.0;

/// Speed, in m/s, bounding the routing distance between two samples.
const ROUTING_SPEED: f64 = 100.0;

/// Penalty, in metres, of turning around at either end of a route.
const TURN_PENALTY: f64 = 5.0;

/// Lower bound of the heading factor of an emission.
const MIN_AZIMUTH_FACTOR: f64 = 1e-2;

/// Hidden Markov Model map matching of position samples onto a [`RoadMap`].
///
/// Candidates of a sample are the closest points of the roads around it, scored
/// by a Gaussian of their distance to the sample and, if the sample has a heading,
/// of the difference to the road's heading. Transitions are the fastest routes
/// between candidates, scored exponentially by how much longer these take than
/// the direct way at [`HEURISTIC_SPEED`].
#[derive(Debug)]
pub struct Matcher {
    map: Arc<RoadMap>,
    config: MatcherConfig,
    scheduler: Scheduler,
}

impl Matcher {
    pub fn new(map: Arc<RoadMap>, config: MatcherConfig) -> Result<Self, MatchError> {
        let scheduler = Scheduler::new(config.threads, config.timeout())?;

        Ok(Self {
            map,
            config,
            scheduler,
        })
    }

    pub fn map(&self) -> &RoadMap {
        &self.map
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// The probability of measuring the sample at the point.
    pub fn emission(&self, sample: &MatcherSample, point: &RoadPoint) -> f64 {
        let sigma2 = self.config.sigma.powi(2);
        let distance = Geography.distance(sample.point(), point.position());

        let mut emission =
            1.0 / (2.0 * PI * sigma2).sqrt() * (-distance * distance / (2.0 * sigma2)).exp();

        if let Some(azimuth) = sample.azimuth() {
            let sigma2 = self.config.sigma_azimuth.powi(2);
            let difference = (azimuth - point.azimuth()).abs() % 360.0;
            let difference = difference.min(360.0 - difference);

            emission *= (1.0 / (2.0 * PI * sigma2).sqrt()
                * (-difference * difference / (2.0 * sigma2)).exp())
            .max(MIN_AZIMUTH_FACTOR);
        }

        emission
    }

    /// Routing distance bound between two samples, scaled by
    /// the time between them.
    fn bound(&self, previous: &MatcherSample, sample: &MatcherSample) -> f64 {
        let seconds = ((sample.time() - previous.time()) / 1000) as f64;

        (seconds * ROUTING_SPEED)
            .min(self.config.max_distance)
            .max(MIN_ROUTING_DISTANCE)
    }

    /// Scale of the exponential transition distribution, in seconds.
    fn beta(&self, previous: &MatcherSample, sample: &MatcherSample) -> f64 {
        match self.config.lambda == 0.0 {
            true => 2.0 * (((sample.time() - previous.time()) as f64) / 1000.0).max(1.0),
            false => 1.0 / self.config.lambda,
        }
    }

    /// Shortens a route whose first two roads are both directions of the same
    /// base road, turning around at its start instead.
    fn shorten(
        &self,
        start: RoadPoint,
        end: RoadPoint,
        mut roads: Vec<EdgeId>,
    ) -> Option<(RoadPoint, RoadPoint, Vec<EdgeId>)> {
        let (Some(first), Some(second)) = (
            roads.first().and_then(|id| self.map.road(*id)),
            roads.get(1).and_then(|id| self.map.road(*id)),
        ) else {
            return None;
        };

        if first.base().id() != second.base().id() || first.id() == second.id() {
            return None;
        }

        let shortened = if roads.len() > 2 {
            let start = RoadPoint::new(second, 1.0 - start.fraction());
            roads.remove(0);
            (start, end, roads)
        } else if start.fraction() < 1.0 - end.fraction() {
            let fraction = (1.0 - end.fraction() + TURN_PENALTY / first.length()).min(1.0);
            let end = RoadPoint::new(first, fraction);
            roads.truncate(1);
            (start, end, roads)
        } else {
            let fraction = (1.0 - start.fraction() - TURN_PENALTY / second.length()).max(0.0);
            let start = RoadPoint::new(second, fraction);
            roads.remove(0);
            (start, end, roads)
        };

        Some(shortened)
    }

    /// The transition along the routed roads between two candidates.
    fn transition_along(
        &self,
        (previous, predecessor): (&MatcherSample, &RoadPoint),
        (sample, candidate): (&MatcherSample, &RoadPoint),
        roads: Vec<EdgeId>,
    ) -> Option<(MatcherTransition, f64)> {
        let (start, end, roads) = match self.config.shorten_turns {
            true => self
                .shorten(*predecessor, *candidate, roads.clone())
                .unwrap_or((*predecessor, *candidate, roads)),
            false => (*predecessor, *candidate, roads),
        };

        let route = Route::new(start, end, roads, &self.map)
            .inspect_err(|error| warn!("discarding routed transition: {error}"))
            .ok()?;

        let beta = self.beta(previous, sample);
        let direct = Geography.distance(predecessor.position(), candidate.position())
            / (HEURISTIC_SPEED / 3.6);
        let excess = (route.cost(&self.map, &TimePriority) - direct).max(0.0);
        let probability = (1.0 / beta) * (-excess / beta).exp();

        trace!(
            "transition {:?} -> {:?} ({}m, {})",
            predecessor.edge_point(),
            candidate.edge_point(),
            route.length(),
            probability
        );

        Some((MatcherTransition::new(route), probability))
    }

    /// Routes from one predecessor to every candidate.
    fn route_from(
        &self,
        previous: &MatcherSample,
        predecessor: &MatcherCandidate,
        sample: &MatcherSample,
        candidates: &[&MatcherCandidate],
        targets: &[EdgePoint],
    ) -> FxHashMap<CandidateId, (MatcherTransition, f64)> {
        let source = predecessor.payload().edge_point();
        let bound = self.bound(previous, sample);

        let routes = Dijkstra.route_targets(
            self.map.graph(),
            &source,
            targets,
            &TimePriority,
            Some(Bound::new(&Distance, bound)),
        );

        trace!(
            "{} of {} candidates routed from {}",
            routes.iter().flatten().count(),
            targets.len(),
            predecessor.id()
        );

        candidates
            .iter()
            .zip(routes)
            .filter_map(|(candidate, roads)| {
                let transition = self.transition_along(
                    (previous, predecessor.payload()),
                    (sample, candidate.payload()),
                    roads?,
                )?;

                Some((candidate.id().clone(), transition))
            })
            .collect()
    }

    /// Matches the samples, in order of their time, returning the match state.
    ///
    /// Samples closer than `min_distance` metres or `min_interval` milliseconds to the
    /// last matched sample are skipped.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip(self, samples)))]
    pub fn mmatch(
        &self,
        samples: Vec<MatcherSample>,
        min_distance: f64,
        min_interval: i64,
    ) -> Result<MatcherKState, MatchError> {
        debug_time!("matching {} samples", samples.len());

        let mut state = self.config.kstate();
        for sample in samples.into_iter().sorted_by_key(|sample| sample.time()) {
            self.mmatch_incremental(sample, min_distance, min_interval, &mut state)?;
        }

        Ok(state)
    }

    /// Matches a single sample onto the state of the previous samples, returning
    /// whether the sample was matched or skipped for being too close to the last.
    pub fn mmatch_incremental(
        &self,
        sample: MatcherSample,
        min_distance: f64,
        min_interval: i64,
        state: &mut MatcherKState,
    ) -> Result<bool, MatchError> {
        if let Some(last) = state.sample() {
            let distance = Geography.distance(sample.point(), last.point());
            let interval = sample.time() - last.time();

            if distance < min_distance.max(0.0) || interval < min_interval.max(0) {
                trace!("skipping sample {} ({distance}m, {interval}ms)", sample.id());
                return Ok(false);
            }
        }

        // After a break the sample starts a new chain.
        let vector = match state.is_broken() {
            true => self.execute(&[], None, &sample)?,
            false => {
                let predecessors = state.vector();
                self.execute(&predecessors, state.sample(), &sample)?
            }
        };

        debug!("{} state candidates for sample {}", vector.len(), sample.id());
        state.update(vector, sample)?;
        Ok(true)
    }
}

impl Filter for Matcher {
    type Payload = RoadPoint;
    type Transition = MatcherTransition;
    type Sample = MatcherSample;
    type Error = MatchError;

    fn candidates(
        &self,
        predecessors: &[&MatcherCandidate],
        sample: &MatcherSample,
    ) -> Result<Vec<(MatcherCandidate, f64)>, MatchError> {
        let found = self
            .map
            .spatial()?
            .radius(sample.point(), self.config.max_radius);

        let mut points = minset::minimize(&found, self.map.graph());

        // A candidate never falls behind its predecessor on the same road.
        for predecessor in predecessors {
            let previous = predecessor.payload();
            let Some(point) = points.iter_mut().find(|point| point.road() == previous.road())
            else {
                continue;
            };

            if point.fraction() < previous.fraction()
                && Geography.distance(point.position(), previous.position()) < self.config.sigma
            {
                *point = *previous;
            }
        }

        debug!("{} ({}) candidates", points.len(), found.len());

        Ok(points
            .into_iter()
            .map(|point| {
                let emission = self.emission(sample, &point);
                let candidate = MatcherCandidate::new(point);
                trace!("candidate {} {:?} {}", candidate.id(), point.edge_point(), emission);
                (candidate, emission)
            })
            .collect())
    }

    fn transition(
        &self,
        (previous, predecessor): (&MatcherSample, &MatcherCandidate),
        (sample, candidate): (&MatcherSample, &MatcherCandidate),
    ) -> Result<Option<(MatcherTransition, f64)>, MatchError> {
        let roads = Dijkstra.route(
            self.map.graph(),
            &predecessor.payload().edge_point(),
            &candidate.payload().edge_point(),
            &TimePriority,
            Some(Bound::new(&Distance, self.bound(previous, sample))),
        );

        Ok(roads.and_then(|roads| {
            self.transition_along(
                (previous, predecessor.payload()),
                (sample, candidate.payload()),
                roads,
            )
        }))
    }

    /// Routes from every predecessor concurrently, one task per predecessor.
    fn transitions(
        &self,
        (previous, predecessors): (&MatcherSample, &[&MatcherCandidate]),
        (sample, candidates): (&MatcherSample, &[&MatcherCandidate]),
    ) -> Result<Transitions<MatcherTransition>, MatchError> {
        debug_time!(
            "routing {} x {} candidates",
            predecessors.len(),
            candidates.len()
        );

        let targets = candidates
            .iter()
            .map(|candidate| candidate.payload().edge_point())
            .collect::<Vec<_>>();

        let routed = self.scheduler.run(predecessors.to_vec(), |predecessor| {
            let transitions =
                self.route_from(previous, predecessor, sample, candidates, &targets);
            (predecessor.id().clone(), transitions)
        })?;

        trace!(
            "{} transitions",
            routed.iter().map(|(_, transitions)| transitions.len()).sum::<usize>()
        );

        Ok(routed.into_iter().collect())
    }
}
