use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use geo::{line_string, point};
use serde_json::json;

use crate::markov::{Filter, Sample};
use crate::matcher::*;
use crate::roadmap::{BaseRoad, RoadMap, RoadPoint};

/// One-way roads meeting at two junctions: base roads 0 and 1 lead into
/// vertex 2, base road 2 continues to vertex 3, from which base roads 3, 4
/// and 5 fan out.
fn fan() -> RoadMap {
    let v = [
        (11.000, 48.000),
        (11.002, 48.000),
        (11.001, 48.001),
        (11.001, 48.002),
        (11.000, 48.003),
        (11.001, 48.003),
        (11.002, 48.003),
    ];
    let line = |a: usize, b: usize| {
        line_string![(x: v[a].0, y: v[a].1), (x: v[b].0, y: v[b].1)]
    };

    let mut map = [(0, 2), (1, 2), (2, 3), (3, 4), (3, 5), (3, 6)]
        .into_iter()
        .enumerate()
        .map(|(base, (a, b))| {
            BaseRoad::new(base as i64, a as i64, b as i64, line(a, b)).with_oneway(true)
        })
        .collect::<RoadMap>();

    map.construct();
    map
}

/// A one-way road north over three segments, with a one-way
/// side road heading east from the end of the first segment.
fn corridor() -> Arc<RoadMap> {
    let mut map = [
        BaseRoad::new(0, 0, 1, line_string![(x: 11.0, y: 48.000), (x: 11.0, y: 48.001)]),
        BaseRoad::new(1, 1, 2, line_string![(x: 11.0, y: 48.001), (x: 11.0, y: 48.002)]),
        BaseRoad::new(2, 2, 3, line_string![(x: 11.0, y: 48.002), (x: 11.0, y: 48.003)]),
        BaseRoad::new(3, 1, 4, line_string![(x: 11.0, y: 48.001), (x: 11.0015, y: 48.001)]),
    ]
    .into_iter()
    .map(|base| base.with_oneway(true))
    .collect::<RoadMap>();

    map.construct();
    Arc::new(map)
}

fn matcher(map: Arc<RoadMap>) -> Matcher {
    let config = MatcherConfig {
        threads: 2,
        ..MatcherConfig::default()
    };

    Matcher::new(map, config).expect("worker pool")
}

fn trace() -> Vec<MatcherSample> {
    [48.0002, 48.0008, 48.0014, 48.0022, 48.0027]
        .into_iter()
        .enumerate()
        .map(|(i, y)| MatcherSample::new(format!("s{i}"), i as i64 * 5000, point!(x: 11.00002, y: y)))
        .collect()
}

fn minimized(map: &RoadMap, points: &[(i64, f64)]) -> Vec<i64> {
    let points = points
        .iter()
        .map(|(road, fraction)| map.point(*road, *fraction).expect("known road"))
        .collect::<Vec<_>>();

    let mut roads = minset::minimize(&points, map.graph())
        .iter()
        .map(RoadPoint::road)
        .collect::<Vec<_>>();
    roads.sort();
    roads
}

#[test]
fn minset_keeps_leaving_roads() {
    let map = fan();

    assert_eq!(
        minimized(&map, &[(0, 1.0), (2, 1.0), (4, 0.5), (6, 0.0), (8, 0.0), (10, 0.0)]),
        vec![4]
    );
    assert_eq!(
        minimized(&map, &[(0, 1.0), (2, 1.0), (4, 1.0), (8, 0.5), (10, 0.5)]),
        vec![4, 8, 10]
    );
    assert_eq!(
        minimized(&map, &[(4, 1.0), (6, 0.0), (8, 0.5), (10, 0.5)]),
        vec![4, 8, 10]
    );
    assert_eq!(
        minimized(&map, &[(0, 1.0), (2, 1.0), (4, 1.0), (6, 0.2), (8, 0.5), (10, 0.5)]),
        vec![6, 8, 10]
    );
}

#[test]
fn minset_rounds_fractions() {
    let map = fan();

    assert_eq!(
        minimized(&map, &[(4, 1.0 - 1e-10), (6, 1e-10), (8, 0.5), (10, 0.5)]),
        vec![4, 8, 10]
    );
    assert_eq!(minimized(&map, &[]), Vec::<i64>::new());
}

#[test]
fn emission_of_distance_and_heading() {
    let map = corridor();
    let matcher = matcher(map.clone());
    let point = map.point(0, 0.5).expect("point");

    let sample = MatcherSample::new("a", 0, point.position());
    let gaussian = 1.0 / (2.0 * PI * 25.0).sqrt();
    assert_relative_eq!(matcher.emission(&sample, &point), gaussian, epsilon = 1e-9);

    let aligned = sample.clone().with_azimuth(360.0);
    let heading = 1.0 / (2.0 * PI * 100.0).sqrt();
    assert_relative_eq!(
        matcher.emission(&aligned, &point),
        gaussian * heading,
        epsilon = 1e-6
    );

    let opposed = sample.clone().with_azimuth(180.0);
    assert_relative_eq!(
        matcher.emission(&opposed, &point),
        gaussian * 1e-2,
        epsilon = 1e-9
    );

    let offset = MatcherSample::new("b", 0, point!(x: 11.0001, y: 48.0005));
    assert!(matcher.emission(&offset, &point) < gaussian);
}

#[test]
fn sample_from_json() {
    let sample = MatcherSample::from_json(&json!({
        "id": "a",
        "time": "2014-09-10 06:54:07+0200",
        "point": "POINT(11.564388282625075 48.16350662940509)",
        "azimuth": -90.0,
    }))
    .expect("valid sample");

    assert_eq!(sample.id(), "a");
    assert_eq!(sample.time(), 1410324847000);
    assert_relative_eq!(sample.point().x(), 11.564388282625075);
    assert_eq!(sample.azimuth(), Some(270.0));

    let restored = MatcherSample::from_json(&sample.to_json()).expect("valid sample");
    assert_eq!(restored, sample);

    let numeric = MatcherSample::from_json(&json!({ "id": 7, "time": 1000, "point": "POINT(1 2)" }))
        .expect("valid sample");
    assert_eq!((numeric.id(), numeric.time()), ("7", 1000));
    assert_eq!(numeric.azimuth(), None);

    assert!(matches!(
        MatcherSample::from_json(&json!({ "point": "POINT(1 2)" })),
        Err(MatchError::MalformedSample(_))
    ));
    assert!(matches!(
        MatcherSample::from_json(&json!({ "time": "yesterday", "point": "POINT(1 2)" })),
        Err(MatchError::MalformedSample(_))
    ));
    assert!(matches!(
        MatcherSample::from_json(&json!({ "time": 0, "point": "LINESTRING(1 2, 3 4)" })),
        Err(MatchError::MalformedSample(_))
    ));
}

#[test]
fn config_defaults_and_environment() {
    let config = MatcherConfig::default();
    assert_eq!(config.sigma, 5.0);
    assert_eq!(config.max_distance, 15000.0);
    assert!(config.shorten_turns);
    assert!(config.threads >= 1);
    assert_eq!(config.timeout(), None);

    let state = config.kstate();
    assert_eq!((state.k(), state.t()), (None, None));

    let partial: MatcherConfig =
        serde_json::from_value(json!({ "sigma": 10.0, "k": 3 })).expect("valid config");
    assert_eq!(partial.sigma, 10.0);
    assert_eq!(partial.kstate().k(), Some(3));
    assert_eq!(partial.lambda, 0.0);

    std::env::set_var("MAPMATCH_SIGMA", "7.5");
    std::env::set_var("MAPMATCH_T", "60000");
    std::env::set_var("MAPMATCH_MAX_RADIUS", "far");
    std::env::set_var("MAPMATCH_TIMEOUT_MS", "250");

    let config = MatcherConfig::from_env();
    assert_eq!(config.sigma, 7.5);
    assert_eq!(config.kstate().t(), Some(60000));
    assert_eq!(config.max_radius, 200.0);
    assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
}

#[test]
fn scheduler_keeps_input_order() {
    let scheduler = Scheduler::new(4, None).expect("worker pool");
    assert_eq!(scheduler.threads(), 4);

    let results = scheduler
        .run((0..64u64).collect(), |i| {
            std::thread::sleep(Duration::from_micros((64 - i) * 10));
            i * i
        })
        .expect("completed");

    assert_eq!(results, (0..64u64).map(|i| i * i).collect::<Vec<_>>());
    assert_eq!(scheduler.run(Vec::<u64>::new(), |i| i), Ok(vec![]));
}

#[test]
fn scheduler_reports_panics() {
    let scheduler = Scheduler::new(2, None).expect("worker pool");
    let result = scheduler.run(vec![1, 2, 3], |i| {
        if i == 2 {
            panic!("task failure");
        }
        i
    });

    assert_eq!(result, Err(SchedulerError::TaskPanicked));
}

#[test]
fn scheduler_times_out() {
    let scheduler = Scheduler::new(2, Some(Duration::from_millis(20))).expect("worker pool");
    let result = scheduler.run(vec![0u64, 200], |millis| {
        std::thread::sleep(Duration::from_millis(millis));
        millis
    });

    assert!(matches!(
        result,
        Err(SchedulerError::Timeout { expected: 2, .. })
    ));
}

#[test]
fn scheduler_runs_nested_batches() {
    let scheduler = Scheduler::new(1, Some(Duration::from_secs(10))).expect("worker pool");

    let results = scheduler
        .run(vec![1u64, 2], |i| {
            scheduler
                .run(vec![i, i * 10], |j| j + 1)
                .expect("nested batch completed")
        })
        .expect("completed");

    assert_eq!(results, vec![vec![2, 11], vec![3, 21]]);
}

#[test_log::test]
fn candidates_are_minimized() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let sample = MatcherSample::new("a", 0, point!(x: 11.00002, y: 48.0002));
    let candidates = matcher.candidates(&[], &sample).expect("constructed map");

    let mut roads = candidates
        .iter()
        .map(|(candidate, _)| candidate.payload().road())
        .collect::<Vec<_>>();
    roads.sort_unstable();
    assert_eq!(roads, vec![0, 6]);

    let (nearest, emission) = candidates
        .iter()
        .find(|(candidate, _)| candidate.payload().road() == 0)
        .expect("road 0 is a candidate");
    assert_relative_eq!(nearest.payload().fraction(), 0.2, epsilon = 1e-3);
    assert!(*emission > 0.0);
    assert!(candidates.iter().all(|(_, other)| other <= emission));
}

#[test_log::test]
fn candidates_keep_position_of_predecessor() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let predecessor = MatcherCandidate::new(map.point(2, 0.5).expect("point"));
    let sample = MatcherSample::new("a", 0, point!(x: 11.0, y: 48.00149));

    let candidates = matcher
        .candidates(&[&predecessor], &sample)
        .expect("constructed map");

    let (candidate, _) = candidates
        .iter()
        .find(|(candidate, _)| candidate.payload().road() == 2)
        .expect("candidate on the predecessor's road");
    assert_eq!(candidate.payload(), predecessor.payload());
}

#[test_log::test]
fn batch_transitions_match_pairwise() {
    let map = corridor();
    let matcher = matcher(map.clone());
    let samples = trace();

    let predecessors = [
        MatcherCandidate::new(map.point(0, 0.2).expect("point")),
        MatcherCandidate::new(map.point(0, 0.5).expect("point")),
    ];
    let candidates = [
        MatcherCandidate::new(map.point(0, 0.8).expect("point")),
        MatcherCandidate::new(map.point(6, 0.1).expect("point")),
        MatcherCandidate::new(map.point(2, 0.3).expect("point")),
    ];

    let predecessors = predecessors.iter().collect::<Vec<_>>();
    let candidates = candidates.iter().collect::<Vec<_>>();

    let transitions = matcher
        .transitions(
            (&samples[0], predecessors.as_slice()),
            (&samples[1], candidates.as_slice()),
        )
        .expect("routed");

    assert_eq!(transitions.len(), 2);
    for predecessor in predecessors.iter().copied() {
        let reachable = transitions.get(predecessor.id()).expect("predecessor");
        assert_eq!(reachable.len(), 3);

        for candidate in candidates.iter().copied() {
            let (route, probability) = reachable.get(candidate.id()).expect("candidate");
            let (pairwise, expected) = matcher
                .transition((&samples[0], predecessor), (&samples[1], candidate))
                .expect("routed")
                .expect("reachable");

            assert_eq!(route, &pairwise);
            assert_relative_eq!(*probability, expected);
            assert!(*probability > 0.0 && *probability <= 1.0 / 10.0);
        }
    }

    // A candidate behind its predecessor on a one-way road is out of reach.
    let behind = MatcherCandidate::new(map.point(0, 0.1).expect("point"));
    let unreachable = matcher
        .transition((&samples[0], predecessors[1]), (&samples[1], &behind))
        .expect("routed");
    assert!(unreachable.is_none());
}

#[test_log::test]
fn shortened_turns() {
    let mut map = [
        BaseRoad::new(0, 0, 1, line_string![(x: 11.0, y: 48.000), (x: 11.0, y: 48.001)]),
        BaseRoad::new(1, 1, 2, line_string![(x: 11.0, y: 48.001), (x: 11.0, y: 48.002)]),
    ]
    .into_iter()
    .collect::<RoadMap>();
    map.construct();
    let map = Arc::new(map);

    let matcher = matcher(map.clone());
    let samples = trace();

    // Turning around on the start road: the route keeps to the start road only.
    let predecessor = MatcherCandidate::new(map.point(0, 0.2).expect("point"));
    let candidate = MatcherCandidate::new(map.point(1, 0.7).expect("point"));
    let (transition, _) = matcher
        .transition((&samples[0], &predecessor), (&samples[1], &candidate))
        .expect("routed")
        .expect("reachable");

    assert_eq!(transition.route().roads(), &[0]);
    assert_eq!(transition.route().source(), predecessor.payload());
    assert!(transition.route().target().fraction() > 0.3);
}

#[test_log::test]
fn matches_trace() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let state = matcher.mmatch(trace(), 0.0, 0).expect("matched");
    assert_eq!(state.steps(), 5);
    assert_eq!(state.breaks(), 0);

    let sequence = state.sequence();
    assert_eq!(
        sequence.iter().map(|candidate| candidate.payload().road()).collect::<Vec<_>>(),
        vec![0, 0, 2, 4, 4]
    );

    assert!(sequence[0].transition().is_none());
    for pair in sequence.windows(2) {
        let route = pair[1].transition().expect("transition").route();
        assert_eq!(route.source(), pair[0].payload());
        assert_eq!(route.target(), pair[1].payload());
        assert!(route.length() > 0.0);
    }

    let estimate = state.estimate().expect("estimate");
    assert_eq!(estimate.payload().road(), 4);
    assert_relative_eq!(estimate.payload().fraction(), 0.7, epsilon = 1e-3);

    let total = state.vector().iter().map(|candidate| candidate.filtprob()).sum::<f64>();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);
}

#[test_log::test]
fn matches_unordered_samples() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let mut samples = trace();
    samples.reverse();

    let state = matcher.mmatch(samples, 0.0, 0).expect("matched");
    assert_eq!(
        state.samples().map(Sample::time).collect::<Vec<_>>(),
        vec![0, 5000, 10000, 15000, 20000]
    );
}

#[test_log::test]
fn skips_close_samples() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let state = matcher.mmatch(trace(), 0.0, 6000).expect("matched");
    assert_eq!(
        state.samples().map(MatcherSample::id).collect::<Vec<_>>(),
        vec!["s0", "s2", "s4"]
    );

    let state = matcher.mmatch(trace(), 100.0, 0).expect("matched");
    assert_eq!(
        state.samples().map(MatcherSample::id).collect::<Vec<_>>(),
        vec!["s0", "s2", "s4"]
    );

    let mut state = matcher.config().kstate();
    let mut samples = trace().into_iter();
    let first = samples.next().expect("sample");
    let second = samples.next().expect("sample");

    assert!(matches!(matcher.mmatch_incremental(first, 0.0, 0, &mut state), Ok(true)));
    assert!(matches!(
        matcher.mmatch_incremental(second, 0.0, 10000, &mut state),
        Ok(false)
    ));
    assert_eq!(state.steps(), 1);
}

#[test_log::test]
fn breaks_on_remote_sample() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let mut state = matcher.mmatch(trace(), 0.0, 0).expect("matched");
    let remote = MatcherSample::new("remote", 25000, point!(x: 12.0, y: 49.0));

    assert!(matches!(matcher.mmatch_incremental(remote, 0.0, 0, &mut state), Ok(true)));
    assert_eq!(state.breaks(), 1);
    assert_eq!(state.steps(), 5);
    assert_eq!(state.time(), Some(20000));
}

#[test_log::test]
fn starts_new_chain_after_break() {
    let map = corridor();
    let matcher = matcher(map.clone());

    let mut state = matcher.mmatch(trace(), 0.0, 0).expect("matched");
    let remote = MatcherSample::new("remote", 25000, point!(x: 12.0, y: 49.0));
    assert!(matches!(matcher.mmatch_incremental(remote, 0.0, 0, &mut state), Ok(true)));
    assert!(state.is_broken());

    let back = MatcherSample::new("back", 30000, point!(x: 11.00002, y: 48.0029));
    assert!(matches!(matcher.mmatch_incremental(back, 0.0, 0, &mut state), Ok(true)));

    assert!(!state.is_broken());
    assert_eq!(state.breaks(), 1);
    assert_eq!(state.time(), Some(30000));

    let vector = state.vector();
    assert!(!vector.is_empty());
    for candidate in vector {
        assert!(candidate.predecessor().is_none());
        assert!(candidate.transition().is_none());
    }
}

#[test_log::test]
fn requires_constructed_map() {
    let mut map = [BaseRoad::new(0, 0, 1, line_string![(x: 11.0, y: 48.0), (x: 11.0, y: 48.001)])]
        .into_iter()
        .collect::<RoadMap>();
    map.construct();
    map.deconstruct();

    let matcher = matcher(Arc::new(map));
    assert!(matches!(
        matcher.mmatch(trace(), 0.0, 0),
        Err(MatchError::RoadMap(_))
    ));
}

#[test_log::test]
fn bounded_state() {
    let map = corridor();
    let config = MatcherConfig {
        threads: 1,
        k: 1,
        ..MatcherConfig::default()
    };

    let matcher = Matcher::new(map, config).expect("worker pool");
    let state = matcher.mmatch(trace(), 0.0, 0).expect("matched");

    assert_eq!(state.steps(), 2);
    assert_eq!(
        state.samples().map(MatcherSample::id).collect::<Vec<_>>(),
        vec!["s3", "s4"]
    );
}

#[test_log::test]
fn snapshot_round_trip() {
    let map = corridor();
    let matcher = matcher(map.clone());
    let state = matcher.mmatch(trace(), 0.0, 0).expect("matched");

    let factory = MatcherFactory::new(map.clone());
    let snapshot = state.to_snapshot(&factory).expect("snapshot");
    assert_eq!(snapshot["sequence"].as_array().map(Vec::len), Some(5));

    let restored = MatcherKState::from_snapshot(&snapshot, &factory).expect("restored");
    assert_eq!(restored.size(), state.size());
    assert_eq!(restored.steps(), state.steps());

    let roads = |state: &MatcherKState| {
        state
            .sequence()
            .iter()
            .map(|candidate| (candidate.payload().road(), candidate.transition().cloned()))
            .collect::<Vec<_>>()
    };
    assert_eq!(roads(&restored), roads(&state));
}

#[test_log::test]
fn exports() {
    let map = corridor();
    let matcher = matcher(map.clone());
    let state = matcher.mmatch(trace(), 0.0, 0).expect("matched");

    let geojson = state.to_geojson(&map);
    assert_eq!(geojson["type"], "MultiLineString");
    assert_eq!(geojson["coordinates"].as_array().map(Vec::len), Some(4));

    let slim = state.to_slim_json(&map);
    let slim = slim.as_array().expect("array");
    assert_eq!(slim.len(), 5);
    assert_eq!(slim[0]["point"]["road"], 0);
    assert!(slim[0].get("route").is_none());
    assert!(slim[1]["route"].as_str().is_some_and(|wkt| wkt.starts_with("LINESTRING")));

    let debug = state.to_debug_json(&map);
    assert_eq!(debug["samples"].as_array().map(Vec::len), Some(5));
    assert_eq!(debug["sequence"][4]["time"], 20);
    assert_eq!(debug["sequence"][4]["road"], 4);

    let monitor = state.to_monitor_json(&map);
    assert_eq!(monitor["time"], 20000);
    assert!(monitor["point"].as_str().is_some_and(|wkt| wkt.starts_with("POINT")));
    assert!(monitor["route"]
        .as_str()
        .is_some_and(|wkt| wkt.starts_with("MULTILINESTRING")));
    assert!(!monitor["candidates"].as_array().expect("array").is_empty());

    let empty = matcher.config().kstate();
    assert_eq!(empty.to_monitor_json(&map), json!({}));
    assert_eq!(empty.to_geojson(&map)["coordinates"], json!([]));
}

#[test]
fn unknown_road_in_snapshot() {
    let map = corridor();
    let factory = MatcherFactory::new(map);

    let snapshot = json!({
        "k": -1,
        "t": -1,
        "sequence": [{
            "vector": [{ "candid": "a", "predid": "" }],
            "sample": { "id": "s", "time": 0, "point": "POINT(11 48)" },
            "kestid": "a",
        }],
        "candidates": [{
            "candidate": {
                "id": "a",
                "filtprob": 1.0,
                "seqprob": 0.0,
                "point": { "road": 99, "frac": 0.5 },
            },
            "count": 0,
        }],
    });

    assert!(MatcherKState::from_snapshot(&snapshot, &factory).is_err());
}
