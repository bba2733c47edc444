use approx::assert_relative_eq;
use geo::{line_string, point, Destination, Geodesic, LineString, Point};
use rstar::{Envelope, PointDistance};

use crate::spatial::*;

fn segment() -> LineString {
    line_string![(x: 11.4047661, y: 48.1403687), (x: 11.4053519, y: 48.141055)]
}

/// Brute-force interception by sampling the line.
fn sampled_intercept(line: &LineString, point: Point) -> (f64, f64) {
    let steps = 1000;

    (0..=steps)
        .map(|step| {
            let fraction = step as f64 / steps as f64;
            let distance = Geography.distance(Geography.interpolate(line, fraction), point);
            (fraction, distance)
        })
        .fold((0.0, f64::INFINITY), |best, next| match next.1 < best.1 {
            true => next,
            false => best,
        })
}

#[test]
fn distance_between_capitals() {
    let reykjavik = point!(x: -21.933333, y: 64.15);
    let berlin = point!(x: 13.408056, y: 52.518611);

    // Haversine distance on the mean earth radius.
    assert_relative_eq!(
        Geography.distance(berlin, reykjavik),
        2_395_000.0,
        max_relative = 0.01
    );
    assert_relative_eq!(Geography.distance(berlin, berlin), 0.0);
}

#[test]
fn intercept_around_segment() {
    let line = segment();
    let points = [
        point!(x: 11.406501117689324, y: 48.14051652560591),
        point!(x: 11.406713245538327, y: 48.14182906667162),
        point!(x: 11.404923416812364, y: 48.14258477213369),
        point!(x: 11.403300759321036, y: 48.14105540093837),
        point!(x: 11.403193249043934, y: 48.140881120346386),
        point!(x: 11.40327279698731, y: 48.13987351306362),
        point!(x: 11.405221721600025, y: 48.1392039845402),
        point!(x: 11.406255844863914, y: 48.13963486923349),
    ];

    for point in points {
        let fraction = Geography.intercept(&line, point);
        let (expected, distance) = sampled_intercept(&line, point);

        assert!((0.0..=1.0).contains(&fraction));
        assert_relative_eq!(fraction, expected, epsilon = 0.01);

        let closest = Geography.interpolate(&line, fraction);
        assert_relative_eq!(Geography.distance(closest, point), distance, epsilon = 0.5);
    }
}

#[test]
fn intercept_diagonal_at_high_latitude() {
    // Degrees of longitude are half as long as degrees of latitude here.
    let line = line_string![(x: 10.0, y: 60.0), (x: 10.02, y: 60.01)];
    let points = [
        point!(x: 10.0, y: 60.01),
        point!(x: 10.02, y: 60.0),
        point!(x: 10.01, y: 60.008),
        point!(x: 10.005, y: 59.999),
        point!(x: 10.03, y: 60.02),
    ];

    for point in points {
        let fraction = Geography.intercept(&line, point);
        let (expected, distance) = sampled_intercept(&line, point);

        assert_relative_eq!(fraction, expected, epsilon = 0.01);

        let closest = Geography.interpolate(&line, fraction);
        assert_relative_eq!(Geography.distance(closest, point), distance, epsilon = 0.5);
    }

    assert_relative_eq!(
        Geography.intercept(&line, point!(x: 10.0, y: 60.01)),
        0.5,
        epsilon = 0.02
    );
}

#[test]
fn interpolate_polyline() {
    let line = line_string![(x: 11.0, y: 48.0), (x: 11.0, y: 48.001), (x: 11.001, y: 48.001)];
    let length = Geography.length(&line);

    let first = Geography.distance(point!(x: 11.0, y: 48.0), point!(x: 11.0, y: 48.001));
    let halfway = Geography.interpolate(&line, first / length);
    assert_relative_eq!(halfway.x(), 11.0, epsilon = 1e-9);
    assert_relative_eq!(halfway.y(), 48.001, epsilon = 1e-9);

    let start = Geography.interpolate(&line, 0.0);
    assert_relative_eq!(start.x(), 11.0, epsilon = 1e-9);
    assert_relative_eq!(start.y(), 48.0, epsilon = 1e-9);
    let end = Geography.interpolate(&line, 1.0);
    assert_relative_eq!(end.x(), 11.001, epsilon = 1e-9);
    assert_relative_eq!(end.y(), 48.001, epsilon = 1e-9);
}

#[test]
fn azimuth_along_polyline() {
    let line = line_string![(x: 11.0, y: 48.0), (x: 11.0, y: 48.001), (x: 11.001, y: 48.001)];

    assert_relative_eq!(Geography.azimuth(&line, 0.1), 0.0, epsilon = 1e-6);
    assert_relative_eq!(Geography.azimuth(&line, 0.9), 90.0, epsilon = 0.1);

    let reverse = line_string![(x: 11.001, y: 48.001), (x: 11.0, y: 48.001), (x: 11.0, y: 48.0)];
    assert_relative_eq!(Geography.azimuth(&reverse, 0.1), 270.0, epsilon = 0.1);
    assert_relative_eq!(Geography.azimuth(&reverse, 0.9), 180.0, epsilon = 1e-6);
}

#[test]
fn envelope_encloses_radius() {
    let center = point!(x: 11.0, y: 48.0);
    let envelope = Geography.envelope(center, 100.0);

    for bearing in [0.0, 90.0, 180.0, 270.0] {
        let edge = Geodesic.destination(center, bearing, 99.0);
        assert!(envelope.contains_point(&edge));
    }
}

fn index() -> RTreeIndex {
    RTreeIndex::bulk_load(
        Geography,
        [
            (1, line_string![(x: 11.0, y: 48.0), (x: 11.0, y: 48.001)]),
            (2, line_string![(x: 11.0005, y: 48.0), (x: 11.0005, y: 48.001)]),
            (3, line_string![(x: 11.01, y: 48.0), (x: 11.01, y: 48.001)]),
        ],
    )
}

#[test]
fn index_radius() {
    let index = index();
    let query = point!(x: 11.0001, y: 48.0005);

    let mut ids = index
        .radius(query, 50.0)
        .into_iter()
        .map(|hit| hit.id)
        .collect::<Vec<_>>();
    ids.sort();

    assert_eq!(ids, vec![1, 2]);

    let hits = index.radius(query, 10.0);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 1);
    assert_relative_eq!(hits[0].fraction, 0.5, epsilon = 1e-3);
    assert!(hits[0].distance < 10.0);
}

#[test]
fn index_nearest() {
    let index = index();

    let nearest = index.nearest(point!(x: 11.0004, y: 48.0005));
    assert_eq!(nearest.len(), 1);
    assert_eq!(nearest[0].id, 2);

    let knearest = index
        .knearest(point!(x: 11.0001, y: 48.0005), 2)
        .into_iter()
        .map(|hit| hit.id)
        .collect::<Vec<_>>();
    assert_eq!(knearest, vec![1, 2]);
}

#[test]
fn indexed_line_planar_distance() {
    let line = IndexedLine::new(
        1,
        line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0)],
    );

    assert_relative_eq!(line.distance_2(&point!(x: 1.0, y: 1.0)), 1.0);
    assert_relative_eq!(line.distance_2(&point!(x: 3.0, y: 1.0)), 1.0);
    assert_relative_eq!(line.distance_2(&point!(x: 3.0, y: 3.0)), 2.0);
    assert_relative_eq!(line.distance_2(&point!(x: -3.0, y: -4.0)), 25.0);
    assert_relative_eq!(line.distance_2(&point!(x: 2.0, y: 1.0)), 0.0);
}

#[test]
fn index_ignores_repeated_ids() {
    let mut index = index();
    assert_eq!(index.len(), 3);
    assert!(!index.insert(1, line_string![(x: 12.0, y: 48.0), (x: 12.0, y: 48.001)]));
    assert!(index.insert(4, line_string![(x: 12.0, y: 48.0), (x: 12.0, y: 48.001)]));
    assert!(index.contains(4));

    index.clear();
    assert!(index.is_empty());
}
