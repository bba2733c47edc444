use std::f64::consts::SQRT_2;

use geo::{
    Bearing, Closest, Destination, Distance, Geodesic, Haversine, HaversineClosestPoint,
    InterpolatePoint, Line, LineString, Point,
};
use rstar::AABB;

/// Metric operations over geographic geometries, where distances are in metres
/// and azimuths in degrees clockwise from north, within `[0, 360)`.
///
/// Fractions along a line string are relative to its metric length.
pub trait SpatialOperator: Send + Sync {
    /// The distance between two points.
    fn distance(&self, a: Point, b: Point) -> f64;

    /// The length of a line string.
    fn length(&self, line: &LineString) -> f64;

    /// The fraction of the line string's closest point to the given point.
    fn intercept(&self, line: &LineString, point: Point) -> f64;

    /// The point at a fraction of the line string.
    fn interpolate(&self, line: &LineString, fraction: f64) -> Point;

    /// The heading of the line string at a fraction of it.
    fn azimuth(&self, line: &LineString, fraction: f64) -> f64;

    /// A box enclosing the circle of the radius around the point.
    fn envelope(&self, point: Point, radius: f64) -> AABB<Point>;
}

/// Operations on the WGS-84 sphere approximated by the haversine formulae,
/// with envelopes projected geodesically.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geography;

impl Geography {
    /// Locates the segment covering the given distance from the start of the
    /// line, returning the segment and the ratio of it covered.
    fn locate(&self, line: &LineString, distance: f64) -> Option<(Line, f64)> {
        let mut covered = 0.0;
        let mut last = None;

        for segment in line.lines() {
            let length = Haversine.distance(segment.start_point(), segment.end_point());
            if length > 0.0 && covered + length >= distance {
                return Some((segment, ((distance - covered) / length).clamp(0.0, 1.0)));
            }

            covered += length;
            if length > 0.0 {
                last = Some(segment);
            }
        }

        last.or_else(|| line.lines().next()).map(|segment| (segment, 1.0))
    }
}

impl SpatialOperator for Geography {
    fn distance(&self, a: Point, b: Point) -> f64 {
        Haversine.distance(a, b)
    }

    fn length(&self, line: &LineString) -> f64 {
        line.lines()
            .map(|segment| Haversine.distance(segment.start_point(), segment.end_point()))
            .sum()
    }

    fn intercept(&self, line: &LineString, point: Point) -> f64 {
        let mut best = (f64::INFINITY, 0.0);
        let mut covered = 0.0;

        for segment in line.lines() {
            let length = Haversine.distance(segment.start_point(), segment.end_point());
            // Closest point on the great circle arc, not the planar projection.
            let closest = match segment.haversine_closest_point(&point) {
                Closest::Intersection(closest) | Closest::SinglePoint(closest) => closest,
                Closest::Indeterminate => segment.start_point(),
            };
            let distance = Haversine.distance(closest, point);

            if distance < best.0 {
                let along = Haversine.distance(segment.start_point(), closest).min(length);
                best = (distance, covered + along);
            }

            covered += length;
        }

        match covered > 0.0 {
            true => (best.1 / covered).clamp(0.0, 1.0),
            false => 0.0,
        }
    }

    fn interpolate(&self, line: &LineString, fraction: f64) -> Point {
        let distance = self.length(line) * fraction.clamp(0.0, 1.0);

        match self.locate(line, distance) {
            Some((segment, ratio)) => {
                Haversine.point_at_ratio_between(segment.start_point(), segment.end_point(), ratio)
            }
            None => line.points().next().unwrap_or_else(|| Point::new(0.0, 0.0)),
        }
    }

    fn azimuth(&self, line: &LineString, fraction: f64) -> f64 {
        let distance = self.length(line) * fraction.clamp(0.0, 1.0);

        self.locate(line, distance)
            .map(|(segment, _)| Haversine.bearing(segment.start_point(), segment.end_point()))
            .unwrap_or_default()
            .rem_euclid(360.0)
    }

    fn envelope(&self, point: Point, radius: f64) -> AABB<Point> {
        // Corners sit on the diagonals, at the radius of the circumscribed square.
        let bottom_right = Geodesic.destination(point, 135.0, radius * SQRT_2);
        let top_left = Geodesic.destination(point, 315.0, radius * SQRT_2);

        AABB::from_corners(top_left, bottom_right)
    }
}
