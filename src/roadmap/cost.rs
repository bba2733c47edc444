use crate::roadmap::Road;
use crate::topology::Cost;

/// Speed, in km/h, no road is assumed to be travelled faster than.
pub const HEURISTIC_SPEED: f64 = 130.0;

const HEURISTIC_PRIORITY: f64 = 1.0;

/// Length of a road in metres.
#[derive(Debug, Clone, Copy, Default)]
pub struct Distance;

impl Cost<Road> for Distance {
    fn cost(&self, road: &Road) -> f64 {
        road.length()
    }
}

/// Travel time of a road in seconds, at its speed limit capped to [`HEURISTIC_SPEED`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Time;

impl Cost<Road> for Time {
    fn cost(&self, road: &Road) -> f64 {
        Distance.cost(road) * 3.6 / road.maxspeed().min(HEURISTIC_SPEED)
    }
}

/// Travel time weighted by road priority, preferring roads of low priority values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimePriority;

impl Cost<Road> for TimePriority {
    fn cost(&self, road: &Road) -> f64 {
        Time.cost(road) * road.priority().max(HEURISTIC_PRIORITY)
    }
}
