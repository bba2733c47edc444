use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::matcher::MatcherKState;

/// Parameters of the map matching model and of its execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Standard deviation of the position measurement, in metres.
    pub sigma: f64,
    /// Standard deviation of the heading measurement, in degrees.
    pub sigma_azimuth: f64,
    /// Rate of the exponential transition distribution, where `0`
    /// adapts it to the time between samples.
    pub lambda: f64,
    /// Radius around a sample searched for candidates, in metres.
    pub max_radius: f64,
    /// Routing distance bound between two samples, in metres.
    pub max_distance: f64,
    /// Whether to shorten routes which turn around on the road they start on.
    pub shorten_turns: bool,
    /// Size of the routing worker pool.
    pub threads: usize,
    /// Time limit for the routing of a single sample, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Maximum number of steps kept by a match state in addition
    /// to the latest, negative for no limit.
    pub k: i64,
    /// Maximum age of steps kept by a match state in milliseconds,
    /// relative to the latest, non-positive for no limit.
    pub t: i64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            sigma: 5.0,
            sigma_azimuth: 10.0,
            lambda: 0.0,
            max_radius: 200.0,
            max_distance: 15000.0,
            shorten_turns: true,
            threads: std::thread::available_parallelism()
                .map(|threads| threads.get())
                .unwrap_or(1),
            timeout_ms: None,
            k: -1,
            t: -1,
        }
    }
}

fn read<T: FromStr>(key: &str, target: &mut T) {
    let Ok(value) = env::var(key) else {
        return;
    };

    match value.parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!("ignoring invalid value {value:?} of {key}"),
    }
}

impl MatcherConfig {
    /// Reads the configuration from `MAPMATCH_*` variables of the environment
    /// (and of a `.env` file, if present), defaulting those which are unset.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        read("MAPMATCH_SIGMA", &mut config.sigma);
        read("MAPMATCH_SIGMA_AZIMUTH", &mut config.sigma_azimuth);
        read("MAPMATCH_LAMBDA", &mut config.lambda);
        read("MAPMATCH_MAX_RADIUS", &mut config.max_radius);
        read("MAPMATCH_MAX_DISTANCE", &mut config.max_distance);
        read("MAPMATCH_SHORTEN_TURNS", &mut config.shorten_turns);
        read("MAPMATCH_THREADS", &mut config.threads);
        read("MAPMATCH_K", &mut config.k);
        read("MAPMATCH_T", &mut config.t);

        let mut timeout = 0u64;
        read("MAPMATCH_TIMEOUT_MS", &mut timeout);
        if timeout > 0 {
            config.timeout_ms = Some(timeout);
        }

        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// An empty match state bounded by `k` and `t`.
    pub fn kstate(&self) -> MatcherKState {
        MatcherKState::bounded(
            usize::try_from(self.k).ok(),
            u64::try_from(self.t).ok(),
        )
    }
}
