//! Planner configuration from defaults or environment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Wall-clock budget for ordering legs.
    pub solver_budget: Duration,
    /// Upper bound on 2-opt improvement passes in the heuristic path.
    pub max_two_opt_passes: usize,
    /// Riding speed used to estimate time spent on a leg.
    pub leg_speed_kmh: f64,
    /// Deadline for a whole planning request.
    pub request_deadline: Duration,
    /// Prefix for segment links in responses.
    pub segment_url_base: String,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            solver_budget: Duration::from_millis(500),
            max_two_opt_passes: 50,
            leg_speed_kmh: 18.0,
            request_deadline: Duration::from_secs(30),
            segment_url_base: "https://www.strava.com/segments".to_string(),
            cache_capacity: 100,
            cache_ttl: Duration::from_secs(5 * 60),
            cache_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            solver_budget: env_parse("TRIP_SOLVER_BUDGET_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.solver_budget),
            max_two_opt_passes: env_parse("TRIP_TWO_OPT_PASSES")
                .unwrap_or(defaults.max_two_opt_passes),
            leg_speed_kmh: env_parse::<f64>("TRIP_LEG_SPEED_KMH")
                .filter(|speed| speed.is_finite() && *speed > 0.0)
                .unwrap_or(defaults.leg_speed_kmh),
            request_deadline: env_parse("TRIP_REQUEST_DEADLINE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_deadline),
            segment_url_base: env::var("TRIP_SEGMENT_URL_BASE")
                .unwrap_or(defaults.segment_url_base),
            cache_capacity: env_parse::<usize>("TRIP_CACHE_CAPACITY")
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.cache_capacity),
            cache_ttl: env_parse("TRIP_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            cache_sweep_interval: env_parse("TRIP_CACHE_SWEEP_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_sweep_interval),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
