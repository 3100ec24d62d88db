//! Tunable planning policy. Every field has a default so a partial
//! `policy.json` is valid.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Minimum days of fuel that must remain at every waypoint.
    pub safety_margin_days: f64,
    /// Circuit-breaker cap on routed attempts per stage.
    pub max_stage_attempts: u32,
    /// Attempts after which a stage still missing its outputs is declared stuck.
    pub stuck_stage_attempts: u32,
    /// Absolute ceiling on worker invocations in one session.
    pub max_invocations: u32,
    /// Invocations after which a session with no outputs at all is abandoned.
    pub progress_check_after: u32,
    pub timeline_interval_hours: f64,
    /// Extra fraction of LSMGO carried over the computed ECA requirement.
    pub eca_fuel_margin: f64,
    pub bunker_max_stops: usize,
    /// Candidate ports considered when enumerating multi-stop sequences.
    pub bunker_candidate_limit: usize,
    pub port_search_radius_nm: f64,
    pub default_speed_knots: f64,
    pub timeouts: TimeoutPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            safety_margin_days: 3.0,
            max_stage_attempts: 3,
            stuck_stage_attempts: 3,
            max_invocations: 60,
            progress_check_after: 40,
            timeline_interval_hours: 12.0,
            eca_fuel_margin: 0.10,
            bunker_max_stops: 3,
            bunker_candidate_limit: 8,
            port_search_radius_nm: 150.0,
            default_speed_knots: 14.0,
            timeouts: TimeoutPolicy::default(),
        }
    }
}

/// Per-collaborator call budgets in milliseconds, one per latency class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    pub route_ms: u64,
    pub weather_ms: u64,
    pub ports_ms: u64,
    pub prices_ms: u64,
    pub planner_ms: u64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            route_ms: 10_000,
            weather_ms: 30_000,
            ports_ms: 10_000,
            prices_ms: 10_000,
            planner_ms: 20_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_policy_json_uses_defaults() {
        let policy: Policy =
            serde_json::from_str(r#"{"safety_margin_days": 5.0, "timeouts": {"route_ms": 50}}"#)
                .unwrap();
        assert!((policy.safety_margin_days - 5.0).abs() < 1e-9);
        assert_eq!(policy.max_stage_attempts, 3);
        assert_eq!(policy.timeouts.route_ms, 50);
        assert_eq!(policy.timeouts.weather_ms, 30_000);
    }
}
