use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use voyage_core::Policy;

const VALID_KEYS: &[&str] = &[
    "safety_margin_days",
    "max_stage_attempts",
    "stuck_stage_attempts",
    "max_invocations",
    "progress_check_after",
    "timeline_interval_hours",
    "eca_fuel_margin",
    "bunker_max_stops",
    "bunker_candidate_limit",
    "port_search_radius_nm",
    "default_speed_knots",
    "timeouts.route_ms",
    "timeouts.weather_ms",
    "timeouts.ports_ms",
    "timeouts.prices_ms",
    "timeouts.planner_ms",
];

pub fn apply_overrides(policy: &mut Policy, overrides: &HashMap<String, serde_json::Value>) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "safety_margin_days" => policy.safety_margin_days = as_f64(key, value)?,
            "max_stage_attempts" => policy.max_stage_attempts = as_u32(key, value)?,
            "stuck_stage_attempts" => policy.stuck_stage_attempts = as_u32(key, value)?,
            "max_invocations" => policy.max_invocations = as_u32(key, value)?,
            "progress_check_after" => policy.progress_check_after = as_u32(key, value)?,
            "timeline_interval_hours" => policy.timeline_interval_hours = as_f64(key, value)?,
            "eca_fuel_margin" => policy.eca_fuel_margin = as_f64(key, value)?,
            "bunker_max_stops" => policy.bunker_max_stops = as_usize(key, value)?,
            "bunker_candidate_limit" => policy.bunker_candidate_limit = as_usize(key, value)?,
            "port_search_radius_nm" => policy.port_search_radius_nm = as_f64(key, value)?,
            "default_speed_knots" => policy.default_speed_knots = as_f64(key, value)?,
            "timeouts.route_ms" => policy.timeouts.route_ms = as_u64(key, value)?,
            "timeouts.weather_ms" => policy.timeouts.weather_ms = as_u64(key, value)?,
            "timeouts.ports_ms" => policy.timeouts.ports_ms = as_u64(key, value)?,
            "timeouts.prices_ms" => policy.timeouts.prices_ms = as_u64(key, value)?,
            "timeouts.planner_ms" => policy.timeouts.planner_ms = as_u64(key, value)?,
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        }
    }
    check_policy(policy)
}

/// Rejects values the scheduler cannot run with.
fn check_policy(policy: &Policy) -> Result<()> {
    if policy.safety_margin_days < 0.0 {
        bail!("safety_margin_days must be >= 0");
    }
    if policy.max_stage_attempts == 0 || policy.max_invocations == 0 {
        bail!("max_stage_attempts and max_invocations must be > 0");
    }
    if policy.timeline_interval_hours <= 0.0 {
        bail!("timeline_interval_hours must be > 0");
    }
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow!("override '{key}': expected a number, got {value}"))
}

fn as_u64(key: &str, value: &serde_json::Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| anyhow!("override '{key}': expected a positive integer, got {value}"))
}

fn as_u32(key: &str, value: &serde_json::Value) -> Result<u32> {
    let val = as_u64(key, value)?;
    u32::try_from(val).map_err(|_| anyhow!("override '{key}': value {val} exceeds u32 range"))
}

fn as_usize(key: &str, value: &serde_json::Value) -> Result<usize> {
    let val = as_u64(key, value)?;
    usize::try_from(val).map_err(|_| anyhow!("override '{key}': value {val} exceeds usize range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_float_override() {
        let mut policy = Policy::default();
        let overrides = HashMap::from([("safety_margin_days".to_string(), json!(5.0))]);
        apply_overrides(&mut policy, &overrides).unwrap();
        assert!((policy.safety_margin_days - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_timeout_override() {
        let mut policy = Policy::default();
        let overrides = HashMap::from([("timeouts.weather_ms".to_string(), json!(250))]);
        apply_overrides(&mut policy, &overrides).unwrap();
        assert_eq!(policy.timeouts.weather_ms, 250);
        assert_eq!(policy.timeouts.route_ms, Policy::default().timeouts.route_ms);
    }

    #[test]
    fn test_unknown_key_errors() {
        let mut policy = Policy::default();
        let overrides = HashMap::from([("max_retries".to_string(), json!(3))]);
        let err = apply_overrides(&mut policy, &overrides).unwrap_err();
        assert!(err.to_string().contains("unknown override key"));
        assert!(err.to_string().contains("max_stage_attempts"));
    }

    #[test]
    fn test_wrong_type_errors() {
        let mut policy = Policy::default();
        let overrides = HashMap::from([("max_stage_attempts".to_string(), json!(2.5))]);
        let err = apply_overrides(&mut policy, &overrides).unwrap_err();
        assert!(err.to_string().contains("expected a positive integer"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut policy = Policy::default();
        let overrides = HashMap::from([("max_stage_attempts".to_string(), json!(0))]);
        assert!(apply_overrides(&mut policy, &overrides).is_err());
    }
}
