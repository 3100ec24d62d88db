use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use voyage_core::{VesselName, VoyageRequest};
use voyage_world::build_request;

/// A batch of voyage requests run concurrently against one content set.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Departure for requests that do not name their own.
    #[serde(default)]
    pub departure: Option<DateTime<Utc>>,
    pub requests: Vec<ScenarioRequest>,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioRequest {
    pub origin: String,
    pub destination: String,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default)]
    pub vessel: Option<String>,
    #[serde(default)]
    pub speed_knots: Option<f64>,
    #[serde(default)]
    pub departure: Option<DateTime<Utc>>,
}

fn default_content_dir() -> String {
    "./content".to_string()
}

fn default_query() -> String {
    "full voyage plan with bunkering".to_string()
}

impl Scenario {
    pub fn voyage_requests(&self, now: DateTime<Utc>) -> Vec<VoyageRequest> {
        self.requests
            .iter()
            .map(|r| {
                let departure = r.departure.or(self.departure).unwrap_or(now);
                let mut request = build_request(&r.origin, &r.destination, &r.query, departure);
                request.vessel = r.vessel.as_deref().map(VesselName::new);
                request.speed_knots = r.speed_knots;
                request
            })
            .collect()
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if scenario.requests.is_empty() {
        bail!("scenario 'requests' must contain at least one request");
    }
    for (index, request) in scenario.requests.iter().enumerate() {
        if request.origin.trim().is_empty() || request.destination.trim().is_empty() {
            bail!("scenario request {index}: origin and destination are required");
        }
        if request.speed_knots.is_some_and(|s| s <= 0.0) {
            bail!("scenario request {index}: speed_knots must be > 0");
        }
    }
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_scenario(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_scenario_with_defaults() {
        let file = write_temp_scenario(
            r#"{
            "name": "gulf_run",
            "requests": [{"origin": "sgsin", "destination": "aefjr"}]
        }"#,
        );
        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.name, "gulf_run");
        assert_eq!(scenario.content_dir, "./content");
        assert!(scenario.overrides.is_empty());

        let now = Utc::now();
        let requests = scenario.voyage_requests(now);
        assert_eq!(requests[0].origin.as_str(), "SGSIN");
        assert_eq!(requests[0].departure, now);
        assert!(requests[0].intent.needs_bunker);
    }

    #[test]
    fn test_request_departure_overrides_scenario_departure() {
        let file = write_temp_scenario(
            r#"{
            "name": "dated",
            "departure": "2026-11-01T00:00:00Z",
            "requests": [
                {"origin": "SGSIN", "destination": "NLRTM", "vessel": "MV Coral Feeder"},
                {"origin": "SGSIN", "destination": "HKHKG", "query": "distance only",
                 "departure": "2026-12-01T06:00:00Z", "speed_knots": 12.5}
            ]
        }"#,
        );
        let scenario = load_scenario(file.path()).unwrap();
        let requests = scenario.voyage_requests(Utc::now());
        assert_eq!(requests[0].departure.to_rfc3339(), "2026-11-01T00:00:00+00:00");
        assert_eq!(requests[0].vessel.as_ref().map(VesselName::as_str), Some("MV Coral Feeder"));
        assert_eq!(requests[1].departure.to_rfc3339(), "2026-12-01T06:00:00+00:00");
        assert_eq!(requests[1].speed_knots, Some(12.5));
        assert!(!requests[1].intent.needs_bunker);
    }

    #[test]
    fn test_shipped_scenario_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/fleet_week.json");
        let scenario = load_scenario(&path).unwrap();
        let mut policy = voyage_core::Policy::default();
        crate::overrides::apply_overrides(&mut policy, &scenario.overrides).unwrap();
        assert_eq!(scenario.voyage_requests(Utc::now()).len(), scenario.requests.len());
    }

    #[test]
    fn test_empty_requests_rejected() {
        let file = write_temp_scenario(r#"{"name": "empty", "requests": []}"#);
        let err = load_scenario(file.path()).unwrap_err();
        assert!(err.to_string().contains("at least one request"));
    }

    #[test]
    fn test_non_positive_speed_rejected() {
        let file = write_temp_scenario(
            r#"{"name": "stopped", "requests": [
                {"origin": "SGSIN", "destination": "AEFJR", "speed_knots": 0}
            ]}"#,
        );
        assert!(load_scenario(file.path()).is_err());
    }

    #[test]
    fn test_malformed_scenario_names_file() {
        let file = write_temp_scenario("{ not json");
        let err = load_scenario(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing scenario file"));
    }
}
