//! Final synthesis from whatever the session produced.
//!
//! A report is always produced. Missing analyses are listed with the reason
//! they are missing; infeasible plans and unsafe voyages become warnings.

use serde::{Deserialize, Serialize};
use voyage_core::{
    BunkerPlan, BunkerRecommendation, FuelQuantities, FuelRequirement, LedgerWarning, PortCode,
    RouteClass, SessionId, Stage, StageStatus, StateField, VoyageState, ZoneName,
};

use crate::{FinalizeReason, Supervisor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_nm: f64,
    pub estimated_hours: f64,
    pub waypoint_count: usize,
    pub route_class: RouteClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    pub zones_crossed: Vec<ZoneName>,
    pub eca_distance_nm: f64,
    pub required_lsmgo_mt: f64,
    pub fuel_switches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub samples: usize,
    pub max_wave_height_m: f64,
    pub increase_percent: Option<f64>,
    pub additional_fuel_mt: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerSummary {
    pub requirement: FuelRequirement,
    pub candidate_ports: usize,
    pub best_single_stop: Option<BunkerRecommendation>,
    pub multi_stop_required: bool,
    pub best_multi_stop: Option<BunkerPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobSummary {
    pub safe_without_bunker: bool,
    pub safe_with_bunker: Option<bool>,
    pub bunker_port: Option<PortCode>,
    pub final_rob: FuelQuantities,
    pub minimum_rob: FuelQuantities,
    pub minimum_rob_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingAnalysis {
    pub stage: Stage,
    pub missing_outputs: Vec<StateField>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageReport {
    pub session_id: SessionId,
    pub origin: PortCode,
    pub destination: PortCode,
    pub finalize_reason: FinalizeReason,
    pub summary: String,
    pub route: Option<RouteSummary>,
    pub compliance: Option<ComplianceSummary>,
    pub weather: Option<WeatherSummary>,
    pub bunker: Option<BunkerSummary>,
    pub rob: Option<RobSummary>,
    pub missing: Vec<MissingAnalysis>,
    pub warnings: Vec<String>,
    pub notices: Vec<String>,
    pub invocations: u32,
}

impl VoyageReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

fn missing_reason(state: &VoyageState, stage: Stage) -> String {
    match (state.status(stage), state.stage_errors.get(&stage)) {
        (StageStatus::Failed, Some(error)) => format!("failed: {}", error.message),
        (StageStatus::Failed, None) => "failed".to_string(),
        (_, Some(error)) => format!("incomplete, last error: {}", error.message),
        (_, None) if state.attempts(stage) == 0 => "not attempted".to_string(),
        (_, None) => "incomplete".to_string(),
    }
}

fn missing_analyses(supervisor: &Supervisor, state: &VoyageState) -> Vec<MissingAnalysis> {
    Supervisor::goal_stages(state.request.intent)
        .into_iter()
        .filter(|stage| !supervisor.is_complete(*stage, state))
        .map(|stage| MissingAnalysis {
            stage,
            missing_outputs: supervisor
                .registry()
                .required_outputs(stage, state.request.intent)
                .into_iter()
                .filter(|field| !state.has(*field))
                .collect(),
            reason: missing_reason(state, stage),
        })
        .collect()
}

fn ledger_warning_text(warning: &LedgerWarning) -> String {
    match warning {
        LedgerWarning::BunkerClamped {
            fuel,
            requested_mt,
            accepted_mt,
        } => format!("{fuel} bunker of {requested_mt:.1} MT limited to {accepted_mt:.1} MT by tank capacity"),
        LedgerWarning::NegativeRob { at, fuel, rob_mt } => {
            format!("{fuel} runs out before {at} ({rob_mt:.1} MT)")
        }
        LedgerWarning::MarginBelowThreshold { at, fuel, days } => {
            format!("{fuel} reserve at {at} is {days:.1} days")
        }
    }
}

fn warnings(state: &VoyageState) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(tracking) = &state.rob_tracking {
        let effective = tracking.effective();
        if !effective.overall_safe {
            let context = match &tracking.bunker_port {
                Some(port) => format!("even after bunkering at {port}"),
                None => "without bunkering".to_string(),
            };
            warnings.push(format!("voyage is unsafe {context}"));
            warnings.extend(effective.warnings.iter().map(ledger_warning_text));
        }
    }
    if let Some(outcome) = &state.multi_bunker_plan {
        if outcome.required {
            if let Some(error) = &outcome.error {
                warnings.push(format!("no feasible multi-stop bunker plan: {error}"));
            }
        }
    }
    if let Some(analysis) = &state.bunker_analysis {
        if analysis.requirement.has_shortfall() && analysis.best_covering().is_none() {
            warnings.push("no single reachable port covers the fuel shortfall".to_string());
        }
    }
    warnings
}

fn summary_line(state: &VoyageState, reason: FinalizeReason, missing: &[MissingAnalysis]) -> String {
    let request = &state.request;
    let mut line = format!("{} to {}", request.origin, request.destination);
    if let Some(route) = &state.route {
        line.push_str(&format!(
            ": {:.0} nm, {:.1} days",
            route.distance_nm,
            route.estimated_days()
        ));
    }
    if let Some(best) = state.bunker_analysis.as_ref().and_then(|a| a.best_covering()) {
        line.push_str(&format!(
            "; bunker {:.0} MT at {} for ${:.0}",
            best.quantities.total(),
            best.port_name,
            best.total_cost_usd
        ));
    }
    line.push_str(&format!("; {}", reason.describe()));
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|m| m.stage.name()).collect();
        line.push_str(&format!(" (missing: {})", names.join(", ")));
    }
    line
}

/// Builds the final report for `state`.
pub fn synthesize(supervisor: &Supervisor, state: &VoyageState, reason: FinalizeReason) -> VoyageReport {
    let missing = missing_analyses(supervisor, state);
    VoyageReport {
        session_id: state.session_id,
        origin: state.request.origin.clone(),
        destination: state.request.destination.clone(),
        finalize_reason: reason,
        summary: summary_line(state, reason, &missing),
        route: state.route.as_ref().map(|r| RouteSummary {
            distance_nm: r.distance_nm,
            estimated_hours: r.estimated_hours,
            waypoint_count: r.waypoints.len(),
            route_class: r.route_class,
        }),
        compliance: state.compliance.as_ref().map(|c| ComplianceSummary {
            zones_crossed: c.zones_crossed.clone(),
            eca_distance_nm: c.total_eca_distance_nm,
            required_lsmgo_mt: c.required_lsmgo_mt,
            fuel_switches: c.switching_points.len(),
        }),
        weather: state.weather_forecast.as_ref().map(|samples| WeatherSummary {
            samples: samples.len(),
            max_wave_height_m: samples
                .iter()
                .map(|s| s.conditions.wave_height_m)
                .fold(0.0, f64::max),
            increase_percent: state.weather_consumption.map(|w| w.increase_percent),
            additional_fuel_mt: state.weather_consumption.map(|w| w.additional_fuel_mt),
        }),
        bunker: state.bunker_analysis.as_ref().map(|analysis| BunkerSummary {
            requirement: analysis.requirement,
            candidate_ports: state.bunker_ports.as_ref().map_or(0, Vec::len),
            best_single_stop: analysis.best().cloned(),
            multi_stop_required: state.multi_bunker_plan.as_ref().is_some_and(|m| m.required),
            best_multi_stop: state
                .multi_bunker_plan
                .as_ref()
                .and_then(|m| m.best_plan.clone()),
        }),
        rob: state.rob_tracking.as_ref().map(|tracking| {
            let effective = tracking.effective();
            RobSummary {
                safe_without_bunker: tracking.without_bunker.overall_safe,
                safe_with_bunker: tracking.with_bunker.as_ref().map(|r| r.overall_safe),
                bunker_port: tracking.bunker_port.clone(),
                final_rob: effective.final_rob,
                minimum_rob: effective.minimum_rob,
                minimum_rob_location: effective.minimum_rob_location.clone(),
            }
        }),
        missing,
        warnings: warnings(state),
        notices: state.notices.clone(),
        invocations: state.invocations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentRegistry;
    use voyage_core::test_fixtures::{base_state, sgsin_aefjr_route};
    use voyage_core::{FailureKind, Policy, StageError, TimelinePoint};

    fn supervisor() -> Supervisor {
        Supervisor::new(AgentRegistry::default(), Policy::default())
    }

    #[test]
    fn test_empty_state_still_reports_every_missing_analysis() {
        let report = synthesize(&supervisor(), &base_state(), FinalizeReason::NoProgress);
        assert_eq!(report.missing.len(), 4);
        assert!(report.missing.iter().all(|m| m.reason == "not attempted"));
        assert!(report.summary.contains("SGSIN to AEFJR"));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_failed_stage_reason_carries_error_message() {
        let mut state = base_state();
        let route = sgsin_aefjr_route();
        state.vessel_timeline = Some(vec![TimelinePoint {
            position: route.waypoints[0],
            timestamp: state.request.departure,
            distance_from_origin_nm: 0.0,
        }]);
        state.route = Some(route);
        state.stage_status.insert(Stage::Weather, StageStatus::Failed);
        state.stage_errors.insert(
            Stage::Weather,
            StageError::new("weather service timed out after 30000 ms", FailureKind::Transient),
        );
        let report = synthesize(&supervisor(), &state, FinalizeReason::Partial);

        let weather = report
            .missing
            .iter()
            .find(|m| m.stage == Stage::Weather)
            .expect("weather should be listed as missing");
        assert!(weather.reason.contains("timed out"));
        assert!(weather.missing_outputs.contains(&StateField::WeatherForecast));
        assert!(report.route.is_some());
        assert!(report.missing.iter().all(|m| m.stage != Stage::Route));
        assert!(report.summary.contains("3000 nm"));
    }
}
