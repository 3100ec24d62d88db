//! Voyage state and the partial updates merged into it.
//!
//! The host loop owns one `VoyageState` per session. Workers and the
//! scheduler receive a copy and hand back a `StateUpdate`; `apply` is the
//! only way state changes, and it bumps `version` every time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    BunkerAnalysis, BunkerPlanOutcome, BunkerPort, ComplianceData, PlannedOrder, PortPrices,
    RobTracking, RouteData, SessionId, Stage, StageError, StageStatus, StateError, TimelinePoint,
    VoyageRequest, WeatherConsumption, WeatherSample,
};

/// Every field a stage can produce. Prerequisites and declared outputs are
/// expressed in these terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Route,
    RouteWaypoints,
    VesselTimeline,
    Compliance,
    WeatherForecast,
    WeatherConsumption,
    BunkerPorts,
    PortPrices,
    BunkerAnalysis,
    MultiBunkerPlan,
    RobTracking,
}

impl StateField {
    pub const ALL: [StateField; 11] = [
        StateField::Route,
        StateField::RouteWaypoints,
        StateField::VesselTimeline,
        StateField::Compliance,
        StateField::WeatherForecast,
        StateField::WeatherConsumption,
        StateField::BunkerPorts,
        StateField::PortPrices,
        StateField::BunkerAnalysis,
        StateField::MultiBunkerPlan,
        StateField::RobTracking,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StateField::Route => "route",
            StateField::RouteWaypoints => "route.waypoints",
            StateField::VesselTimeline => "vessel_timeline",
            StateField::Compliance => "compliance",
            StateField::WeatherForecast => "weather_forecast",
            StateField::WeatherConsumption => "weather_consumption",
            StateField::BunkerPorts => "bunker_ports",
            StateField::PortPrices => "port_prices",
            StateField::BunkerAnalysis => "bunker_analysis",
            StateField::MultiBunkerPlan => "multi_bunker_plan",
            StateField::RobTracking => "rob_tracking",
        }
    }
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Stage {
    /// The output whose presence means the stage did its job.
    pub fn primary_output(self) -> StateField {
        match self {
            Stage::Route => StateField::Route,
            Stage::Compliance => StateField::Compliance,
            Stage::Weather => StateField::WeatherForecast,
            Stage::Bunker => StateField::BunkerAnalysis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageState {
    pub version: u64,
    pub session_id: SessionId,
    pub request: VoyageRequest,

    pub route: Option<RouteData>,
    pub vessel_timeline: Option<Vec<TimelinePoint>>,
    pub compliance: Option<ComplianceData>,
    pub weather_forecast: Option<Vec<WeatherSample>>,
    pub weather_consumption: Option<WeatherConsumption>,
    pub bunker_ports: Option<Vec<BunkerPort>>,
    pub port_prices: Option<PortPrices>,
    pub bunker_analysis: Option<BunkerAnalysis>,
    pub multi_bunker_plan: Option<BunkerPlanOutcome>,
    pub rob_tracking: Option<RobTracking>,

    pub stage_status: BTreeMap<Stage, StageStatus>,
    /// Last recorded failure per stage.
    pub stage_errors: BTreeMap<Stage, StageError>,
    pub attempt_counts: BTreeMap<Stage, u32>,
    /// Per-output outcome, so a stage can succeed on one output and fail another.
    pub output_status: BTreeMap<StateField, StageStatus>,
    /// Worker invocations so far in this session.
    pub invocations: u32,
    pub planned_order: Option<PlannedOrder>,
    pub notices: Vec<String>,
}

impl VoyageState {
    pub fn new(request: VoyageRequest) -> Self {
        Self::with_session(SessionId::new(), request)
    }

    pub fn with_session(session_id: SessionId, request: VoyageRequest) -> Self {
        Self {
            version: 0,
            session_id,
            request,
            route: None,
            vessel_timeline: None,
            compliance: None,
            weather_forecast: None,
            weather_consumption: None,
            bunker_ports: None,
            port_prices: None,
            bunker_analysis: None,
            multi_bunker_plan: None,
            rob_tracking: None,
            stage_status: BTreeMap::new(),
            stage_errors: BTreeMap::new(),
            attempt_counts: BTreeMap::new(),
            output_status: BTreeMap::new(),
            invocations: 0,
            planned_order: None,
            notices: Vec::new(),
        }
    }

    /// Whether `field` is present. Lists that feed later stages (timeline,
    /// forecast) only count when non-empty.
    pub fn has(&self, field: StateField) -> bool {
        match field {
            StateField::Route => self.route.is_some(),
            StateField::RouteWaypoints => self.route.as_ref().is_some_and(|r| !r.waypoints.is_empty()),
            StateField::VesselTimeline => self.vessel_timeline.as_ref().is_some_and(|t| !t.is_empty()),
            StateField::Compliance => self.compliance.is_some(),
            StateField::WeatherForecast => self.weather_forecast.as_ref().is_some_and(|f| !f.is_empty()),
            StateField::WeatherConsumption => self.weather_consumption.is_some(),
            StateField::BunkerPorts => self.bunker_ports.is_some(),
            StateField::PortPrices => self.port_prices.is_some(),
            StateField::BunkerAnalysis => self.bunker_analysis.is_some(),
            StateField::MultiBunkerPlan => self.multi_bunker_plan.is_some(),
            StateField::RobTracking => self.rob_tracking.is_some(),
        }
    }

    pub fn status(&self, stage: Stage) -> StageStatus {
        self.stage_status.get(&stage).copied().unwrap_or_default()
    }

    pub fn is_failed(&self, stage: Stage) -> bool {
        self.status(stage) == StageStatus::Failed
    }

    pub fn attempts(&self, stage: Stage) -> u32 {
        self.attempt_counts.get(&stage).copied().unwrap_or(0)
    }

    /// True once any stage has produced a user-facing result.
    pub fn has_any_output(&self) -> bool {
        [
            StateField::Route,
            StateField::WeatherForecast,
            StateField::WeatherConsumption,
            StateField::BunkerAnalysis,
        ]
        .into_iter()
        .any(|field| self.has(field))
    }

    pub fn record_invocation(&mut self) {
        self.invocations = self.invocations.saturating_add(1);
    }

    /// Merges `update`. Either the whole update applies or none of it does.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), StateError> {
        self.check(&update)?;

        if let Some(route) = update.route {
            self.route = Some(route);
        }
        set_if_some(&mut self.vessel_timeline, update.vessel_timeline);
        set_if_some(&mut self.compliance, update.compliance);
        set_if_some(&mut self.weather_forecast, update.weather_forecast);
        set_if_some(&mut self.weather_consumption, update.weather_consumption);
        set_if_some(&mut self.bunker_ports, update.bunker_ports);
        set_if_some(&mut self.port_prices, update.port_prices);
        set_if_some(&mut self.bunker_analysis, update.bunker_analysis);
        set_if_some(&mut self.multi_bunker_plan, update.multi_bunker_plan);
        set_if_some(&mut self.rob_tracking, update.rob_tracking);
        set_if_some(&mut self.planned_order, update.planned_order);

        self.stage_status.extend(update.stage_status);
        self.stage_errors.extend(update.stage_errors);
        self.output_status.extend(update.output_status);
        for (stage, count) in update.attempt_counts {
            let entry = self.attempt_counts.entry(stage).or_insert(0);
            *entry = (*entry).max(count);
        }
        for notice in update.notices {
            if !self.notices.contains(&notice) {
                self.notices.push(notice);
            }
        }
        self.version += 1;
        Ok(())
    }

    fn check(&self, update: &StateUpdate) -> Result<(), StateError> {
        if let Some(base) = update.base_version {
            if base != self.version {
                return Err(StateError::StaleUpdate {
                    update: base,
                    current: self.version,
                });
            }
        }
        if let (Some(existing), Some(proposed)) = (&self.route, &update.route) {
            if existing != proposed {
                return Err(StateError::RouteReassigned {
                    existing: format!("{}->{}", existing.origin, existing.destination),
                    proposed: format!("{}->{}", proposed.origin, proposed.destination),
                });
            }
        }
        for (stage, status) in &update.stage_status {
            let output = stage.primary_output();
            if *status == StageStatus::Success && !self.has(output) && !update.provides(output) {
                return Err(StateError::EmptySuccess(*stage));
            }
        }
        Ok(())
    }
}

fn set_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Partial update returned by a worker or the scheduler. Absent fields leave
/// the state untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// State version the update was computed from; checked on apply when set.
    pub base_version: Option<u64>,

    pub route: Option<RouteData>,
    pub vessel_timeline: Option<Vec<TimelinePoint>>,
    pub compliance: Option<ComplianceData>,
    pub weather_forecast: Option<Vec<WeatherSample>>,
    pub weather_consumption: Option<WeatherConsumption>,
    pub bunker_ports: Option<Vec<BunkerPort>>,
    pub port_prices: Option<PortPrices>,
    pub bunker_analysis: Option<BunkerAnalysis>,
    pub multi_bunker_plan: Option<BunkerPlanOutcome>,
    pub rob_tracking: Option<RobTracking>,
    pub planned_order: Option<PlannedOrder>,

    pub stage_status: BTreeMap<Stage, StageStatus>,
    pub stage_errors: BTreeMap<Stage, StageError>,
    /// Counters never decrease on merge.
    pub attempt_counts: BTreeMap<Stage, u32>,
    pub output_status: BTreeMap<StateField, StageStatus>,
    pub notices: Vec<String>,
}

impl StateUpdate {
    pub fn based_on(state: &VoyageState) -> Self {
        Self {
            base_version: Some(state.version),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether this update carries `field`.
    pub fn provides(&self, field: StateField) -> bool {
        match field {
            StateField::Route => self.route.is_some(),
            StateField::RouteWaypoints => self.route.as_ref().is_some_and(|r| !r.waypoints.is_empty()),
            StateField::VesselTimeline => self.vessel_timeline.as_ref().is_some_and(|t| !t.is_empty()),
            StateField::Compliance => self.compliance.is_some(),
            StateField::WeatherForecast => self.weather_forecast.as_ref().is_some_and(|f| !f.is_empty()),
            StateField::WeatherConsumption => self.weather_consumption.is_some(),
            StateField::BunkerPorts => self.bunker_ports.is_some(),
            StateField::PortPrices => self.port_prices.is_some(),
            StateField::BunkerAnalysis => self.bunker_analysis.is_some(),
            StateField::MultiBunkerPlan => self.multi_bunker_plan.is_some(),
            StateField::RobTracking => self.rob_tracking.is_some(),
        }
    }

    pub fn status(&mut self, stage: Stage, status: StageStatus) -> &mut Self {
        self.stage_status.insert(stage, status);
        self
    }

    pub fn output(&mut self, field: StateField, status: StageStatus) -> &mut Self {
        self.output_status.insert(field, status);
        self
    }

    pub fn error(&mut self, stage: Stage, error: StageError) -> &mut Self {
        self.stage_errors.insert(stage, error);
        self
    }

    pub fn notice(&mut self, notice: impl Into<String>) -> &mut Self {
        self.notices.push(notice.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_state, sgsin_aefjr_route};
    use crate::{FailureKind, PortCode};

    #[test]
    fn test_apply_bumps_version_and_sets_fields() {
        let mut state = base_state();
        let mut update = StateUpdate::based_on(&state);
        update.route = Some(sgsin_aefjr_route());
        update.status(Stage::Route, StageStatus::Success);
        state.apply(update).unwrap();
        assert_eq!(state.version, 1);
        assert!(state.has(StateField::Route));
        assert!(state.has(StateField::RouteWaypoints));
        assert_eq!(state.status(Stage::Route), StageStatus::Success);
    }

    #[test]
    fn test_route_is_write_once() {
        let mut state = base_state();
        let mut first = StateUpdate::default();
        first.route = Some(sgsin_aefjr_route());
        state.apply(first.clone()).unwrap();
        // Re-applying the identical route is harmless.
        state.apply(first).unwrap();

        let mut other = sgsin_aefjr_route();
        other.destination = PortCode::new("NLRTM");
        let update = StateUpdate {
            route: Some(other),
            ..StateUpdate::default()
        };
        let err = state.apply(update).unwrap_err();
        assert!(matches!(err, StateError::RouteReassigned { .. }));
        assert_eq!(state.route.as_ref().unwrap().destination, PortCode::new("AEFJR"));
        assert_eq!(state.version, 2);
    }

    #[test]
    fn test_stale_update_is_rejected_without_side_effects() {
        let mut state = base_state();
        let stale = StateUpdate::based_on(&state);
        state.apply(StateUpdate::default()).unwrap();
        let mut stale = stale;
        stale.notice("late");
        assert!(matches!(state.apply(stale), Err(StateError::StaleUpdate { update: 0, current: 1 })));
        assert!(state.notices.is_empty());
    }

    #[test]
    fn test_success_without_output_is_inconsistent() {
        let mut state = base_state();
        let mut update = StateUpdate::default();
        update.status(Stage::Weather, StageStatus::Success);
        assert_eq!(state.apply(update), Err(StateError::EmptySuccess(Stage::Weather)));
    }

    #[test]
    fn test_attempt_counts_never_decrease() {
        let mut state = base_state();
        state.attempt_counts.insert(Stage::Route, 2);
        let update = StateUpdate {
            attempt_counts: BTreeMap::from([(Stage::Route, 1), (Stage::Bunker, 1)]),
            ..StateUpdate::default()
        };
        state.apply(update).unwrap();
        assert_eq!(state.attempts(Stage::Route), 2);
        assert_eq!(state.attempts(Stage::Bunker), 1);
    }

    #[test]
    fn test_empty_timeline_does_not_count_as_present() {
        let mut state = base_state();
        state.vessel_timeline = Some(Vec::new());
        assert!(!state.has(StateField::VesselTimeline));
        assert!(!state.has_any_output());
    }

    #[test]
    fn test_errors_and_notices_merge() {
        let mut state = base_state();
        let mut update = StateUpdate::default();
        update
            .error(Stage::Weather, StageError::new("timed out", FailureKind::Transient))
            .notice("weather retried")
            .notice("weather retried");
        state.apply(update).unwrap();
        assert_eq!(state.stage_errors[&Stage::Weather].message, "timed out");
        assert_eq!(state.notices, vec!["weather retried".to_string()]);
    }
}
