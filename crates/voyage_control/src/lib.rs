//! `voyage_control`: deciding which stage runs next.
//!
//! Pure with respect to IO: the supervisor reads a `VoyageState` and returns
//! a `Decision` carrying the next stage (or finalize) and the counter and
//! status changes to merge back.

mod prerequisites;
mod registry;
pub mod report;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voyage_core::{
    guard, FailureKind, Intent, Policy, Stage, StageError, StageStatus, StateUpdate, VoyageState,
};

pub use prerequisites::{is_eligible, unmet};
pub use registry::{AgentRegistry, AgentSpec};
pub use report::{synthesize, VoyageReport};

pub trait Scheduler {
    fn decide(&self, state: &VoyageState) -> Decision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "stage", rename_all = "snake_case")]
pub enum FinalizeReason {
    /// Every requested analysis is present.
    Complete,
    /// Nothing left to run; some requested stages failed.
    Partial,
    /// Some requested stage is neither done nor failed but cannot run.
    NothingEligible,
    IterationCeiling,
    NoProgress,
    StageStuck(Stage),
    CircuitOpen(Stage),
}

impl FinalizeReason {
    pub fn describe(self) -> String {
        match self {
            FinalizeReason::Complete => "all requested analyses completed".to_string(),
            FinalizeReason::Partial => "finished with some analyses unavailable".to_string(),
            FinalizeReason::NothingEligible => {
                "remaining analyses are blocked on missing inputs".to_string()
            }
            FinalizeReason::IterationCeiling => "stopped at the invocation ceiling".to_string(),
            FinalizeReason::NoProgress => "stopped after no stage produced any output".to_string(),
            FinalizeReason::StageStuck(stage) => format!("{stage} stage made no progress"),
            FinalizeReason::CircuitOpen(stage) => {
                format!("{stage} stage abandoned after repeated attempts")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Next {
    Run(Stage),
    Finalize(FinalizeReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub next: Next,
    pub update: StateUpdate,
    pub reasoning: String,
}

impl Decision {
    pub fn is_finalize(&self) -> bool {
        matches!(self.next, Next::Finalize(_))
    }

    fn finalize(reason: FinalizeReason, update: StateUpdate, reasoning: String) -> Self {
        Self {
            next: Next::Finalize(reason),
            update,
            reasoning,
        }
    }
}

/// Deterministic scheduler, in priority order:
/// 1. Hard invocation ceiling.
/// 2. Progress check: many invocations and no output at all.
/// 3. Stuck stages are marked failed; finalize if one is on the critical path.
/// 4. Planner order, when one was supplied and still has runnable stages.
/// 5. Fixed dependency order: route, compliance, weather, bunker.
/// 6. Circuit breaker on the chosen stage.
pub struct Supervisor {
    registry: AgentRegistry,
    policy: Policy,
}

impl Supervisor {
    pub fn new(registry: AgentRegistry, policy: Policy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Stages the request asks for, in dependency order.
    pub fn goal_stages(intent: Intent) -> Vec<Stage> {
        let mut stages = vec![Stage::Route, Stage::Compliance];
        if intent.needs_weather {
            stages.push(Stage::Weather);
        }
        if intent.needs_bunker {
            stages.push(Stage::Bunker);
        }
        stages
    }

    /// Whether the stage has produced every output this request needs from it.
    pub fn is_complete(&self, stage: Stage, state: &VoyageState) -> bool {
        self.registry
            .required_outputs(stage, state.request.intent)
            .iter()
            .all(|field| state.has(*field))
    }

    /// A stage whose loss leaves nothing useful to report.
    fn is_critical(stage: Stage, intent: Intent) -> bool {
        match stage {
            Stage::Route => true,
            Stage::Compliance => false,
            Stage::Weather => intent.needs_weather && !intent.needs_bunker,
            Stage::Bunker => intent.needs_bunker,
        }
    }

    fn ceiling(&self, state: &VoyageState) -> Option<(FinalizeReason, String)> {
        if state.invocations > self.policy.max_invocations {
            return Some((
                FinalizeReason::IterationCeiling,
                format!(
                    "{} invocations exceed the ceiling of {}",
                    state.invocations, self.policy.max_invocations
                ),
            ));
        }
        if state.invocations > self.policy.progress_check_after && !state.has_any_output() {
            return Some((
                FinalizeReason::NoProgress,
                format!(
                    "no route, weather or bunker output after {} invocations",
                    state.invocations
                ),
            ));
        }
        None
    }

    /// Marks stages attempted `stuck_stage_attempts` times without their
    /// outputs as failed. Returns the newly failed stages, or the first
    /// critical one.
    fn detect_stuck(&self, state: &VoyageState, update: &mut StateUpdate) -> Result<Vec<Stage>, Stage> {
        let mut stuck = Vec::new();
        for stage in Stage::ALL {
            let attempts = state.attempts(stage);
            if state.is_failed(stage)
                || attempts < self.policy.stuck_stage_attempts
                || self.is_complete(stage, state)
            {
                continue;
            }
            warn!(session = %state.session_id, stage = %stage, attempts, "stage stuck without output");
            let message = format!("no output after {attempts} attempts");
            update
                .status(stage, StageStatus::Failed)
                .error(stage, StageError::new(message.clone(), FailureKind::Permanent))
                .notice(format!("{stage} stage marked failed: {message}"));
            if Self::is_critical(stage, state.request.intent) {
                return Err(stage);
            }
            stuck.push(stage);
        }
        Ok(stuck)
    }

    fn runnable(&self, stage: Stage, view: &VoyageState) -> bool {
        !view.is_failed(stage)
            && !self.is_complete(stage, view)
            && is_eligible(&self.registry, stage, view)
    }

    fn from_plan(&self, view: &VoyageState) -> Option<Stage> {
        let order = view.planned_order.as_ref()?;
        order
            .stages
            .iter()
            .copied()
            .find(|stage| self.runnable(*stage, view))
    }

    fn fallback(&self, view: &VoyageState) -> Option<Stage> {
        Self::goal_stages(view.request.intent)
            .into_iter()
            .find(|stage| self.runnable(*stage, view))
    }

    fn exhausted(&self, view: &VoyageState) -> FinalizeReason {
        let goals = Self::goal_stages(view.request.intent);
        if goals.iter().all(|s| self.is_complete(*s, view)) {
            FinalizeReason::Complete
        } else if goals
            .iter()
            .all(|s| self.is_complete(*s, view) || view.is_failed(*s))
        {
            FinalizeReason::Partial
        } else {
            FinalizeReason::NothingEligible
        }
    }

    fn guarded(&self, stage: Stage, state: &VoyageState, mut update: StateUpdate, reasoning: String) -> Decision {
        let verdict = guard(&stage, &state.attempt_counts, self.policy.max_stage_attempts);
        if !verdict.proceed {
            let notice = format!("{stage} abandoned after {} attempts", verdict.attempts);
            warn!(session = %state.session_id, stage = %stage, attempts = verdict.attempts, "circuit open");
            update
                .status(stage, StageStatus::Failed)
                .error(stage, StageError::new(notice.clone(), FailureKind::Permanent))
                .notice(notice.clone());
            return Decision::finalize(FinalizeReason::CircuitOpen(stage), update, notice);
        }
        debug!(
            session = %state.session_id,
            stage = %stage,
            attempt = verdict.attempts,
            reasoning = %reasoning,
            "routing to stage"
        );
        update.attempt_counts = verdict.counts;
        Decision {
            next: Next::Run(stage),
            update,
            reasoning,
        }
    }
}

impl Scheduler for Supervisor {
    fn decide(&self, state: &VoyageState) -> Decision {
        let mut update = StateUpdate::based_on(state);

        if let Some((reason, reasoning)) = self.ceiling(state) {
            info!(session = %state.session_id, ?reason, "finalizing");
            update.notice(reasoning.clone());
            return Decision::finalize(reason, update, reasoning);
        }

        let newly_failed = match self.detect_stuck(state, &mut update) {
            Ok(stages) => stages,
            Err(stage) => {
                let reason = FinalizeReason::StageStuck(stage);
                info!(session = %state.session_id, ?reason, "finalizing");
                return Decision::finalize(reason, update, reason.describe());
            }
        };
        let view: Cow<'_, VoyageState> = if newly_failed.is_empty() {
            Cow::Borrowed(state)
        } else {
            let mut view = state.clone();
            for stage in newly_failed {
                view.stage_status.insert(stage, StageStatus::Failed);
            }
            Cow::Owned(view)
        };

        let chosen = self
            .from_plan(&view)
            .map(|stage| (stage, "next runnable stage in the planner's order".to_string()))
            .or_else(|| {
                self.fallback(&view)
                    .map(|stage| (stage, "next runnable stage in dependency order".to_string()))
            });
        match chosen {
            Some((stage, reasoning)) => self.guarded(stage, state, update, reasoning),
            None => {
                let reason = self.exhausted(&view);
                info!(session = %state.session_id, ?reason, "finalizing");
                Decision::finalize(reason, update, reason.describe())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::test_fixtures::{base_state, sgsin_aefjr_route};
    use voyage_core::{
        BunkerAnalysis, ComplianceData, FuelQuantities, FuelRequirement, PlannedOrder,
        RobReport, RobTracking, TimelinePoint, WeatherConsumption, WeatherSample,
    };

    fn supervisor() -> Supervisor {
        Supervisor::new(AgentRegistry::default(), Policy::default())
    }

    fn with_route(state: &mut VoyageState) {
        let route = sgsin_aefjr_route();
        state.vessel_timeline = Some(vec![TimelinePoint {
            position: route.waypoints[0],
            timestamp: state.request.departure,
            distance_from_origin_nm: 0.0,
        }]);
        state.route = Some(route);
        state.stage_status.insert(Stage::Route, StageStatus::Success);
    }

    fn with_compliance(state: &mut VoyageState) {
        state.compliance = Some(ComplianceData {
            zones_crossed: vec![],
            total_eca_distance_nm: 0.0,
            required_lsmgo_mt: 0.0,
            switching_points: vec![],
        });
    }

    fn with_weather(state: &mut VoyageState) {
        let route = sgsin_aefjr_route();
        state.weather_forecast = Some(vec![WeatherSample {
            position: route.waypoints[0],
            timestamp: state.request.departure,
            conditions: voyage_core::WeatherConditions {
                wave_height_m: 1.0,
                wind_speed_knots: 10.0,
                wind_direction_deg: 180.0,
            },
            confidence: voyage_core::ForecastConfidence::High,
        }]);
        state.weather_consumption = Some(WeatherConsumption {
            increase_percent: 5.0,
            additional_fuel_mt: 15.0,
        });
    }

    fn with_bunker(state: &mut VoyageState) {
        let report = RobReport {
            waypoints: vec![],
            final_rob: FuelQuantities::ZERO,
            minimum_rob: FuelQuantities::ZERO,
            minimum_rob_location: String::new(),
            overall_safe: true,
            warnings: vec![],
        };
        state.bunker_ports = Some(vec![]);
        state.port_prices = Some(voyage_core::PortPrices::default());
        state.bunker_analysis = Some(BunkerAnalysis {
            requirement: FuelRequirement {
                need: FuelQuantities::ZERO,
                reserve: FuelQuantities::ZERO,
                shortfall: FuelQuantities::ZERO,
            },
            recommendations: vec![],
        });
        state.rob_tracking = Some(RobTracking {
            without_bunker: report,
            with_bunker: None,
            bunker_port: None,
        });
    }

    #[test]
    fn test_fresh_state_routes_to_route_and_counts_attempt() {
        let decision = supervisor().decide(&base_state());
        assert_eq!(decision.next, Next::Run(Stage::Route));
        assert_eq!(decision.update.attempt_counts.get(&Stage::Route), Some(&1));
    }

    #[test]
    fn test_fallback_order_follows_dependencies() {
        let sup = supervisor();
        let mut state = base_state();
        with_route(&mut state);
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Compliance));
        with_compliance(&mut state);
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Weather));
        with_weather(&mut state);
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Bunker));
        with_bunker(&mut state);
        assert_eq!(
            sup.decide(&state).next,
            Next::Finalize(FinalizeReason::Complete)
        );
    }

    #[test]
    fn test_failed_stage_is_skipped_not_retried() {
        let sup = supervisor();
        let mut state = base_state();
        with_route(&mut state);
        state.stage_status.insert(Stage::Compliance, StageStatus::Failed);
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Weather));
    }

    #[test]
    fn test_iteration_ceiling_wins_over_everything() {
        let mut state = base_state();
        state.invocations = 61;
        let decision = supervisor().decide(&state);
        assert_eq!(decision.next, Next::Finalize(FinalizeReason::IterationCeiling));
        assert!(!decision.update.notices.is_empty());
    }

    #[test]
    fn test_progress_check_needs_no_output() {
        let sup = supervisor();
        let mut state = base_state();
        state.invocations = 41;
        assert_eq!(sup.decide(&state).next, Next::Finalize(FinalizeReason::NoProgress));

        with_route(&mut state);
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Compliance));
    }

    #[test]
    fn test_stuck_route_finalizes() {
        let mut state = base_state();
        state.attempt_counts.insert(Stage::Route, 3);
        let decision = supervisor().decide(&state);
        assert_eq!(decision.next, Next::Finalize(FinalizeReason::StageStuck(Stage::Route)));
        assert_eq!(decision.update.stage_status.get(&Stage::Route), Some(&StageStatus::Failed));
    }

    #[test]
    fn test_stuck_compliance_is_skipped() {
        let mut state = base_state();
        with_route(&mut state);
        state.attempt_counts.insert(Stage::Compliance, 3);
        let decision = supervisor().decide(&state);
        assert_eq!(decision.next, Next::Run(Stage::Weather));
        assert_eq!(
            decision.update.stage_status.get(&Stage::Compliance),
            Some(&StageStatus::Failed)
        );
    }

    #[test]
    fn test_stuck_weather_blocks_bunker_and_finalizes() {
        let mut state = base_state();
        with_route(&mut state);
        with_compliance(&mut state);
        state.attempt_counts.insert(Stage::Weather, 3);
        let decision = supervisor().decide(&state);
        assert_eq!(decision.next, Next::Finalize(FinalizeReason::NothingEligible));
        assert_eq!(
            decision.update.stage_status.get(&Stage::Weather),
            Some(&StageStatus::Failed)
        );
    }

    #[test]
    fn test_failed_weather_never_routes_to_bunker() {
        let mut state = base_state();
        assert_eq!(state.request.intent, Intent::FULL);
        with_route(&mut state);
        with_compliance(&mut state);
        state.stage_status.insert(Stage::Weather, StageStatus::Failed);
        state.stage_errors.insert(
            Stage::Weather,
            StageError::new("forecast service rejected the track", FailureKind::Permanent),
        );
        let decision = supervisor().decide(&state);
        assert_ne!(decision.next, Next::Run(Stage::Bunker));
        assert_eq!(decision.next, Next::Finalize(FinalizeReason::NothingEligible));
    }

    #[test]
    fn test_planner_order_is_preferred_then_falls_back() {
        let sup = supervisor();
        let mut state = base_state();
        with_route(&mut state);
        state.planned_order = Some(PlannedOrder::from_names(
            &["route_agent", "weather_agent", "bunker_agent"],
            "weather first",
        ));
        // Compliance is not in the plan, so weather comes next.
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Weather));

        with_weather(&mut state);
        with_bunker(&mut state);
        // Plan exhausted: the fixed order still picks up compliance.
        assert_eq!(sup.decide(&state).next, Next::Run(Stage::Compliance));
    }

    #[test]
    fn test_breaker_opens_when_stuck_threshold_is_higher() {
        let policy = Policy {
            stuck_stage_attempts: 10,
            ..Policy::default()
        };
        let sup = Supervisor::new(AgentRegistry::default(), policy);
        let mut state = base_state();
        state.attempt_counts.insert(Stage::Route, 3);
        let decision = sup.decide(&state);
        assert_eq!(decision.next, Next::Finalize(FinalizeReason::CircuitOpen(Stage::Route)));
        assert!(decision.update.notices[0].contains("abandoned after 3 attempts"));
    }

    #[test]
    fn test_route_only_intent_finishes_after_compliance() {
        let sup = supervisor();
        let mut state = base_state();
        state.request.intent = Intent::ROUTE_ONLY;
        with_route(&mut state);
        with_compliance(&mut state);
        assert_eq!(sup.decide(&state).next, Next::Finalize(FinalizeReason::Complete));
    }

    #[test]
    fn test_failed_goal_finalizes_partial() {
        let sup = supervisor();
        let mut state = base_state();
        with_route(&mut state);
        with_compliance(&mut state);
        with_weather(&mut state);
        state.stage_status.insert(Stage::Bunker, StageStatus::Failed);
        assert_eq!(sup.decide(&state).next, Next::Finalize(FinalizeReason::Partial));
    }
}
