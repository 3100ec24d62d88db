use async_trait::async_trait;
use tracing::info;
use voyage_core::{assess_compliance, Stage, StageStatus, StateField, StateUpdate, VoyageState};

use super::{give_up, StageWorker, WorkerContext};

/// ECA crossings and the LSMGO needed inside them.
pub struct ComplianceWorker;

#[async_trait]
impl StageWorker for ComplianceWorker {
    fn stage(&self) -> Stage {
        Stage::Compliance
    }

    async fn run(&self, snapshot: VoyageState, ctx: &WorkerContext) -> StateUpdate {
        let mut update = StateUpdate::based_on(&snapshot);
        let Some(route) = &snapshot.route else {
            give_up(&mut update, Stage::Compliance, "no route to assess".to_string());
            return update;
        };
        let Some(vessel) = ctx.vessel(&snapshot.request) else {
            give_up(&mut update, Stage::Compliance, "no vessel profile".to_string());
            return update;
        };
        let speed = route.effective_speed_knots(vessel.speed_knots);
        let compliance = assess_compliance(
            route,
            &ctx.content.eca_zones,
            &vessel,
            speed,
            ctx.policy.eca_fuel_margin,
        );
        info!(
            session = %ctx.session,
            zones = compliance.zones_crossed.len(),
            eca_nm = compliance.total_eca_distance_nm,
            lsmgo_mt = compliance.required_lsmgo_mt,
            "compliance assessed"
        );
        update.compliance = Some(compliance);
        update
            .output(StateField::Compliance, StageStatus::Success)
            .status(Stage::Compliance, StageStatus::Success);
        update
    }
}
