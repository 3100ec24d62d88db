//! Stage workers.
//!
//! A worker receives a snapshot of the session state, calls only the
//! collaborators needed for outputs that are still missing, and returns a
//! partial update. Workers never fail the session: collaborator errors
//! become stage errors, transient ones leaving the stage retryable.

mod bunker;
mod compliance;
mod route;
mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use voyage_core::{
    FailureKind, Policy, SessionId, Stage, StageError, StageStatus, StateField, StateUpdate,
    VesselProfile, VoyageRequest, VoyageState,
};
use voyage_world::Content;

use crate::collaborators::Collaborators;
use crate::memo::RouteMemo;
use crate::CollaboratorError;

pub use bunker::BunkerWorker;
pub use compliance::ComplianceWorker;
pub use route::RouteWorker;
pub use weather::WeatherWorker;

/// Everything a worker may touch besides the state snapshot.
#[derive(Clone)]
pub struct WorkerContext {
    pub session: SessionId,
    pub content: Arc<Content>,
    pub policy: Policy,
    pub collaborators: Collaborators,
    pub memo: Arc<RouteMemo>,
    pub cancel: CancellationToken,
}

impl WorkerContext {
    /// The request's vessel with any requested speed applied.
    pub fn vessel(&self, request: &VoyageRequest) -> Option<VesselProfile> {
        let mut vessel = self
            .content
            .vessel_or_default(request.vessel.as_ref())?
            .clone();
        if let Some(speed) = request.speed_knots.filter(|s| *s > 0.0) {
            vessel.speed_knots = speed;
        }
        Some(vessel)
    }
}

#[async_trait]
pub trait StageWorker: Send + Sync {
    fn stage(&self) -> Stage;

    async fn run(&self, snapshot: VoyageState, ctx: &WorkerContext) -> StateUpdate;
}

pub fn worker_for(stage: Stage) -> &'static dyn StageWorker {
    match stage {
        Stage::Route => &RouteWorker,
        Stage::Compliance => &ComplianceWorker,
        Stage::Weather => &WeatherWorker,
        Stage::Bunker => &BunkerWorker,
    }
}

/// Records a collaborator failure against `stage` and the output it was
/// meant to produce.
fn record_failure(
    update: &mut StateUpdate,
    stage: Stage,
    output: StateField,
    error: &CollaboratorError,
) {
    warn!(
        stage = %stage,
        output = %output,
        transient = error.is_transient(),
        "{error}"
    );
    let status = if error.is_transient() {
        StageStatus::Pending
    } else {
        StageStatus::Failed
    };
    update
        .output(output, status)
        .status(stage, status)
        .error(stage, error.to_stage_error());
}

/// Marks `stage` failed for a reason no retry can fix.
fn give_up(update: &mut StateUpdate, stage: Stage, message: String) {
    warn!(stage = %stage, "{message}");
    update
        .status(stage, StageStatus::Failed)
        .error(stage, StageError::new(message, FailureKind::Permanent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_has_a_worker() {
        for stage in Stage::ALL {
            assert_eq!(worker_for(stage).stage(), stage);
        }
    }

    #[test]
    fn test_transient_failure_leaves_stage_pending() {
        let state = voyage_core::test_fixtures::base_state();
        let mut update = StateUpdate::based_on(&state);
        let error = CollaboratorError::Timeout {
            service: "route",
            budget_ms: 10,
        };
        record_failure(&mut update, Stage::Route, StateField::Route, &error);
        assert_eq!(update.stage_status.get(&Stage::Route), Some(&StageStatus::Pending));
        assert_eq!(
            update.stage_errors.get(&Stage::Route).map(|e| e.kind),
            Some(FailureKind::Transient)
        );
    }
}
