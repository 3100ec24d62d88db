use async_trait::async_trait;
use tracing::{debug, info};
use voyage_core::{
    sample_timeline, RouteData, Stage, StageStatus, StateField, StateUpdate, VoyageRequest,
    VoyageState,
};

use super::{give_up, record_failure, StageWorker, WorkerContext};
use crate::call::bounded;
use crate::CollaboratorError;

/// Route between the two ports, then the vessel's position timeline.
pub struct RouteWorker;

async fn fetch_route(ctx: &WorkerContext, request: &VoyageRequest) -> Result<RouteData, CollaboratorError> {
    if let Some(route) = ctx.memo.get(&request.origin, &request.destination) {
        debug!(session = %ctx.session, "route memo hit");
        return Ok(route);
    }
    let route = bounded(
        "route",
        ctx.policy.timeouts.route_ms,
        &ctx.cancel,
        ctx.collaborators.routes.route(&request.origin, &request.destination),
    )
    .await?;
    if route.distance_nm < 0.0 || route.waypoints.is_empty() {
        return Err(CollaboratorError::InvalidInput(format!(
            "route {}->{} has no usable geometry",
            request.origin, request.destination
        )));
    }
    ctx.memo.insert(&route);
    Ok(route)
}

/// A requested speed overrides the service's duration estimate.
fn at_requested_speed(mut route: RouteData, request: &VoyageRequest) -> RouteData {
    if let Some(speed) = request.speed_knots.filter(|s| *s > 0.0) {
        route.estimated_hours = route.distance_nm / speed;
    }
    route
}

#[async_trait]
impl StageWorker for RouteWorker {
    fn stage(&self) -> Stage {
        Stage::Route
    }

    async fn run(&self, snapshot: VoyageState, ctx: &WorkerContext) -> StateUpdate {
        let mut update = StateUpdate::based_on(&snapshot);
        let request = &snapshot.request;

        let route = if let Some(route) = &snapshot.route {
            route.clone()
        } else {
            match fetch_route(ctx, request).await {
                Ok(route) => {
                    let route = at_requested_speed(route, request);
                    update.route = Some(route.clone());
                    update.output(StateField::Route, StageStatus::Success);
                    route
                }
                Err(error) => {
                    record_failure(&mut update, Stage::Route, StateField::Route, &error);
                    return update;
                }
            }
        };

        if !snapshot.has(StateField::VesselTimeline) {
            let fallback = ctx
                .vessel(request)
                .map_or(ctx.policy.default_speed_knots, |v| v.speed_knots);
            let speed = route.effective_speed_knots(fallback);
            match sample_timeline(
                &route,
                request.departure,
                speed,
                ctx.policy.timeline_interval_hours,
            ) {
                Ok(points) => {
                    update.vessel_timeline = Some(points);
                    update.output(StateField::VesselTimeline, StageStatus::Success);
                }
                Err(error) => {
                    update.output(StateField::VesselTimeline, StageStatus::Failed);
                    give_up(&mut update, Stage::Route, format!("vessel timeline: {error}"));
                    return update;
                }
            }
        }

        info!(
            session = %ctx.session,
            distance_nm = route.distance_nm,
            waypoints = route.waypoints.len(),
            "route ready"
        );
        update.status(Stage::Route, StageStatus::Success);
        update
    }
}
