use async_trait::async_trait;
use tracing::{info, warn};
use voyage_core::rob::{simulate, voyage_consumption};
use voyage_core::{
    bunker, segment_route, BunkerAnalysis, BunkerEvent, BunkerPlanOutcome, BunkerPort, LedgerError,
    LedgerInput, PlannerInput, PortCode, PortPrices, RobTracking, RouteData, Stage, StageStatus,
    StateField, StateUpdate, VesselProfile, VoyageState,
};

use super::{give_up, record_failure, StageWorker, WorkerContext};
use crate::call::bounded;

/// Bunker ports and prices, ROB tracking with and without the best single
/// stop, and a multi-stop plan when one stop is not enough.
pub struct BunkerWorker;

struct Analysis {
    analysis: BunkerAnalysis,
    tracking: RobTracking,
    multi: BunkerPlanOutcome,
}

/// Runs the ledger and the planner over the gathered inputs.
fn analyse(
    snapshot: &VoyageState,
    ctx: &WorkerContext,
    route: &RouteData,
    vessel: &VesselProfile,
    ports: &[BunkerPort],
    prices: &PortPrices,
) -> Result<Analysis, LedgerError> {
    let policy = &ctx.policy;
    let segments = segment_route(route, snapshot.compliance.as_ref());
    let speed = route.effective_speed_knots(vessel.speed_knots);
    let weather = snapshot.weather_consumption;
    let ledger = LedgerInput {
        route,
        weather: weather.as_ref(),
        vessel,
        bunker: None,
        segments: &segments,
        safety_margin_days: policy.safety_margin_days,
    };
    let without_bunker = simulate(&ledger)?;

    let input = PlannerInput {
        voyage_consumption: voyage_consumption(route, &segments, vessel, speed),
        vessel,
        ports,
        prices,
        weather_factor: weather.map_or(1.0, |w| w.factor()),
        safety_margin_days: policy.safety_margin_days,
        force_multi_stop: false,
        max_stops: policy.bunker_max_stops,
        candidate_limit: policy.bunker_candidate_limit,
        route_distance_nm: route.distance_nm,
        speed_knots: speed,
    };
    let analysis = bunker::rank_single_stops(&input);

    let mut bunker_port = None;
    let with_bunker = match analysis.best() {
        Some(best) => {
            let event = BunkerEvent {
                port: best.port.clone(),
                location: best.location,
                quantities: best.quantities,
            };
            bunker_port = Some(best.port.clone());
            Some(simulate(&LedgerInput {
                bunker: Some(&event),
                ..ledger
            })?)
        }
        None => None,
    };
    let still_unsafe = with_bunker.as_ref().is_some_and(|r| !r.overall_safe);
    let multi = bunker::plan(&PlannerInput {
        force_multi_stop: still_unsafe,
        ..input
    });

    Ok(Analysis {
        analysis,
        tracking: RobTracking {
            without_bunker,
            with_bunker,
            bunker_port,
        },
        multi,
    })
}

/// Ports along the route and their prices, fetched only when the snapshot
/// lacks them. `None` after a recorded collaborator failure.
async fn gather_market(
    snapshot: &VoyageState,
    ctx: &WorkerContext,
    route: &RouteData,
    update: &mut StateUpdate,
) -> Option<(Vec<BunkerPort>, PortPrices)> {
    let ports = if let Some(ports) = &snapshot.bunker_ports {
        ports.clone()
    } else {
        let found = bounded(
            "ports",
            ctx.policy.timeouts.ports_ms,
            &ctx.cancel,
            ctx.collaborators.ports.find_ports(route, ctx.policy.port_search_radius_nm),
        )
        .await;
        match found {
            Ok(ports) => {
                update.bunker_ports = Some(ports.clone());
                update.output(StateField::BunkerPorts, StageStatus::Success);
                ports
            }
            Err(error) => {
                record_failure(update, Stage::Bunker, StateField::BunkerPorts, &error);
                return None;
            }
        }
    };

    let prices = if let Some(prices) = &snapshot.port_prices {
        prices.clone()
    } else {
        let codes: Vec<PortCode> = ports.iter().map(|p| p.code.clone()).collect();
        let quoted = bounded(
            "prices",
            ctx.policy.timeouts.prices_ms,
            &ctx.cancel,
            ctx.collaborators.prices.quotes(&codes),
        )
        .await;
        match quoted {
            Ok(prices) => {
                update.port_prices = Some(prices.clone());
                update.output(StateField::PortPrices, StageStatus::Success);
                prices
            }
            Err(error) => {
                record_failure(update, Stage::Bunker, StateField::PortPrices, &error);
                return None;
            }
        }
    };
    Some((ports, prices))
}

#[async_trait]
impl StageWorker for BunkerWorker {
    fn stage(&self) -> Stage {
        Stage::Bunker
    }

    async fn run(&self, snapshot: VoyageState, ctx: &WorkerContext) -> StateUpdate {
        let mut update = StateUpdate::based_on(&snapshot);
        let Some(route) = &snapshot.route else {
            give_up(&mut update, Stage::Bunker, "no route to plan along".to_string());
            return update;
        };
        let Some(vessel) = ctx.vessel(&snapshot.request) else {
            give_up(&mut update, Stage::Bunker, "no vessel profile".to_string());
            return update;
        };
        if snapshot.request.intent.needs_weather && snapshot.weather_consumption.is_none() {
            give_up(&mut update, Stage::Bunker, "no weather consumption estimate".to_string());
            return update;
        }

        let Some((ports, prices)) = gather_market(&snapshot, ctx, route, &mut update).await else {
            return update;
        };
        if prices.is_empty() {
            warn!(session = %ctx.session, ports = ports.len(), "no bunker prices along the route");
        }

        let Analysis {
            analysis,
            tracking,
            multi,
        } = match analyse(&snapshot, ctx, route, &vessel, &ports, &prices) {
            Ok(result) => result,
            Err(error) => {
                give_up(&mut update, Stage::Bunker, format!("fuel ledger: {error}"));
                return update;
            }
        };

        info!(
            session = %ctx.session,
            candidates = analysis.recommendations.len(),
            safe = tracking.effective().overall_safe,
            multi_stop_required = multi.required,
            "bunker analysis ready"
        );
        update.bunker_analysis = Some(analysis);
        update.rob_tracking = Some(tracking);
        update
            .output(StateField::BunkerAnalysis, StageStatus::Success)
            .output(StateField::RobTracking, StageStatus::Success);
        if multi.required {
            update.multi_bunker_plan = Some(multi);
            update.output(StateField::MultiBunkerPlan, StageStatus::Success);
        }
        update.status(Stage::Bunker, StageStatus::Success);
        update
    }
}
