use async_trait::async_trait;
use tracing::info;
use voyage_core::rob::voyage_consumption;
use voyage_core::weather::consumption_impact;
use voyage_core::{
    segment_route, Stage, StageStatus, StateField, StateUpdate, VoyageState, WeatherSample,
};

use super::{give_up, record_failure, StageWorker, WorkerContext};
use crate::call::bounded;
use crate::CollaboratorError;

/// Marine forecast along the timeline and, for bunker planning, its effect
/// on consumption.
pub struct WeatherWorker;

async fn fetch_forecast(
    snapshot: &VoyageState,
    ctx: &WorkerContext,
) -> Result<Vec<WeatherSample>, CollaboratorError> {
    if let Some(samples) = snapshot.weather_forecast.as_ref().filter(|s| !s.is_empty()) {
        return Ok(samples.clone());
    }
    let timeline = snapshot.vessel_timeline.as_deref().unwrap_or_default();
    let samples = bounded(
        "weather",
        ctx.policy.timeouts.weather_ms,
        &ctx.cancel,
        ctx.collaborators.weather.forecast(timeline),
    )
    .await?;
    if samples.is_empty() {
        return Err(CollaboratorError::Unavailable {
            service: "weather",
            reason: "empty forecast".to_string(),
        });
    }
    Ok(samples)
}

#[async_trait]
impl StageWorker for WeatherWorker {
    fn stage(&self) -> Stage {
        Stage::Weather
    }

    async fn run(&self, snapshot: VoyageState, ctx: &WorkerContext) -> StateUpdate {
        let mut update = StateUpdate::based_on(&snapshot);
        if !snapshot.has(StateField::VesselTimeline) {
            give_up(&mut update, Stage::Weather, "no vessel timeline to forecast".to_string());
            return update;
        }

        let samples = match fetch_forecast(&snapshot, ctx).await {
            Ok(samples) => samples,
            Err(error) => {
                record_failure(&mut update, Stage::Weather, StateField::WeatherForecast, &error);
                return update;
            }
        };
        if !snapshot.has(StateField::WeatherForecast) {
            update.weather_forecast = Some(samples.clone());
            update.output(StateField::WeatherForecast, StageStatus::Success);
        }

        if snapshot.request.intent.needs_bunker {
            let (Some(route), Some(vessel)) = (&snapshot.route, ctx.vessel(&snapshot.request)) else {
                give_up(&mut update, Stage::Weather, "no route or vessel for consumption".to_string());
                return update;
            };
            let segments = segment_route(route, snapshot.compliance.as_ref());
            let speed = route.effective_speed_knots(vessel.speed_knots);
            let base = voyage_consumption(route, &segments, &vessel, speed);
            let impact = consumption_impact(&samples, base.total());
            info!(
                session = %ctx.session,
                increase_percent = impact.increase_percent,
                additional_fuel_mt = impact.additional_fuel_mt,
                "weather consumption estimated"
            );
            update.weather_consumption = Some(impact);
            update.output(StateField::WeatherConsumption, StageStatus::Success);
        }

        info!(session = %ctx.session, samples = samples.len(), "forecast ready");
        update.status(Stage::Weather, StageStatus::Success);
        update
    }
}
