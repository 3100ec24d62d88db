//! Catalog-backed collaborators for running without remote services.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use voyage_control::AgentRegistry;
use voyage_core::geo::{cumulative_distances, haversine_nm, project_onto};
use voyage_core::{
    BunkerPort, ForecastConfidence, PlannedOrder, PortCode, PortPrices, RouteClass, RouteData,
    Stage, TimelinePoint, VoyageRequest, WeatherConditions, WeatherSample,
};
use voyage_world::Content;

use crate::collaborators::{ExternalPlanner, PortService, PriceService, RouteService, WeatherService};
use crate::CollaboratorError;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Catalog routes, falling back to a single great-circle leg between the
/// two ports' coordinates.
pub struct CatalogRoutes {
    content: Arc<Content>,
}

impl CatalogRoutes {
    pub fn new(content: Arc<Content>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl RouteService for CatalogRoutes {
    async fn route(
        &self,
        origin: &PortCode,
        destination: &PortCode,
    ) -> Result<RouteData, CollaboratorError> {
        if let Some(route) = self.content.route(origin, destination) {
            return Ok(route);
        }
        let locate = |code: &PortCode| {
            self.content
                .port(code)
                .map(|p| p.location)
                .ok_or_else(|| CollaboratorError::NotFound(format!("unknown port {code}")))
        };
        let (from, to) = (locate(origin)?, locate(destination)?);
        let distance_nm = haversine_nm(from, to);
        let speed = self.content.policy.default_speed_knots;
        let waypoints = if distance_nm > 0.0 { vec![from, to] } else { vec![from] };
        Ok(RouteData {
            origin: origin.clone(),
            destination: destination.clone(),
            distance_nm,
            estimated_hours: if speed > 0.0 { distance_nm / speed } else { 0.0 },
            waypoints,
            route_class: RouteClass::Direct,
        })
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Deterministic sea state from latitude band and season.
pub struct Climatology;

fn climatology_at(point: &TimelinePoint) -> WeatherConditions {
    let lat = point.position.lat;
    let month = point.timestamp.month();
    let mut wave = match lat.abs() {
        l if l < 15.0 => 1.2,
        l if l < 35.0 => 1.8,
        l if l < 50.0 => 2.8,
        _ => 3.5,
    };
    let northern_winter = matches!(month, 12 | 1 | 2);
    let southern_winter = matches!(month, 6..=8);
    if lat.abs() > 20.0 && ((lat > 0.0 && northern_winter) || (lat < 0.0 && southern_winter)) {
        wave += 0.8;
    }
    // Southwest monsoon over the northern Indian Ocean.
    let lon = point.position.lon;
    if (0.0..25.0).contains(&lat) && (50.0..100.0).contains(&lon) && matches!(month, 6..=9) {
        wave += 1.5;
    }
    WeatherConditions {
        wave_height_m: wave,
        wind_speed_knots: wave * 8.0,
        wind_direction_deg: if lat.abs() > 35.0 { 225.0 } else { 45.0 },
    }
}

#[async_trait]
impl WeatherService for Climatology {
    async fn forecast(&self, timeline: &[TimelinePoint]) -> Result<Vec<WeatherSample>, CollaboratorError> {
        let Some(start) = timeline.first().map(|p| p.timestamp) else {
            return Err(CollaboratorError::InvalidInput("empty timeline".to_string()));
        };
        Ok(timeline
            .iter()
            .map(|point| {
                let lead_days = (point.timestamp - start).num_days();
                WeatherSample {
                    position: point.position,
                    timestamp: point.timestamp,
                    conditions: climatology_at(point),
                    confidence: match lead_days {
                        d if d <= 3 => ForecastConfidence::High,
                        d if d <= 7 => ForecastConfidence::Medium,
                        _ => ForecastConfidence::Low,
                    },
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Ports and prices
// ---------------------------------------------------------------------------

pub struct CatalogPorts {
    content: Arc<Content>,
}

impl CatalogPorts {
    pub fn new(content: Arc<Content>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl PortService for CatalogPorts {
    async fn find_ports(
        &self,
        route: &RouteData,
        radius_nm: f64,
    ) -> Result<Vec<BunkerPort>, CollaboratorError> {
        if route.waypoints.is_empty() {
            return Err(CollaboratorError::InvalidInput("route has no waypoints".to_string()));
        }
        let cumulative = cumulative_distances(&route.waypoints, route.distance_nm.max(0.0));
        let mut ports: Vec<BunkerPort> = self
            .content
            .ports
            .iter()
            .filter(|p| p.is_bunker_port())
            .filter_map(|p| {
                let (along, off) = project_onto(&route.waypoints, &cumulative, p.location)?;
                (off <= radius_nm).then(|| BunkerPort {
                    code: p.code.clone(),
                    name: p.name.clone(),
                    location: p.location,
                    distance_from_route_nm: off,
                    distance_along_route_nm: along,
                    available_fuels: p.available_fuels.clone(),
                    max_supply_mt: p.max_supply_mt,
                })
            })
            .collect();
        ports.sort_by(|a, b| a.distance_along_route_nm.total_cmp(&b.distance_along_route_nm));
        Ok(ports)
    }
}

pub struct CatalogPrices {
    content: Arc<Content>,
}

impl CatalogPrices {
    pub fn new(content: Arc<Content>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl PriceService for CatalogPrices {
    async fn quotes(&self, ports: &[PortCode]) -> Result<PortPrices, CollaboratorError> {
        Ok(self.content.quotes(ports))
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Orders the stages the request's intent asks for, in dependency order.
pub struct KeywordPlanner;

#[async_trait]
impl ExternalPlanner for KeywordPlanner {
    async fn plan(
        &self,
        request: &VoyageRequest,
        registry: &AgentRegistry,
    ) -> Result<PlannedOrder, CollaboratorError> {
        let intent = request.intent;
        let stages: Vec<Stage> = Stage::ALL
            .into_iter()
            .filter(|stage| match stage {
                Stage::Route | Stage::Compliance => true,
                Stage::Weather => intent.needs_weather,
                Stage::Bunker => intent.needs_bunker,
            })
            .filter(|stage| registry.get(*stage).is_some())
            .collect();
        let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
        Ok(PlannedOrder {
            reasoning: format!("intent keywords select {}", names.join(", ")),
            stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::test_fixtures::{base_request, departure};
    use voyage_core::Waypoint;

    fn point(lat: f64, lon: f64, days: i64) -> TimelinePoint {
        TimelinePoint {
            position: Waypoint::new(lat, lon),
            timestamp: departure() + chrono::Duration::days(days),
            distance_from_origin_nm: 0.0,
        }
    }

    #[tokio::test]
    async fn test_climatology_is_rougher_at_high_latitude() {
        let samples = Climatology
            .forecast(&[point(1.0, 104.0, 0), point(55.0, 3.0, 10)])
            .await
            .unwrap();
        assert!(samples[1].conditions.wave_height_m > samples[0].conditions.wave_height_m);
        assert_eq!(samples[0].confidence, ForecastConfidence::High);
        assert_eq!(samples[1].confidence, ForecastConfidence::Low);
    }

    #[tokio::test]
    async fn test_climatology_rejects_empty_timeline() {
        let err = Climatology.forecast(&[]).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_keyword_planner_follows_intent() {
        let mut request = base_request();
        request.intent = voyage_core::Intent::ROUTE_ONLY;
        let order = KeywordPlanner
            .plan(&request, &AgentRegistry::default())
            .await
            .unwrap();
        assert_eq!(order.stages, vec![Stage::Route, Stage::Compliance]);

        let full = KeywordPlanner
            .plan(&base_request(), &AgentRegistry::default())
            .await
            .unwrap();
        assert_eq!(full.stages, Stage::ALL.to_vec());
    }
}
