//! Services the stage workers call out to.
//!
//! Every call goes through [`crate::call::bounded`], which applies the
//! per-class timeout and the session's cancellation token.

use std::sync::Arc;

use async_trait::async_trait;
use voyage_control::AgentRegistry;
use voyage_core::{
    BunkerPort, PlannedOrder, PortCode, PortPrices, RouteData, TimelinePoint, VoyageRequest,
    WeatherSample,
};
use voyage_world::Content;

use crate::offline::{CatalogPorts, CatalogPrices, CatalogRoutes, Climatology, KeywordPlanner};
use crate::CollaboratorError;

#[async_trait]
pub trait RouteService: Send + Sync {
    async fn route(&self, origin: &PortCode, destination: &PortCode)
        -> Result<RouteData, CollaboratorError>;
}

#[async_trait]
pub trait WeatherService: Send + Sync {
    /// One sample per timeline point.
    async fn forecast(&self, timeline: &[TimelinePoint]) -> Result<Vec<WeatherSample>, CollaboratorError>;
}

#[async_trait]
pub trait PortService: Send + Sync {
    /// Bunker ports within `radius_nm` of the route, with their distance
    /// along and off the route filled in.
    async fn find_ports(&self, route: &RouteData, radius_nm: f64)
        -> Result<Vec<BunkerPort>, CollaboratorError>;
}

#[async_trait]
pub trait PriceService: Send + Sync {
    async fn quotes(&self, ports: &[PortCode]) -> Result<PortPrices, CollaboratorError>;
}

/// Advisory stage ordering. The scheduler validates whatever comes back.
#[async_trait]
pub trait ExternalPlanner: Send + Sync {
    async fn plan(&self, request: &VoyageRequest, registry: &AgentRegistry)
        -> Result<PlannedOrder, CollaboratorError>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub routes: Arc<dyn RouteService>,
    pub weather: Arc<dyn WeatherService>,
    pub ports: Arc<dyn PortService>,
    pub prices: Arc<dyn PriceService>,
    pub planner: Option<Arc<dyn ExternalPlanner>>,
}

impl Collaborators {
    /// Catalog-backed services that never leave the process.
    pub fn offline(content: &Arc<Content>) -> Self {
        Self {
            routes: Arc::new(CatalogRoutes::new(Arc::clone(content))),
            weather: Arc::new(Climatology),
            ports: Arc::new(CatalogPorts::new(Arc::clone(content))),
            prices: Arc::new(CatalogPrices::new(Arc::clone(content))),
            planner: Some(Arc::new(KeywordPlanner)),
        }
    }

    #[must_use]
    pub fn with_routes(mut self, routes: Arc<dyn RouteService>) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn with_weather(mut self, weather: Arc<dyn WeatherService>) -> Self {
        self.weather = weather;
        self
    }

    #[must_use]
    pub fn with_ports(mut self, ports: Arc<dyn PortService>) -> Self {
        self.ports = ports;
        self
    }

    #[must_use]
    pub fn with_prices(mut self, prices: Arc<dyn PriceService>) -> Self {
        self.prices = prices;
        self
    }

    #[must_use]
    pub fn with_planner(mut self, planner: Option<Arc<dyn ExternalPlanner>>) -> Self {
        self.planner = planner;
        self
    }
}
