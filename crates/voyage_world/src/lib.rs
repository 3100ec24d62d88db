//! Reference data loading shared between the runtime and the CLI.
//!
//! A content directory holds the vessel fleet, bunker ports, catalog routes,
//! ECA zones, price quotes and planning policy. The stage registry is
//! optional and falls back to the built-in table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use voyage_control::AgentRegistry;
use voyage_core::{
    EcaZone, FuelType, Intent, Policy, PortCode, PortPrices, PriceQuote, RouteData, Stage, VesselName,
    VesselProfile, VoyageRequest, VoyageState, Waypoint,
};

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// A port as listed in the catalog. Along-route distances are computed per
/// route by the port service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDef {
    pub code: PortCode,
    pub name: String,
    pub location: Waypoint,
    #[serde(default)]
    pub available_fuels: Vec<FuelType>,
    #[serde(default)]
    pub max_supply_mt: f64,
}

impl PortDef {
    pub fn is_bunker_port(&self) -> bool {
        !self.available_fuels.is_empty() && self.max_supply_mt > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDef {
    pub port: PortCode,
    #[serde(default)]
    pub vlsfo: Option<f64>,
    #[serde(default)]
    pub lsmgo: Option<f64>,
}

impl PriceDef {
    fn get(&self, fuel: FuelType) -> Option<f64> {
        match fuel {
            FuelType::Vlsfo => self.vlsfo,
            FuelType::Lsmgo => self.lsmgo,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub content_version: String,
    pub default_vessel: VesselName,
    pub vessels: Vec<VesselProfile>,
    pub ports: Vec<PortDef>,
    pub routes: Vec<RouteData>,
    pub eca_zones: Vec<EcaZone>,
    pub prices_quoted_at: DateTime<Utc>,
    pub prices: Vec<PriceDef>,
    pub policy: Policy,
    pub registry: AgentRegistry,
}

impl Content {
    pub fn port(&self, code: &PortCode) -> Option<&PortDef> {
        self.ports.iter().find(|p| &p.code == code)
    }

    pub fn vessel(&self, name: &VesselName) -> Option<&VesselProfile> {
        self.vessels.iter().find(|v| &v.name == name)
    }

    /// The named vessel, or the fleet default when no name is given or the
    /// name is unknown.
    pub fn vessel_or_default(&self, name: Option<&VesselName>) -> Option<&VesselProfile> {
        name.and_then(|n| self.vessel(n))
            .or_else(|| self.vessel(&self.default_vessel))
    }

    /// Catalog route between two ports. A route listed in the opposite
    /// direction is returned reversed.
    pub fn route(&self, origin: &PortCode, destination: &PortCode) -> Option<RouteData> {
        if let Some(route) = self
            .routes
            .iter()
            .find(|r| &r.origin == origin && &r.destination == destination)
        {
            return Some(route.clone());
        }
        self.routes
            .iter()
            .find(|r| &r.origin == destination && &r.destination == origin)
            .map(|r| RouteData {
                origin: origin.clone(),
                destination: destination.clone(),
                waypoints: r.waypoints.iter().rev().copied().collect(),
                ..r.clone()
            })
    }

    /// Price quotes for `ports`, one per fuel type listed for the port.
    pub fn quotes(&self, ports: &[PortCode]) -> PortPrices {
        let quotes = self
            .prices
            .iter()
            .filter(|p| ports.contains(&p.port))
            .flat_map(|p| {
                FuelType::ALL.into_iter().filter_map(move |fuel| {
                    p.get(fuel).map(|price| PriceQuote {
                        port: p.port.clone(),
                        fuel_type: fuel,
                        price_usd_per_mt: price,
                        quoted_at: self.prices_quoted_at,
                    })
                })
            })
            .collect();
        PortPrices { quotes }
    }
}

// ---------------------------------------------------------------------------
// File shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct VesselsFile {
    content_version: String,
    default_vessel: VesselName,
    vessels: Vec<VesselProfile>,
}

#[derive(Deserialize)]
struct PortsFile {
    ports: Vec<PortDef>,
}

#[derive(Deserialize)]
struct RoutesFile {
    routes: Vec<RouteData>,
}

#[derive(Deserialize)]
struct ZonesFile {
    zones: Vec<EcaZone>,
}

#[derive(Deserialize)]
struct PricesFile {
    quoted_at: DateTime<Utc>,
    prices: Vec<PriceDef>,
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let raw = std::fs::read_to_string(dir.join(file)).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {file}"))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like a route ending at an unknown port, a price quoted
/// for a port that is not in the catalog, or a vessel that starts with more
/// fuel than its tanks hold.
pub fn validate_content(content: &Content) {
    let port_codes: HashSet<&PortCode> = content.ports.iter().map(|p| &p.code).collect();
    assert_eq!(
        port_codes.len(),
        content.ports.len(),
        "port codes must be unique"
    );

    // Fleet.
    assert!(
        content.vessel(&content.default_vessel).is_some(),
        "default vessel '{}' is not in the fleet",
        content.default_vessel,
    );
    for vessel in &content.vessels {
        for fuel in FuelType::ALL {
            assert!(
                vessel.initial_rob.get(fuel) <= vessel.capacity.get(fuel),
                "vessel '{}' starts with more {} than its capacity",
                vessel.name,
                fuel.label(),
            );
            assert!(
                vessel.consumption_per_day.get(fuel) >= 0.0,
                "vessel '{}' has negative {} consumption",
                vessel.name,
                fuel.label(),
            );
        }
        assert!(
            vessel.speed_knots > 0.0,
            "vessel '{}' has non-positive speed",
            vessel.name,
        );
    }

    // Routes reference known ports.
    for route in &content.routes {
        for code in [&route.origin, &route.destination] {
            assert!(
                port_codes.contains(code),
                "route {}->{} references unknown port '{}'",
                route.origin,
                route.destination,
                code,
            );
        }
        assert!(
            !route.waypoints.is_empty(),
            "route {}->{} has no waypoints",
            route.origin,
            route.destination,
        );
        assert!(
            route.distance_nm >= 0.0,
            "route {}->{} has negative distance",
            route.origin,
            route.destination,
        );
    }

    // Prices reference known bunker ports.
    for price in &content.prices {
        assert!(
            port_codes.contains(&price.port),
            "price quoted for unknown port '{}'",
            price.port,
        );
    }

    for zone in &content.eca_zones {
        assert!(
            zone.min_lat <= zone.max_lat && zone.min_lon <= zone.max_lon,
            "ECA zone '{}' has inverted bounds",
            zone.name,
        );
    }

    for stage in Stage::ALL {
        assert!(
            content.registry.get(stage).is_some(),
            "registry has no entry for stage '{}'",
            stage.name(),
        );
    }
    assert!(
        content.policy.max_stage_attempts > 0,
        "policy max_stage_attempts must be positive"
    );
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn load_content(content_dir: &str) -> Result<Content> {
    let dir = Path::new(content_dir);
    let vessels: VesselsFile = read_json(dir, "vessels.json")?;
    let ports: PortsFile = read_json(dir, "ports.json")?;
    let routes: RoutesFile = read_json(dir, "routes.json")?;
    let zones: ZonesFile = read_json(dir, "eca_zones.json")?;
    let prices: PricesFile = read_json(dir, "prices.json")?;
    let policy: Policy = read_json(dir, "policy.json")?;
    let registry: AgentRegistry = if dir.join("registry.json").exists() {
        read_json(dir, "registry.json")?
    } else {
        AgentRegistry::default()
    };
    let content = Content {
        content_version: vessels.content_version,
        default_vessel: vessels.default_vessel,
        vessels: vessels.vessels,
        ports: ports.ports,
        routes: routes.routes,
        eca_zones: zones.zones,
        prices_quoted_at: prices.quoted_at,
        prices: prices.prices,
        policy,
        registry,
    };
    validate_content(&content);
    Ok(content)
}

/// Builds a request, classifying the intent from the free-text query.
pub fn build_request(
    origin: &str,
    destination: &str,
    query: &str,
    departure: DateTime<Utc>,
) -> VoyageRequest {
    VoyageRequest {
        origin: PortCode::new(origin.to_uppercase()),
        destination: PortCode::new(destination.to_uppercase()),
        vessel: None,
        query: query.to_string(),
        intent: Intent::from_query(query),
        departure,
        speed_knots: None,
    }
}

/// Fresh session state for `request`. A request without a vessel is
/// assigned the fleet default.
pub fn build_initial_state(content: &Content, mut request: VoyageRequest) -> VoyageState {
    if request.vessel.is_none() {
        request.vessel = Some(content.default_vessel.clone());
    }
    VoyageState::new(request)
}
