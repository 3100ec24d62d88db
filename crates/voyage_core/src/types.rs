//! Type definitions for `voyage_core`.
//!
//! Reference data, request types, and the per-stage records written into
//! the voyage state. Engine-specific inputs and outputs live beside their
//! engines (`rob`, `eca`, `bunker`) and are re-exported from the crate root.

use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(PortCode);
string_id!(VesselName);
string_id!(ZoneName);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Fuel
// ---------------------------------------------------------------------------

/// `Vlsfo` is burned on the open sea; `Lsmgo` inside emission control areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Vlsfo,
    Lsmgo,
}

impl FuelType {
    pub const ALL: [FuelType; 2] = [FuelType::Vlsfo, FuelType::Lsmgo];

    pub fn label(self) -> &'static str {
        match self {
            FuelType::Vlsfo => "VLSFO",
            FuelType::Lsmgo => "LSMGO",
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One amount per fuel type, in metric tonnes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FuelQuantities {
    #[serde(default)]
    pub vlsfo: f64,
    #[serde(default)]
    pub lsmgo: f64,
}

impl FuelQuantities {
    pub const ZERO: FuelQuantities = FuelQuantities {
        vlsfo: 0.0,
        lsmgo: 0.0,
    };

    pub fn new(vlsfo: f64, lsmgo: f64) -> Self {
        Self { vlsfo, lsmgo }
    }

    pub fn only(fuel: FuelType, amount: f64) -> Self {
        let mut quantities = Self::ZERO;
        *quantities.get_mut(fuel) = amount;
        quantities
    }

    pub fn get(&self, fuel: FuelType) -> f64 {
        match fuel {
            FuelType::Vlsfo => self.vlsfo,
            FuelType::Lsmgo => self.lsmgo,
        }
    }

    pub fn get_mut(&mut self, fuel: FuelType) -> &mut f64 {
        match fuel {
            FuelType::Vlsfo => &mut self.vlsfo,
            FuelType::Lsmgo => &mut self.lsmgo,
        }
    }

    #[must_use]
    pub fn map(self, f: impl Fn(FuelType, f64) -> f64) -> Self {
        Self {
            vlsfo: f(FuelType::Vlsfo, self.vlsfo),
            lsmgo: f(FuelType::Lsmgo, self.lsmgo),
        }
    }

    #[must_use]
    pub fn zip_with(self, other: Self, f: impl Fn(FuelType, f64, f64) -> f64) -> Self {
        Self {
            vlsfo: f(FuelType::Vlsfo, self.vlsfo, other.vlsfo),
            lsmgo: f(FuelType::Lsmgo, self.lsmgo, other.lsmgo),
        }
    }

    pub fn total(&self) -> f64 {
        self.vlsfo + self.lsmgo
    }

    pub fn any_negative(&self) -> bool {
        FuelType::ALL.iter().any(|fuel| self.get(*fuel) < 0.0)
    }

    /// Fuel types with a strictly positive amount, in `FuelType::ALL` order.
    pub fn positive_fuels(&self) -> Vec<FuelType> {
        FuelType::ALL
            .into_iter()
            .filter(|fuel| self.get(*fuel) > 0.0)
            .collect()
    }
}

impl Add for FuelQuantities {
    type Output = FuelQuantities;

    fn add(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |_, a, b| a + b)
    }
}

impl Sub for FuelQuantities {
    type Output = FuelQuantities;

    fn sub(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |_, a, b| a - b)
    }
}

// ---------------------------------------------------------------------------
// Vessel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselProfile {
    pub name: VesselName,
    pub initial_rob: FuelQuantities,
    pub capacity: FuelQuantities,
    pub consumption_per_day: FuelQuantities,
    /// Hull-fouling multiplier applied to every consumption rate. Clean hull = 1.0.
    #[serde(default = "default_fouling_factor")]
    pub fouling_factor: f64,
    pub speed_knots: f64,
}

fn default_fouling_factor() -> f64 {
    1.0
}

impl VesselProfile {
    /// Daily burn of `fuel` including hull fouling.
    pub fn burn_rate_per_day(&self, fuel: FuelType) -> f64 {
        self.consumption_per_day.get(fuel) * self.fouling_factor
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    Direct,
    Canal,
    Coastal,
    OpenOcean,
}

/// Written once by the route stage; never replaced afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    pub origin: PortCode,
    pub destination: PortCode,
    pub distance_nm: f64,
    pub estimated_hours: f64,
    pub waypoints: Vec<Waypoint>,
    pub route_class: RouteClass,
}

impl RouteData {
    /// Speed implied by the estimated duration, or `fallback_knots` when the
    /// route carries no usable duration.
    pub fn effective_speed_knots(&self, fallback_knots: f64) -> f64 {
        if self.estimated_hours > 0.0 && self.distance_nm > 0.0 {
            self.distance_nm / self.estimated_hours
        } else {
            fallback_knots
        }
    }

    pub fn estimated_days(&self) -> f64 {
        self.estimated_hours / 24.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub position: Waypoint,
    pub timestamp: DateTime<Utc>,
    pub distance_from_origin_nm: f64,
}

// ---------------------------------------------------------------------------
// Compliance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchAction {
    EnterEca,
    ExitEca,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchingPoint {
    pub distance_from_origin_nm: f64,
    pub action: SwitchAction,
    pub zone: ZoneName,
    pub location: Waypoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceData {
    pub zones_crossed: Vec<ZoneName>,
    pub total_eca_distance_nm: f64,
    /// LSMGO needed for the in-zone distance, safety margin included.
    pub required_lsmgo_mt: f64,
    /// Ordered by distance from origin. Empty when only the aggregate is known.
    pub switching_points: Vec<SwitchingPoint>,
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub wave_height_m: f64,
    pub wind_speed_knots: f64,
    pub wind_direction_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub position: Waypoint,
    pub timestamp: DateTime<Utc>,
    pub conditions: WeatherConditions,
    pub confidence: ForecastConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherConsumption {
    pub increase_percent: f64,
    pub additional_fuel_mt: f64,
}

impl WeatherConsumption {
    /// Multiplier applied to calm-water consumption.
    pub fn factor(&self) -> f64 {
        1.0 + self.increase_percent / 100.0
    }
}

// ---------------------------------------------------------------------------
// Ports and prices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerPort {
    pub code: PortCode,
    pub name: String,
    pub location: Waypoint,
    pub distance_from_route_nm: f64,
    pub distance_along_route_nm: f64,
    pub available_fuels: Vec<FuelType>,
    /// Largest single delivery the port can make, per fuel type.
    pub max_supply_mt: f64,
}

impl BunkerPort {
    pub fn supplies(&self, fuel: FuelType) -> bool {
        self.available_fuels.contains(&fuel)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub port: PortCode,
    pub fuel_type: FuelType,
    pub price_usd_per_mt: f64,
    pub quoted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortPrices {
    pub quotes: Vec<PriceQuote>,
}

impl PortPrices {
    pub fn price(&self, port: &PortCode, fuel: FuelType) -> Option<f64> {
        self.quotes
            .iter()
            .find(|q| &q.port == port && q.fuel_type == fuel)
            .map(|q| q.price_usd_per_mt)
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Route,
    Compliance,
    Weather,
    Bunker,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Route, Stage::Compliance, Stage::Weather, Stage::Bunker];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Route => "route",
            Stage::Compliance => "compliance",
            Stage::Weather => "weather",
            Stage::Bunker => "bunker",
        }
    }

    /// Accepts `route` as well as worker-style names like `route_agent`.
    pub fn parse(name: &str) -> Option<Stage> {
        let normalized = name.trim().to_ascii_lowercase();
        let base = normalized.strip_suffix("_agent").unwrap_or(&normalized);
        Stage::ALL.into_iter().find(|stage| stage.name() == base)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

/// Transient failures leave the stage retryable under the circuit breaker;
/// permanent ones mark it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageError {
    pub message: String,
    pub kind: FailureKind,
    pub at: DateTime<Utc>,
}

impl StageError {
    pub fn new(message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            message: message.into(),
            kind,
            at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

const WEATHER_KEYWORDS: &[&str] = &[
    "weather", "wave", "wind", "storm", "swell", "sea state", "forecast",
];

const BUNKER_KEYWORDS: &[&str] = &[
    "bunker", "fuel", "refuel", "rob", "vlsfo", "lsmgo", "price", "cost",
];

/// Which analyses the request asks for beyond the route itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub needs_weather: bool,
    pub needs_bunker: bool,
}

impl Intent {
    pub const ROUTE_ONLY: Intent = Intent {
        needs_weather: false,
        needs_bunker: false,
    };

    pub const FULL: Intent = Intent {
        needs_weather: true,
        needs_bunker: true,
    };

    /// Keyword classification of a free-text request. Bunker planning works
    /// from weather-adjusted consumption, so it implies a weather stage.
    pub fn from_query(query: &str) -> Self {
        let query = query.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));
        let needs_bunker = mentions(BUNKER_KEYWORDS);
        Self {
            needs_weather: needs_bunker || mentions(WEATHER_KEYWORDS),
            needs_bunker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageRequest {
    pub origin: PortCode,
    pub destination: PortCode,
    #[serde(default)]
    pub vessel: Option<VesselName>,
    #[serde(default)]
    pub query: String,
    pub intent: Intent,
    pub departure: DateTime<Utc>,
    #[serde(default)]
    pub speed_knots: Option<f64>,
}

/// Advisory stage order proposed by an external planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedOrder {
    pub stages: Vec<Stage>,
    pub reasoning: String,
}

impl PlannedOrder {
    /// Parses stage names, dropping unknown names and repeats.
    pub fn from_names<S: AsRef<str>>(names: &[S], reasoning: impl Into<String>) -> Self {
        let mut stages = Vec::new();
        for stage in names.iter().filter_map(|name| Stage::parse(name.as_ref())) {
            if !stages.contains(&stage) {
                stages.push(stage);
            }
        }
        Self {
            stages,
            reasoning: reasoning.into(),
        }
    }
}
