//! Shared test fixtures for voyage_core and downstream crates.
//!
//! The reference voyage is Singapore to Fujairah: 3,000 nm in 216 hours
//! (9 days), a vessel burning 35 MT/day of VLSFO with 100 MT on board and
//! 650 MT of tank capacity. Without bunkering it ends 215 MT short.

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    BunkerPort, EcaZone, FuelQuantities, FuelType, Intent, PortCode, PortPrices, PriceQuote,
    RouteClass, RouteData, SessionId, VesselName, VesselProfile, VoyageRequest, VoyageState,
    Waypoint, ZoneName,
};

pub fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn test_vessel() -> VesselProfile {
    VesselProfile {
        name: VesselName::new("MV Straits Trader"),
        initial_rob: FuelQuantities::new(100.0, 50.0),
        capacity: FuelQuantities::new(650.0, 120.0),
        consumption_per_day: FuelQuantities::new(35.0, 4.0),
        fouling_factor: 1.0,
        speed_knots: 14.0,
    }
}

pub fn sgsin_aefjr_route() -> RouteData {
    RouteData {
        origin: PortCode::new("SGSIN"),
        destination: PortCode::new("AEFJR"),
        distance_nm: 3000.0,
        estimated_hours: 216.0,
        waypoints: vec![
            Waypoint::new(1.26, 103.82),
            Waypoint::new(2.95, 101.25),
            Waypoint::new(5.9, 97.5),
            Waypoint::new(5.6, 80.6),
            Waypoint::new(12.0, 66.0),
            Waypoint::new(22.6, 59.9),
            Waypoint::new(25.15, 56.36),
        ],
        route_class: RouteClass::OpenOcean,
    }
}

/// Origin equals destination.
pub fn zero_distance_route() -> RouteData {
    RouteData {
        origin: PortCode::new("SGSIN"),
        destination: PortCode::new("SGSIN"),
        distance_nm: 0.0,
        estimated_hours: 0.0,
        waypoints: vec![Waypoint::new(1.26, 103.82)],
        route_class: RouteClass::Direct,
    }
}

fn port(code: &str, name: &str, location: Waypoint, along: f64, off: f64, supply: f64) -> BunkerPort {
    BunkerPort {
        code: PortCode::new(code),
        name: name.to_string(),
        location,
        distance_from_route_nm: off,
        distance_along_route_nm: along,
        available_fuels: vec![FuelType::Vlsfo, FuelType::Lsmgo],
        max_supply_mt: supply,
    }
}

/// Bunker ports along the reference route. Only Port Klang and Penang are
/// reachable on 100 MT.
pub fn route_ports() -> Vec<BunkerPort> {
    vec![
        port("MYPKG", "Port Klang", Waypoint::new(3.0, 101.4), 170.0, 8.0, 1000.0),
        port("MYPEN", "Penang", Waypoint::new(5.4, 100.3), 420.0, 60.0, 600.0),
        port("LKCMB", "Colombo", Waypoint::new(6.95, 79.85), 1350.0, 40.0, 1500.0),
        port("OMSOH", "Sohar", Waypoint::new(24.4, 56.7), 2850.0, 20.0, 800.0),
    ]
}

pub fn route_prices() -> PortPrices {
    let quote = |code: &str, fuel_type, price| PriceQuote {
        port: PortCode::new(code),
        fuel_type,
        price_usd_per_mt: price,
        quoted_at: departure(),
    };
    PortPrices {
        quotes: vec![
            quote("MYPKG", FuelType::Vlsfo, 612.0),
            quote("MYPKG", FuelType::Lsmgo, 780.0),
            quote("MYPEN", FuelType::Vlsfo, 605.0),
            quote("MYPEN", FuelType::Lsmgo, 795.0),
            quote("LKCMB", FuelType::Vlsfo, 598.0),
            quote("LKCMB", FuelType::Lsmgo, 770.0),
            quote("OMSOH", FuelType::Vlsfo, 590.0),
            quote("OMSOH", FuelType::Lsmgo, 760.0),
        ],
    }
}

/// A box around the approach to Fujairah, for compliance tests.
pub fn gulf_zone() -> EcaZone {
    EcaZone {
        name: ZoneName::new("Gulf of Oman test ECA"),
        min_lat: 24.0,
        max_lat: 26.0,
        min_lon: 55.0,
        max_lon: 58.0,
    }
}

pub fn base_request() -> VoyageRequest {
    VoyageRequest {
        origin: PortCode::new("SGSIN"),
        destination: PortCode::new("AEFJR"),
        vessel: Some(VesselName::new("MV Straits Trader")),
        query: "Plan SGSIN to Fujairah with weather and bunker options".to_string(),
        intent: Intent::FULL,
        departure: departure(),
        speed_knots: None,
    }
}

pub fn base_state() -> VoyageState {
    VoyageState::with_session(SessionId::new(), base_request())
}
