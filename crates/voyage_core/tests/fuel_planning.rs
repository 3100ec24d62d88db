//! Integration test: route → compliance → segments → ledger → bunker planner
//! on the Singapore–Fujairah reference voyage.

use voyage_core::test_fixtures::{
    gulf_zone, route_ports, route_prices, sgsin_aefjr_route, test_vessel, zero_distance_route,
};
use voyage_core::*;

fn planner_input<'a>(
    vessel: &'a VesselProfile,
    ports: &'a [BunkerPort],
    prices: &'a PortPrices,
    consumption: FuelQuantities,
) -> PlannerInput<'a> {
    let policy = Policy::default();
    let route = sgsin_aefjr_route();
    PlannerInput {
        voyage_consumption: consumption,
        vessel,
        ports,
        prices,
        weather_factor: 1.0,
        safety_margin_days: policy.safety_margin_days,
        force_multi_stop: false,
        max_stops: policy.bunker_max_stops,
        candidate_limit: policy.bunker_candidate_limit,
        route_distance_nm: route.distance_nm,
        speed_knots: route.effective_speed_knots(vessel.speed_knots),
    }
}

#[test]
fn test_reference_voyage_is_unsafe_without_bunkering() {
    let route = sgsin_aefjr_route();
    let vessel = test_vessel();
    let segments = segment_route(&route, None);
    let report = rob::simulate(&LedgerInput {
        route: &route,
        weather: None,
        vessel: &vessel,
        bunker: None,
        segments: &segments,
        safety_margin_days: 3.0,
    })
    .unwrap();

    assert!(!report.overall_safe);
    assert!((report.final_rob.vlsfo - -215.0).abs() < 1e-6, "got {}", report.final_rob.vlsfo);
    // No ECA on this leg: LSMGO is never touched.
    assert!((report.final_rob.lsmgo - 50.0).abs() < 1e-9);
    assert_eq!(report.minimum_rob_location, "AEFJR");
}

#[test]
fn test_single_stop_covers_shortfall_and_makes_voyage_safe() {
    let route = sgsin_aefjr_route();
    let vessel = test_vessel();
    let ports = route_ports();
    let prices = route_prices();
    let segments = segment_route(&route, None);
    let speed = route.effective_speed_knots(vessel.speed_knots);
    let consumption = rob::voyage_consumption(&route, &segments, &vessel, speed);
    assert!((consumption.vlsfo - 315.0).abs() < 1e-6);

    let input = planner_input(&vessel, &ports, &prices, consumption);
    let analysis = bunker::rank_single_stops(&input);
    assert!((analysis.requirement.shortfall.vlsfo - 320.0).abs() < 1e-6);
    let best = analysis.best_covering().expect("Port Klang can cover the shortfall");
    assert_eq!(best.port, PortCode::new("MYPKG"));
    assert!(analysis
        .recommendations
        .iter()
        .all(|r| r.port.as_str() != "LKCMB" && r.port.as_str() != "OMSOH"));

    let outcome = bunker::plan(&input);
    assert!(!outcome.required);
    assert!(outcome.best_plan.is_none());

    let event = BunkerEvent {
        port: best.port.clone(),
        location: best.location,
        quantities: best.quantities,
    };
    let report = rob::simulate(&LedgerInput {
        route: &route,
        weather: None,
        vessel: &vessel,
        bunker: Some(&event),
        segments: &segments,
        safety_margin_days: 3.0,
    })
    .unwrap();
    assert!(report.overall_safe, "warnings: {:?}", report.warnings);
    assert!(report.waypoints[1].bunkered);
    assert!((report.final_rob.vlsfo - 105.0).abs() < 1e-6);
}

#[test]
fn test_limited_supply_flags_multi_stop() {
    let route = sgsin_aefjr_route();
    let vessel = test_vessel();
    let mut ports = route_ports();
    for port in &mut ports {
        port.max_supply_mt = 200.0;
    }
    let prices = route_prices();
    let segments = segment_route(&route, None);
    let speed = route.effective_speed_knots(vessel.speed_knots);
    let consumption = rob::voyage_consumption(&route, &segments, &vessel, speed);
    let input = planner_input(&vessel, &ports, &prices, consumption);

    assert!(bunker::rank_single_stops(&input).best_covering().is_none());
    let outcome = bunker::plan(&input);
    assert!(outcome.required);
    let best = outcome.best_plan.expect("Port Klang and Penang together cover it");
    assert!(best.stops.len() > 1);
    for stop in &best.stops {
        assert!(stop.departure_rob.vlsfo <= vessel.capacity.vlsfo + 1e-9);
        assert!(stop.arrival_rob.vlsfo >= -1e-9);
    }
}

#[test]
fn test_eca_crossing_burns_lsmgo_through_the_chain() {
    let route = sgsin_aefjr_route();
    let vessel = test_vessel();
    let speed = route.effective_speed_knots(vessel.speed_knots);
    let compliance = assess_compliance(&route, &[gulf_zone()], &vessel, speed, 0.1);
    assert_eq!(compliance.zones_crossed, vec![gulf_zone().name]);
    assert!(compliance.total_eca_distance_nm > 0.0);

    let segments = segment_route(&route, Some(&compliance));
    let total: f64 = segments.iter().map(|s| s.distance_nm).sum();
    assert!((total - route.distance_nm).abs() < 1e-6);
    assert!(segments.last().unwrap().in_eca);

    let report = rob::simulate(&LedgerInput {
        route: &route,
        weather: None,
        vessel: &vessel,
        bunker: None,
        segments: &segments,
        safety_margin_days: 3.0,
    })
    .unwrap();
    let burned_days = (100.0 - report.final_rob.vlsfo) / 35.0 + (50.0 - report.final_rob.lsmgo) / 4.0;
    assert!((burned_days - 9.0).abs() < 1e-6);
    assert!(report.final_rob.lsmgo < 50.0);
}

#[test]
fn test_zero_distance_route_is_degenerate_but_valid() {
    let route = zero_distance_route();
    let vessel = test_vessel();
    let segments = segment_route(&route, None);
    assert_eq!(segments.len(), 1);
    assert!(segments[0].distance_nm.abs() < 1e-12);

    let report = rob::simulate(&LedgerInput {
        route: &route,
        weather: None,
        vessel: &vessel,
        bunker: None,
        segments: &segments,
        safety_margin_days: 3.0,
    })
    .unwrap();
    assert_eq!(report.waypoints.len(), 1);
    assert_eq!(report.final_rob, vessel.initial_rob);
    assert!(report.overall_safe);
}
