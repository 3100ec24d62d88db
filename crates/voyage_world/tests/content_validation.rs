//! Loads the shipped `content/*.json` files and checks that the reference
//! data is internally consistent and usable for planning.

use std::sync::OnceLock;
use voyage_core::{FuelType, PortCode};
use voyage_world::{load_content, Content};

/// Integration tests run from the crate directory, so go up two levels.
fn content_dir() -> String {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    format!("{manifest}/../../content")
}

fn load_test_content() -> &'static Content {
    static CONTENT: OnceLock<Content> = OnceLock::new();
    CONTENT.get_or_init(|| {
        load_content(&content_dir()).expect("load_content should succeed for shipped content")
    })
}

#[test]
fn content_loads_successfully() {
    let content = load_test_content();
    assert!(!content.vessels.is_empty());
    assert!(!content.routes.is_empty());
}

#[test]
fn route_distances_and_durations_are_positive() {
    for route in &load_test_content().routes {
        assert!(
            route.distance_nm > 0.0 && route.estimated_hours > 0.0,
            "route {}->{} needs positive distance and duration",
            route.origin,
            route.destination
        );
        assert!(route.waypoints.len() >= 2);
    }
}

#[test]
fn every_price_belongs_to_a_bunker_port() {
    let content = load_test_content();
    for price in &content.prices {
        let port = content.port(&price.port).expect("validated above");
        assert!(
            port.is_bunker_port(),
            "port '{}' has prices but supplies no fuel",
            port.code
        );
        for fuel in FuelType::ALL {
            let quoted = match fuel {
                FuelType::Vlsfo => price.vlsfo,
                FuelType::Lsmgo => price.lsmgo,
            };
            if let Some(value) = quoted {
                assert!(value > 0.0, "non-positive {fuel} price at {}", price.port);
                assert!(
                    port.available_fuels.contains(&fuel),
                    "{fuel} priced at {} which does not supply it",
                    price.port
                );
            }
        }
    }
}

#[test]
fn reference_voyage_is_in_the_catalog() {
    let content = load_test_content();
    let route = content
        .route(&PortCode::new("SGSIN"), &PortCode::new("AEFJR"))
        .expect("SGSIN to AEFJR route");
    assert!((route.distance_nm - 3000.0).abs() < 1e-9);
    assert!(content.vessel_or_default(None).is_some());
}

#[test]
fn policy_matches_documented_defaults() {
    assert_eq!(load_test_content().policy, voyage_core::Policy::default());
}
