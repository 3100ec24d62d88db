//! Emission control area geometry and fuel-switch detection.

use serde::{Deserialize, Serialize};

use crate::geo::{cumulative_distances, position_at};
use crate::{
    ComplianceData, FuelType, RouteData, SwitchAction, SwitchingPoint, VesselProfile, Waypoint,
    ZoneName,
};

/// Sampling step when walking the route for zone membership.
const SAMPLE_STEP_NM: f64 = 10.0;
const MAX_SAMPLES: usize = 50_000;

/// Rectangular approximation of an emission control area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcaZone {
    pub name: ZoneName,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl EcaZone {
    pub fn contains(&self, point: Waypoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

fn zone_at<'a>(zones: &'a [EcaZone], point: Waypoint) -> Option<&'a EcaZone> {
    zones.iter().find(|zone| zone.contains(point))
}

/// Walks the route and records where the vessel must switch to LSMGO.
///
/// A route starting inside a zone gets an `EnterEca` point at distance zero.
/// Required LSMGO covers the in-zone steaming time at the vessel's LSMGO
/// burn rate, plus `fuel_margin` (a fraction, 0.1 = 10 %).
pub fn assess_compliance(
    route: &RouteData,
    zones: &[EcaZone],
    vessel: &VesselProfile,
    speed_knots: f64,
    fuel_margin: f64,
) -> ComplianceData {
    let mut data = ComplianceData {
        zones_crossed: Vec::new(),
        total_eca_distance_nm: 0.0,
        required_lsmgo_mt: 0.0,
        switching_points: Vec::new(),
    };
    let total = route.distance_nm.max(0.0);
    if route.waypoints.len() < 2 || zones.is_empty() || total <= 0.0 {
        return data;
    }

    let cumulative = cumulative_distances(&route.waypoints, total);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((total / SAMPLE_STEP_NM).ceil() as usize).clamp(1, MAX_SAMPLES);
    let step_nm = total / steps as f64;

    let mut current: Option<&EcaZone> = None;
    for i in 0..=steps {
        let distance = step_nm * i as f64;
        let Some(position) = position_at(&route.waypoints, &cumulative, distance) else {
            break;
        };
        let zone = zone_at(zones, position);
        if zone.map(|z| &z.name) != current.map(|z| &z.name) {
            if let Some(left) = current {
                data.switching_points.push(SwitchingPoint {
                    distance_from_origin_nm: distance,
                    action: SwitchAction::ExitEca,
                    zone: left.name.clone(),
                    location: position,
                });
            }
            if let Some(entered) = zone {
                data.switching_points.push(SwitchingPoint {
                    distance_from_origin_nm: distance,
                    action: SwitchAction::EnterEca,
                    zone: entered.name.clone(),
                    location: position,
                });
                if !data.zones_crossed.contains(&entered.name) {
                    data.zones_crossed.push(entered.name.clone());
                }
            }
            current = zone;
        }
        if current.is_some() && i < steps {
            data.total_eca_distance_nm += step_nm;
        }
    }

    if speed_knots > 0.0 {
        let eca_days = data.total_eca_distance_nm / speed_knots / 24.0;
        data.required_lsmgo_mt =
            eca_days * vessel.burn_rate_per_day(FuelType::Lsmgo) * (1.0 + fuel_margin);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FuelQuantities, PortCode, RouteClass, VesselName};

    fn vessel() -> VesselProfile {
        VesselProfile {
            name: VesselName::new("test"),
            initial_rob: FuelQuantities::new(500.0, 100.0),
            capacity: FuelQuantities::new(1000.0, 200.0),
            consumption_per_day: FuelQuantities::new(30.0, 24.0),
            fouling_factor: 1.0,
            speed_knots: 12.0,
        }
    }

    fn box_zone(name: &str, min_lon: f64, max_lon: f64) -> EcaZone {
        EcaZone {
            name: ZoneName::new(name),
            min_lat: -5.0,
            max_lat: 5.0,
            min_lon,
            max_lon,
        }
    }

    fn equator_route(distance_nm: f64) -> RouteData {
        RouteData {
            origin: PortCode::new("AAAAA"),
            destination: PortCode::new("BBBBB"),
            distance_nm,
            estimated_hours: distance_nm / 12.0,
            waypoints: vec![Waypoint::new(0.0, 0.0), Waypoint::new(0.0, 10.0)],
            route_class: RouteClass::Direct,
        }
    }

    #[test]
    fn test_route_crossing_zone_gets_enter_and_exit() {
        let zones = [box_zone("Mid ECA", 4.0, 6.0)];
        let data = assess_compliance(&equator_route(1000.0), &zones, &vessel(), 12.0, 0.1);
        assert_eq!(data.zones_crossed, vec![ZoneName::new("Mid ECA")]);
        assert_eq!(data.switching_points.len(), 2);
        assert_eq!(data.switching_points[0].action, SwitchAction::EnterEca);
        assert_eq!(data.switching_points[1].action, SwitchAction::ExitEca);
        assert!((data.total_eca_distance_nm - 200.0).abs() < 20.0);
        // 200 nm at 12 kn is ~0.69 days at 24 MT/day, plus 10 %.
        assert!((data.required_lsmgo_mt - 200.0 / 12.0 / 24.0 * 24.0 * 1.1).abs() < 2.0);
    }

    #[test]
    fn test_route_starting_in_zone_enters_at_zero() {
        let zones = [box_zone("Port ECA", -1.0, 1.0)];
        let data = assess_compliance(&equator_route(1000.0), &zones, &vessel(), 12.0, 0.0);
        assert!(data.switching_points[0].distance_from_origin_nm.abs() < 1e-9);
        assert_eq!(data.switching_points[0].action, SwitchAction::EnterEca);
    }

    #[test]
    fn test_no_zones_means_no_switching() {
        let data = assess_compliance(&equator_route(1000.0), &[], &vessel(), 12.0, 0.1);
        assert!(data.switching_points.is_empty());
        assert!(data.total_eca_distance_nm.abs() < 1e-9);
    }
}
