//! Fuel ledger: remaining-on-board simulation along the route.
//!
//! Trace points are the route waypoints placed at their great-circle
//! distance from origin, rescaled to the route distance. Between two trace
//! points the in-zone share of the distance burns LSMGO and the rest burns
//! VLSFO. Safety requires every level to stay non-negative and every consumed
//! fuel to keep `safety_margin_days` of burn in the tanks at every point after
//! departure.

use serde::{Deserialize, Serialize};

use crate::geo::{cumulative_distances, haversine_nm};
use crate::{
    FuelQuantities, FuelType, LedgerError, PortCode, RouteData, RouteSegment, VesselProfile,
    WeatherConsumption, Waypoint,
};

const EPS: f64 = 1e-9;
/// Slack on the margin check so a tank planned to hold exactly the reserve passes.
const MARGIN_TOLERANCE_DAYS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerEvent {
    pub port: PortCode,
    pub location: Waypoint,
    pub quantities: FuelQuantities,
}

#[derive(Debug, Clone, Copy)]
pub struct LedgerInput<'a> {
    pub route: &'a RouteData,
    pub weather: Option<&'a WeatherConsumption>,
    pub vessel: &'a VesselProfile,
    pub bunker: Option<&'a BunkerEvent>,
    /// Output of [`crate::segment_route`]. Empty means the whole route is open sea.
    pub segments: &'a [RouteSegment],
    pub safety_margin_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobWaypoint {
    pub index: usize,
    pub label: String,
    pub location: Option<Waypoint>,
    pub distance_from_origin_nm: f64,
    /// Level after any bunkering at this point.
    pub rob: FuelQuantities,
    /// Days of burn left for the tightest consumed fuel. `None` when the
    /// voyage burns nothing.
    pub margin_days: Option<f64>,
    pub bunkered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerWarning {
    BunkerClamped {
        fuel: FuelType,
        requested_mt: f64,
        accepted_mt: f64,
    },
    NegativeRob {
        at: String,
        fuel: FuelType,
        rob_mt: f64,
    },
    MarginBelowThreshold {
        at: String,
        fuel: FuelType,
        days: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobReport {
    pub waypoints: Vec<RobWaypoint>,
    pub final_rob: FuelQuantities,
    pub minimum_rob: FuelQuantities,
    /// Label of the trace point with the lowest total fuel on board.
    pub minimum_rob_location: String,
    pub overall_safe: bool,
    pub warnings: Vec<LedgerWarning>,
}

/// Ledger results with and without the chosen bunker stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobTracking {
    pub without_bunker: RobReport,
    pub with_bunker: Option<RobReport>,
    pub bunker_port: Option<PortCode>,
}

impl RobTracking {
    /// The verdict that applies to the voyage as planned.
    pub fn effective(&self) -> &RobReport {
        self.with_bunker.as_ref().unwrap_or(&self.without_bunker)
    }
}

struct TracePoint {
    label: String,
    location: Option<Waypoint>,
    distance: f64,
}

fn trace_points(route: &RouteData) -> Vec<TracePoint> {
    let total = route.distance_nm.max(0.0);
    let origin = TracePoint {
        label: route.origin.to_string(),
        location: route.waypoints.first().copied(),
        distance: 0.0,
    };
    if total <= EPS {
        return vec![origin];
    }
    if route.waypoints.len() < 2 {
        return vec![
            origin,
            TracePoint {
                label: route.destination.to_string(),
                location: route.waypoints.last().copied(),
                distance: total,
            },
        ];
    }

    let cumulative = cumulative_distances(&route.waypoints, total);
    let last = route.waypoints.len() - 1;
    route
        .waypoints
        .iter()
        .zip(cumulative)
        .enumerate()
        .map(|(i, (point, distance))| TracePoint {
            label: match i {
                0 => route.origin.to_string(),
                i if i == last => route.destination.to_string(),
                i => format!("WP{i}"),
            },
            location: Some(*point),
            distance,
        })
        .collect()
}

/// In-zone distance covered by the stretch `[from, to]`.
fn eca_overlap(segments: &[RouteSegment], from: f64, to: f64) -> f64 {
    segments
        .iter()
        .filter(|s| s.in_eca)
        .map(|s| (to.min(s.end_nm()) - from.max(s.start_nm)).max(0.0))
        .sum::<f64>()
        .min(to - from)
}

/// Calm-water burn for a stretch split into open-sea and in-zone distance.
fn burn(vessel: &VesselProfile, speed_knots: f64, open_nm: f64, eca_nm: f64) -> FuelQuantities {
    let days = |nm: f64| nm / speed_knots / 24.0;
    FuelQuantities::new(
        days(open_nm) * vessel.burn_rate_per_day(FuelType::Vlsfo),
        days(eca_nm) * vessel.burn_rate_per_day(FuelType::Lsmgo),
    )
}

/// Calm-water fuel needed for the whole route, per fuel type.
pub fn voyage_consumption(
    route: &RouteData,
    segments: &[RouteSegment],
    vessel: &VesselProfile,
    speed_knots: f64,
) -> FuelQuantities {
    let total = route.distance_nm.max(0.0);
    if total <= EPS || speed_knots <= 0.0 {
        return FuelQuantities::ZERO;
    }
    let eca = eca_overlap(segments, 0.0, total);
    burn(vessel, speed_knots, total - eca, eca)
}

fn validate(input: &LedgerInput<'_>, speed_knots: f64) -> Result<(), LedgerError> {
    let vessel = input.vessel;
    for fuel in FuelType::ALL {
        let rob = vessel.initial_rob.get(fuel);
        let capacity = vessel.capacity.get(fuel);
        if rob > capacity + EPS {
            return Err(LedgerError::InitialRobAboveCapacity { fuel, rob, capacity });
        }
        let rate = vessel.burn_rate_per_day(fuel);
        if rate < 0.0 {
            return Err(LedgerError::NegativeConsumption { fuel, rate });
        }
        if let Some(event) = input.bunker {
            let quantity = event.quantities.get(fuel);
            if quantity < 0.0 {
                return Err(LedgerError::NegativeBunkerQuantity { fuel, quantity });
            }
        }
    }
    let distance_nm = input.route.distance_nm;
    if distance_nm > EPS && (speed_knots.is_nan() || speed_knots <= 0.0) {
        return Err(LedgerError::InvalidSpeed {
            distance_nm,
            speed_knots,
        });
    }
    Ok(())
}

/// Adds the bunkered quantities, clamped to the free tank space.
fn take_bunker(
    rob: &mut FuelQuantities,
    vessel: &VesselProfile,
    event: &BunkerEvent,
    warnings: &mut Vec<LedgerWarning>,
) {
    for fuel in FuelType::ALL {
        let requested = event.quantities.get(fuel);
        let room = (vessel.capacity.get(fuel) - rob.get(fuel)).max(0.0);
        let accepted = requested.min(room);
        if requested > accepted + EPS {
            warnings.push(LedgerWarning::BunkerClamped {
                fuel,
                requested_mt: requested,
                accepted_mt: accepted,
            });
        }
        *rob.get_mut(fuel) += accepted;
    }
}

fn check_margin(
    point: &TracePoint,
    rob: FuelQuantities,
    consumed_fuels: &[FuelType],
    input: &LedgerInput<'_>,
    warnings: &mut Vec<LedgerWarning>,
) {
    for fuel in consumed_fuels {
        let days = rob.get(*fuel) / input.vessel.burn_rate_per_day(*fuel);
        if days + MARGIN_TOLERANCE_DAYS < input.safety_margin_days {
            warnings.push(LedgerWarning::MarginBelowThreshold {
                at: point.label.clone(),
                fuel: *fuel,
                days,
            });
        }
    }
}

/// Runs the ledger over the route.
pub fn simulate(input: &LedgerInput<'_>) -> Result<RobReport, LedgerError> {
    let vessel = input.vessel;
    let route = input.route;
    let speed = route.effective_speed_knots(vessel.speed_knots);
    validate(input, speed)?;

    let points = trace_points(route);
    let total = route.distance_nm.max(0.0);
    let extra_per_nm = input
        .weather
        .filter(|_| total > EPS)
        .map_or(0.0, |w| w.additional_fuel_mt.max(0.0) / total);
    let bunker_at = input.bunker.map(|event| nearest_point(&points, event.location));
    let consumed = voyage_consumption(route, input.segments, vessel, speed);
    let consumed_fuels: Vec<FuelType> = FuelType::ALL
        .into_iter()
        .filter(|fuel| consumed.get(*fuel) > EPS)
        .collect();

    let mut warnings = Vec::new();
    let mut trace = Vec::with_capacity(points.len());
    let mut rob = vessel.initial_rob;
    let mut previous = 0.0;

    for (index, point) in points.iter().enumerate() {
        let step = point.distance - previous;
        if step > EPS {
            let eca = eca_overlap(input.segments, previous, point.distance);
            let mut used = burn(vessel, speed, step - eca, eca);
            // Weather surcharge follows the step's time share, split by fuel in
            // proportion to distance burned on each.
            let extra = extra_per_nm * step;
            used.vlsfo += extra * (step - eca) / step;
            used.lsmgo += extra * eca / step;
            rob = rob - used;
        }
        previous = point.distance.max(previous);

        for fuel in FuelType::ALL {
            if rob.get(fuel) < -EPS {
                warnings.push(LedgerWarning::NegativeRob {
                    at: point.label.clone(),
                    fuel,
                    rob_mt: rob.get(fuel),
                });
            }
        }

        let bunkered = bunker_at == Some(index);
        if let (true, Some(event)) = (bunkered, input.bunker) {
            take_bunker(&mut rob, vessel, event, &mut warnings);
        }

        let margin_days = consumed_fuels
            .iter()
            .map(|fuel| rob.get(*fuel) / vessel.burn_rate_per_day(*fuel))
            .min_by(f64::total_cmp);
        if index > 0 {
            check_margin(point, rob, &consumed_fuels, input, &mut warnings);
        }

        trace.push(RobWaypoint {
            index,
            label: point.label.clone(),
            location: point.location,
            distance_from_origin_nm: point.distance,
            rob,
            margin_days,
            bunkered,
        });
    }

    let overall_safe = !warnings.iter().any(|w| {
        matches!(
            w,
            LedgerWarning::NegativeRob { .. } | LedgerWarning::MarginBelowThreshold { .. }
        )
    });
    let minimum_rob = trace
        .iter()
        .fold(vessel.initial_rob, |min, wp| min.zip_with(wp.rob, |_, a, b| a.min(b)));
    let minimum_rob_location = trace
        .iter()
        .min_by(|a, b| a.rob.total().total_cmp(&b.rob.total()))
        .map(|wp| wp.label.clone())
        .unwrap_or_default();

    Ok(RobReport {
        final_rob: rob,
        minimum_rob,
        minimum_rob_location,
        overall_safe,
        warnings,
        waypoints: trace,
    })
}

fn nearest_point(points: &[TracePoint], target: Waypoint) -> usize {
    points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.location.map(|loc| (i, haversine_nm(loc, target))))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(i, _)| i)
}
