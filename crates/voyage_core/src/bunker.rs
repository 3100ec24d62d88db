//! Bunker planner: single-stop ranking and multi-stop sequences.
//!
//! Fuel burn is treated as uniform along the route, so the level on arrival
//! at a port depends only on how far along the route it lies. Stops are
//! always visited in route order.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{BunkerPort, FuelQuantities, FuelType, PortCode, PortPrices, VesselProfile, Waypoint};

const EPS: f64 = 1e-9;
/// Plans kept in the outcome after ranking.
const MAX_REPORTED_PLANS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct PlannerInput<'a> {
    /// Calm-water fuel needed for the whole voyage.
    pub voyage_consumption: FuelQuantities,
    pub vessel: &'a VesselProfile,
    pub ports: &'a [BunkerPort],
    pub prices: &'a PortPrices,
    /// Multiplier on `voyage_consumption`; 1.0 without a weather estimate.
    pub weather_factor: f64,
    pub safety_margin_days: f64,
    /// Plan multi-stop sequences even when a single stop covers the shortfall.
    /// Without a shortfall there is nothing to buy and the flag has no effect.
    pub force_multi_stop: bool,
    pub max_stops: usize,
    pub candidate_limit: usize,
    pub route_distance_nm: f64,
    pub speed_knots: f64,
}

/// Voyage need, safety reserve and the resulting shortfall against the fuel
/// currently on board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelRequirement {
    pub need: FuelQuantities,
    pub reserve: FuelQuantities,
    pub shortfall: FuelQuantities,
}

impl FuelRequirement {
    pub fn has_shortfall(&self) -> bool {
        self.shortfall.total() > EPS
    }
}

pub fn requirement(input: &PlannerInput<'_>) -> FuelRequirement {
    let factor = input.weather_factor.max(0.0);
    let need = input.voyage_consumption.map(|_, v| v.max(0.0) * factor);
    let reserve = need.map(|fuel, n| {
        if n > EPS {
            input.vessel.burn_rate_per_day(fuel) * input.safety_margin_days.max(0.0)
        } else {
            0.0
        }
    });
    let shortfall = (need + reserve)
        .zip_with(input.vessel.initial_rob, |_, required, rob| (required - rob).max(0.0));
    FuelRequirement {
        need,
        reserve,
        shortfall,
    }
}

// ---------------------------------------------------------------------------
// Single stop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerRecommendation {
    pub rank: usize,
    pub port: PortCode,
    pub port_name: String,
    pub location: Waypoint,
    pub distance_along_route_nm: f64,
    pub quantities: FuelQuantities,
    pub fuel_cost_usd: f64,
    pub deviation_cost_usd: f64,
    pub total_cost_usd: f64,
    pub covers_shortfall: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerAnalysis {
    pub requirement: FuelRequirement,
    /// Covering recommendations first, then ascending total cost.
    pub recommendations: Vec<BunkerRecommendation>,
}

impl BunkerAnalysis {
    pub fn best(&self) -> Option<&BunkerRecommendation> {
        self.recommendations.first()
    }

    pub fn best_covering(&self) -> Option<&BunkerRecommendation> {
        self.best().filter(|r| r.covers_shortfall)
    }
}

/// Ranks every reachable port for a single bunkering of the shortfall.
pub fn rank_single_stops(input: &PlannerInput<'_>) -> BunkerAnalysis {
    let requirement = requirement(input);
    let mut recommendations = Vec::new();
    if requirement.has_shortfall() {
        let model = Model::new(input, &requirement);
        for port in input.ports {
            if let Some(recommendation) = model.single_stop(port) {
                recommendations.push(recommendation);
            }
        }
    }
    recommendations.sort_by(|a, b| {
        b.covers_shortfall
            .cmp(&a.covers_shortfall)
            .then(a.total_cost_usd.total_cmp(&b.total_cost_usd))
            .then_with(|| a.port.cmp(&b.port))
    });
    for (i, recommendation) in recommendations.iter_mut().enumerate() {
        recommendation.rank = i + 1;
    }
    BunkerAnalysis {
        requirement,
        recommendations,
    }
}

// ---------------------------------------------------------------------------
// Multi stop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerStop {
    pub port: PortCode,
    pub port_name: String,
    pub distance_along_route_nm: f64,
    pub quantities: FuelQuantities,
    pub arrival_rob: FuelQuantities,
    pub departure_rob: FuelQuantities,
    pub fuel_cost_usd: f64,
    pub deviation_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerPlan {
    pub stops: SmallVec<[BunkerStop; 3]>,
    pub fuel_cost_usd: f64,
    pub deviation_cost_usd: f64,
    pub total_cost_usd: f64,
    pub arrival_rob: FuelQuantities,
    pub feasible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BunkerPlanOutcome {
    pub required: bool,
    pub requirement: FuelRequirement,
    /// Feasible plans first, each group by ascending total cost.
    pub plans: Vec<BunkerPlan>,
    pub best_plan: Option<BunkerPlan>,
    pub error: Option<String>,
}

/// Decides whether the voyage needs more than one bunker stop and, if so,
/// ranks the candidate sequences.
pub fn plan(input: &PlannerInput<'_>) -> BunkerPlanOutcome {
    let requirement = requirement(input);
    let model = Model::new(input, &requirement);
    let single_covers = input
        .ports
        .iter()
        .filter_map(|port| model.single_stop(port))
        .any(|r| r.covers_shortfall);
    let required = requirement.has_shortfall() && (input.force_multi_stop || !single_covers);

    let mut outcome = BunkerPlanOutcome {
        required,
        requirement,
        plans: Vec::new(),
        best_plan: None,
        error: None,
    };
    if !required {
        return outcome;
    }

    let candidates = model.candidates();
    let max_stops = input.max_stops.min(candidates.len());
    if max_stops < 2 {
        outcome.error = Some(format!(
            "{} candidate port(s) with prices along the route; a multi-stop plan needs at least two",
            candidates.len()
        ));
        return outcome;
    }

    let mut plans: Vec<BunkerPlan> = (2..=max_stops)
        .flat_map(|k| combinations(candidates.len(), k))
        .map(|picks| {
            let stops: Vec<&BunkerPort> = picks.iter().map(|&i| candidates[i]).collect();
            model.sequence(&stops)
        })
        .collect();
    plans.sort_by(|a, b| {
        b.feasible
            .cmp(&a.feasible)
            .then(a.total_cost_usd.total_cmp(&b.total_cost_usd))
    });
    plans.truncate(MAX_REPORTED_PLANS);

    outcome.best_plan = plans.iter().find(|p| p.feasible).cloned();
    if outcome.best_plan.is_none() {
        outcome.error = Some(format!(
            "no sequence of 2 to {max_stops} stops keeps fuel between empty and capacity and covers the voyage"
        ));
    }
    outcome.plans = plans;
    outcome
}

/// Index combinations of size `k` from `0..n`, each in ascending order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, n: usize, k: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            extend(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    if k > 0 && k <= n {
        extend(0, n, k, &mut Vec::with_capacity(k), &mut out);
    }
    out
}

// ---------------------------------------------------------------------------
// Shared cost model
// ---------------------------------------------------------------------------

struct Model<'a> {
    input: &'a PlannerInput<'a>,
    requirement: &'a FuelRequirement,
    total_nm: f64,
    burn_per_nm: FuelQuantities,
}

impl<'a> Model<'a> {
    fn new(input: &'a PlannerInput<'a>, requirement: &'a FuelRequirement) -> Self {
        let total_nm = input.route_distance_nm.max(0.0);
        let burn_per_nm = if total_nm > EPS {
            requirement.need.map(|_, n| n / total_nm)
        } else {
            FuelQuantities::ZERO
        };
        Self {
            input,
            requirement,
            total_nm,
            burn_per_nm,
        }
    }

    fn along(&self, port: &BunkerPort) -> f64 {
        port.distance_along_route_nm.clamp(0.0, self.total_nm)
    }

    fn burn_over(&self, nm: f64) -> FuelQuantities {
        self.burn_per_nm.map(|_, rate| rate * nm.max(0.0))
    }

    /// Price of `fuel` at `port`, only when the port both sells and quotes it.
    fn price(&self, port: &BunkerPort, fuel: FuelType) -> Option<f64> {
        if port.supplies(fuel) {
            self.input.prices.price(&port.code, fuel)
        } else {
            None
        }
    }

    /// Fuel burned steaming off the route to the port and back, at the
    /// port's primary-fuel price (or its cheapest quote).
    fn deviation_cost(&self, port: &BunkerPort) -> f64 {
        let speed = self.input.speed_knots;
        if speed <= 0.0 || port.distance_from_route_nm <= 0.0 {
            return 0.0;
        }
        let extra_days = 2.0 * port.distance_from_route_nm / speed / 24.0;
        let fuel_mt = extra_days * self.input.vessel.burn_rate_per_day(FuelType::Vlsfo);
        let price = self.price(port, FuelType::Vlsfo).or_else(|| {
            FuelType::ALL
                .into_iter()
                .filter_map(|fuel| self.price(port, fuel))
                .min_by(f64::total_cmp)
        });
        fuel_mt * price.unwrap_or(0.0)
    }

    fn fuel_cost(&self, port: &BunkerPort, quantities: FuelQuantities) -> f64 {
        FuelType::ALL
            .into_iter()
            .filter_map(|fuel| self.price(port, fuel).map(|p| p * quantities.get(fuel)))
            .sum()
    }

    fn single_stop(&self, port: &BunkerPort) -> Option<BunkerRecommendation> {
        let vessel = self.input.vessel;
        let arrival = vessel.initial_rob - self.burn_over(self.along(port));
        if FuelType::ALL.iter().any(|f| arrival.get(*f) < -EPS) {
            return None;
        }
        let shortfall = self.requirement.shortfall;
        let quantities = FuelQuantities::ZERO.map(|fuel, _| {
            if shortfall.get(fuel) <= EPS || self.price(port, fuel).is_none() {
                return 0.0;
            }
            let room = (vessel.capacity.get(fuel) - arrival.get(fuel)).max(0.0);
            shortfall.get(fuel).min(room).min(port.max_supply_mt.max(0.0))
        });
        if quantities.total() <= EPS {
            return None;
        }
        let covers_shortfall = FuelType::ALL
            .iter()
            .all(|f| quantities.get(*f) + EPS >= shortfall.get(*f));
        let fuel_cost_usd = self.fuel_cost(port, quantities);
        let deviation_cost_usd = self.deviation_cost(port);
        Some(BunkerRecommendation {
            rank: 0,
            port: port.code.clone(),
            port_name: port.name.clone(),
            location: port.location,
            distance_along_route_nm: port.distance_along_route_nm,
            quantities,
            fuel_cost_usd,
            deviation_cost_usd,
            total_cost_usd: fuel_cost_usd + deviation_cost_usd,
            covers_shortfall,
        })
    }

    /// Ports on the route that price a short fuel, cheapest first up to the
    /// candidate limit, returned in route order.
    fn candidates(&self) -> Vec<&'a BunkerPort> {
        let short: Vec<FuelType> = self.requirement.shortfall.positive_fuels();
        let cheapest = |port: &BunkerPort| {
            short
                .iter()
                .filter_map(|fuel| self.price(port, *fuel))
                .min_by(f64::total_cmp)
        };
        let mut priced: Vec<(&'a BunkerPort, f64)> = self
            .input
            .ports
            .iter()
            .filter(|p| p.distance_along_route_nm >= 0.0 && p.distance_along_route_nm <= self.total_nm + EPS)
            .filter_map(|p| cheapest(p).map(|price| (p, price)))
            .collect();
        priced.sort_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then(a.0.distance_from_route_nm.total_cmp(&b.0.distance_from_route_nm))
        });
        priced.truncate(self.input.candidate_limit);

        let mut ports: Vec<&'a BunkerPort> = priced.into_iter().map(|(p, _)| p).collect();
        ports.sort_by(|a, b| {
            a.distance_along_route_nm
                .total_cmp(&b.distance_along_route_nm)
                .then_with(|| a.code.cmp(&b.code))
        });
        ports
    }

    /// Simulates one route-ordered sequence with a cheapest-ahead fill. When
    /// a later stop sells the fuel cheaper, take only enough to reach the next
    /// stop with the reserve intact (more if later stops cannot supply the
    /// rest); otherwise fill up to the remaining need.
    fn sequence(&self, stops: &[&BunkerPort]) -> BunkerPlan {
        let vessel = self.input.vessel;
        let reserve = self.requirement.reserve;
        let mut rob = vessel.initial_rob;
        let mut position = 0.0;
        let mut feasible = true;
        let mut planned: SmallVec<[BunkerStop; 3]> = SmallVec::new();

        for (i, port) in stops.iter().enumerate() {
            let at = self.along(port).max(position);
            let arrival = rob - self.burn_over(at - position);
            if FuelType::ALL.iter().any(|f| arrival.get(*f) < -EPS) {
                feasible = false;
            }
            let later = &stops[i + 1..];
            let next_at = later.first().map_or(self.total_nm, |p| self.along(p).max(at));
            let remaining = self.burn_over(self.total_nm - at) + reserve;

            let take = FuelQuantities::ZERO.map(|fuel, _| {
                let Some(price) = self.price(port, fuel) else {
                    return 0.0;
                };
                let later_supply: f64 = later
                    .iter()
                    .filter(|p| self.price(p, fuel).is_some())
                    .map(|p| p.max_supply_mt.max(0.0))
                    .sum();
                let cheaper_ahead = later
                    .iter()
                    .any(|p| self.price(p, fuel).is_some_and(|q| q < price));
                let target = if cheaper_ahead {
                    let to_next = self.burn_over(next_at - at).get(fuel) + reserve.get(fuel);
                    to_next.max(remaining.get(fuel) - later_supply)
                } else {
                    remaining.get(fuel)
                };
                let room = (vessel.capacity.get(fuel) - arrival.get(fuel)).max(0.0);
                (target - arrival.get(fuel)).max(0.0).min(room).min(port.max_supply_mt.max(0.0))
            });
            if take.total() <= EPS {
                feasible = false;
            }
            let departure = arrival + take;
            if FuelType::ALL
                .iter()
                .any(|f| departure.get(*f) > vessel.capacity.get(*f) + EPS)
            {
                feasible = false;
            }

            planned.push(BunkerStop {
                port: port.code.clone(),
                port_name: port.name.clone(),
                distance_along_route_nm: port.distance_along_route_nm,
                quantities: take,
                arrival_rob: arrival,
                departure_rob: departure,
                fuel_cost_usd: self.fuel_cost(port, take),
                deviation_cost_usd: self.deviation_cost(port),
            });
            rob = departure;
            position = at;
        }

        let arrival_rob = rob - self.burn_over(self.total_nm - position);
        if FuelType::ALL
            .iter()
            .any(|f| arrival_rob.get(*f) + 1e-6 < reserve.get(*f))
        {
            feasible = false;
        }
        let fuel_cost_usd: f64 = planned.iter().map(|s| s.fuel_cost_usd).sum();
        let deviation_cost_usd: f64 = planned.iter().map(|s| s.deviation_cost_usd).sum();
        BunkerPlan {
            stops: planned,
            fuel_cost_usd,
            deviation_cost_usd,
            total_cost_usd: fuel_cost_usd + deviation_cost_usd,
            arrival_rob,
            feasible,
        }
    }
}
