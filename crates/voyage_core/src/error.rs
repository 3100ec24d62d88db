use thiserror::Error;

use crate::{FuelType, Stage};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    #[error("route has no waypoints")]
    NoWaypoints,
    #[error("speed must be positive, got {0} kn")]
    InvalidSpeed(f64),
    #[error("sampling interval must be positive, got {0} h")]
    InvalidInterval(f64),
}

/// Vessel or route configuration the fuel ledger cannot simulate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("{fuel} initial ROB {rob:.1} MT exceeds tank capacity {capacity:.1} MT")]
    InitialRobAboveCapacity {
        fuel: FuelType,
        rob: f64,
        capacity: f64,
    },
    #[error("{fuel} consumption rate must not be negative, got {rate} MT/day")]
    NegativeConsumption { fuel: FuelType, rate: f64 },
    #[error("speed must be positive for a {distance_nm:.1} nm route, got {speed_knots} kn")]
    InvalidSpeed { distance_nm: f64, speed_knots: f64 },
    #[error("bunker quantity must not be negative, got {quantity} MT of {fuel}")]
    NegativeBunkerQuantity { fuel: FuelType, quantity: f64 },
}

/// The voyage state would become internally inconsistent. Terminates the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("route already set ({existing}); refusing to replace it with {proposed}")]
    RouteReassigned { existing: String, proposed: String },
    #[error("update is based on state version {update} but the state is already at {current}")]
    StaleUpdate { update: u64, current: u64 },
    #[error("stage {0} reported success without producing any of its outputs")]
    EmptySuccess(Stage),
}
