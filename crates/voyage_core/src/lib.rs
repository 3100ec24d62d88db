//! `voyage_core`: deterministic voyage planning engines.
//!
//! No IO, no clocks except where a caller passes timestamps in. Every engine
//! is a pure function over the types below.

pub mod breaker;
pub mod bunker;
mod eca;
mod error;
pub mod geo;
mod policy;
pub mod rob;
mod state;
mod timeline;
mod types;
pub mod weather;
mod zones;

pub use breaker::{guard, BreakerVerdict};
pub use bunker::{
    BunkerAnalysis, BunkerPlan, BunkerPlanOutcome, BunkerRecommendation, BunkerStop,
    FuelRequirement, PlannerInput,
};
pub use eca::{segment_route, RouteSegment};
pub use error::{LedgerError, StateError, TimelineError};
pub use policy::{Policy, TimeoutPolicy};
pub use rob::{BunkerEvent, LedgerInput, LedgerWarning, RobReport, RobTracking, RobWaypoint};
pub use state::{StateField, StateUpdate, VoyageState};
pub use timeline::sample_timeline;
pub use types::*;
pub use zones::{assess_compliance, EcaZone};

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
