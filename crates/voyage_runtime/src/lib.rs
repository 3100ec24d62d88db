//! `voyage_runtime`: async host for voyage planning sessions.
//!
//! Sessions are independent tasks. Within a session stages run one at a
//! time: the supervisor picks a stage, its worker calls the collaborators
//! under a timeout, and the partial update is merged before the next pick.

pub mod call;
pub mod collaborators;
mod error;
pub mod memo;
pub mod offline;
mod session;
pub mod workers;

pub use collaborators::{
    Collaborators, ExternalPlanner, PortService, PriceService, RouteService, WeatherService,
};
pub use error::CollaboratorError;
pub use session::{run_batch, Runtime, SessionOutcome};
pub use tokio_util::sync::CancellationToken;
