//! rsyncit service: keeps an rsync-servable copy of an RRDP repository.
//!
//! This crate wires the fetcher and publisher together:
//! - Periodic sync cycles with an overlap guard
//! - Prometheus metrics
//! - Status, health and config endpoints

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod sync;

pub use error::ApiError;
pub use routes::create_router;
pub use scheduler::spawn_scheduler;
pub use state::AppState;
pub use sync::{SyncOutcome, SyncService};
