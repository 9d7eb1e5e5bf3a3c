//! # Migrex Server
//!
//! Service shell around the assessment engine: a thin HTTP intake API, a
//! bounded worker pool draining the submission queue, and ingestion
//! endpoints for monitoring feeds. All engine behavior lives in
//! `migrex-core`; this crate only wires it to the outside world.

pub mod assessment_handlers;
pub mod errors;
pub mod monitoring_handlers;
pub mod outbound;
pub mod remote;
pub mod routes;
pub mod state;
pub mod worker;

pub use errors::{ApiError, ApiResult};
pub use state::AppState;
