//! Assessment orchestration.
//!
//! One pipeline shape serves all four domains: validate the connection,
//! resolve a scan component, execute, post-process under the domain lock,
//! compute the final status, commit. The domain modules fill in what each
//! step means for their kind of target; [`WorkDispatcher`] wraps a run with
//! lifecycle bookkeeping and notifications.

mod application;
mod database;
mod dispatcher;
mod middleware;
mod pipeline;
mod server;

pub use dispatcher::WorkDispatcher;
pub use pipeline::{
    DomainLocks, DomainOutcome, PipelineCore, ScanComponents,
    INSUFFICIENT_CONNECTION_MESSAGE, SOFT_ERROR_MESSAGE,
};
