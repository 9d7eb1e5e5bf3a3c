//! Ports (interfaces) the orchestrator is wired against.
//!
//! Runner ports cover the per-domain scan components, store ports cover
//! persistence, and outbound ports cover side channels (report pipeline,
//! follow-on queue, notifications). Implementations live in `store` and in
//! the embedding application.

pub mod outbound;
pub mod remote;
pub mod runner;
pub mod store;
