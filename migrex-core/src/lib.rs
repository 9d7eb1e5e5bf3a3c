//! # Migrex Core
//!
//! Core library for the Migrex assessment engine, providing the scan
//! pipeline, discovery-graph merge rules, and monitoring ingestion for IT
//! migration assessment.
//!
//! ## Overview
//!
//! `migrex-core` is the foundation of the Migrex ecosystem, offering:
//!
//! - **Assessment Orchestration**: One pipeline driving server, middleware,
//!   database, and application scans through resolve, execute, post-process,
//!   and commit
//! - **Discovery Graph**: Merge rules that fold scan findings into shared
//!   instance and interface rows without duplicating or clobbering
//! - **Component Registry**: Detail-type keyed scan runners with
//!   version-specific overrides
//! - **Remote Abstraction**: Trait seams over SSH and WinRM command
//!   execution, kept free of credential persistence
//! - **Monitoring Ingestion**: Agent-pushed usage samples aggregated into
//!   per-window rows, plus network-relation discovery
//! - **Store Backends**: Trait-based persistence with Postgres and
//!   in-memory implementations
//!
//! ## Feature Flags
//!
//! - `database`: Enables the Postgres store and embedded migrations (SQLx)
//!
//! ## Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`orchestrator`]: Pipeline core, domain orchestrators, and the work
//!   dispatcher
//! - [`merge`]: Discovery-graph merge rules and JDBC URL parsing
//! - [`ports`]: Traits implemented by scan runners, remote executors,
//!   stores, and outbound effects
//! - [`store`]: Persistence backends
//! - [`monitor`]: Monitoring sample ingestion and aggregation
//! - [`matrix`]: Support matrix deciding which targets are scannable
//!
//! ## Examples
//!
//! ```
//! use migrex_core::merge::jdbc;
//!
//! let endpoints = jdbc::parse("jdbc:mysql://10.0.0.5:3306/orders");
//! assert_eq!(endpoints.len(), 1);
//! assert_eq!(endpoints[0].detail_division(), "3306|orders");
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Cooperative cancellation registry shared between the API and running scans
pub mod cancel;

/// Commit step: snapshot persistence and report triggering
pub mod committer;

/// Per-run status and message accumulation
pub mod context;

/// Error types and error handling utilities
pub mod error;

/// Support matrix deciding which OS, middleware, and database versions are scannable
pub mod matrix;

/// Discovery-graph merge rules and JDBC URL parsing
pub mod merge;

/// Monitoring ingestion: usage windows and network-relation discovery
pub mod monitor;

/// Assessment pipeline, domain orchestrators, and the work dispatcher
pub mod orchestrator;

/// Trait seams for scan runners, remote execution, stores, and outbound effects
pub mod ports;

/// Detail-type keyed component registry with version-specific overrides
pub mod registry;

/// Engine settings
pub mod settings;

/// Store backends implementing the persistence ports
pub mod store;

/// Version number parsing and comparison
pub mod version;

#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{AssessError, Result};
