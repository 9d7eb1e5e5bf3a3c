//! Discovery-graph merge.
//!
//! Everything here folds scan findings into the shared graph: instance
//! upserts, interface replacement, JDBC endpoint extraction, and the
//! discovery of databases and servers nobody registered. The merge never
//! deletes knowledge an earlier scan recorded; it only refines it.

pub mod instance;
pub mod interface;
pub mod jdbc;
pub mod middleware;
pub mod text;
pub mod unknown_database;
pub mod unknown_server;
pub mod well_known;
