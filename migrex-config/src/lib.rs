//! Configuration loading for the Migrex assessment engine.
//!
//! Values layer in order: built-in defaults, an optional TOML file, then
//! `MIGREX`-prefixed environment variables.

mod loader;
mod models;

pub use loader::{ConfigError, load};
pub use models::{Config, DatabaseConfig, EngineConfig, ServerConfig};
