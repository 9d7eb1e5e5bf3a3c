use std::path::PathBuf;

use serde::Deserialize;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

/// Backing store settings. When `url` is absent the engine runs against
/// its in-memory stores, which is what tests and demos want.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            max_connections: 10,
        }
    }
}

/// Assessment engine behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker tasks draining the intake queue.
    pub workers: usize,
    /// Queue follow-on middleware assessments found during server scans.
    pub middleware_auto_scan: bool,
    /// Queue follow-on application assessments found during middleware
    /// scans.
    pub application_auto_scan: bool,
    /// Scratch space for unpacked archives and report staging.
    pub work_dir: PathBuf,
    /// Seconds to wait for a single remote command.
    pub command_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: 4,
            middleware_auto_scan: true,
            application_auto_scan: true,
            work_dir: PathBuf::from("./work"),
            command_timeout_secs: 300,
        }
    }
}

impl Config {
    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        if self.engine.workers == 0 {
            return Err(crate::ConfigError::Invalid(
                "engine.workers must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(crate::ConfigError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.engine.command_timeout_secs == 0 {
            return Err(crate::ConfigError::Invalid(
                "engine.command_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
