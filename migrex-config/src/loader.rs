use std::path::Path;

use config::{Environment, File};
use tracing::debug;

use crate::models::Config;

/// Failures while assembling or checking configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration in layered order: built-in defaults, then an
/// optional file, then `MIGREX`-prefixed environment variables (double
/// underscore separates segments, e.g. `MIGREX__SERVER__PORT`).
pub fn load(config_file: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_file {
        debug!(path = %path.display(), "loading configuration file");
        builder = builder.add_source(File::from(path));
    } else {
        builder = builder.add_source(File::with_name("migrex").required(false));
    }

    builder = builder
        .add_source(Environment::with_prefix("MIGREX").separator("__"));

    let config: Config = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.engine.workers, 4);
        assert!(config.engine.middleware_auto_scan);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrex.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9001\n\n[engine]\nworkers = 2\nmiddleware_auto_scan = false\n"
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.engine.workers, 2);
        assert!(!config.engine.middleware_auto_scan);
        // Untouched sections keep their defaults.
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migrex.toml");
        std::fs::write(&path, "[engine]\nworkers = 0\n").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
