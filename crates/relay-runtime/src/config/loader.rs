//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides via [`ConfigLoader::merge`]
//! 3. The config file (`relay.toml` in the working directory, or an
//!    explicit path; requires the `toml-config` feature)
//! 4. Environment variables (`RELAY_*`, with `__` as section separator:
//!    `RELAY_LOGGING__LEVEL=debug` → `logging.level = "debug"`)
//!
//! # Example
//!
//! ```rust,ignore
//! use relay_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//! let config = ConfigLoader::new().file("./conf/relay.toml").load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::RelayConfig;

/// Default config file name searched in the working directory.
#[cfg(feature = "toml-config")]
const DEFAULT_CONFIG_FILE: &str = "relay.toml";

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    config_file: Option<PathBuf>,
    load_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            config_file: None,
            load_env: true,
        }
    }

    /// Sets a specific configuration file to load. Missing explicit files
    /// are an error, unlike the default search which tolerates absence.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables the `RELAY_*` environment variable layer.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges programmatic overrides below file and environment layers.
    pub fn merge(mut self, config: RelayConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(self) -> ConfigResult<RelayConfig> {
        let figment = self.build_figment()?;
        let config: RelayConfig = figment.extract()?;
        validate_config(&config)?;
        debug!(
            level = %config.logging.level,
            drain_limit = config.engine.drain_limit_ticks,
            "configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment =
            Figment::from(Serialized::defaults(RelayConfig::default())).merge(self.figment);

        #[cfg(feature = "toml-config")]
        {
            if let Some(path) = &self.config_file {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                figment = figment.merge(Toml::file(path));
            } else {
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
            }
        }
        #[cfg(not(feature = "toml-config"))]
        if let Some(path) = &self.config_file {
            return Err(ConfigError::FileNotFound(path.clone()));
        }

        if self.load_env {
            figment = figment.merge(Env::prefixed("RELAY_").split("__"));
        }
        Ok(figment)
    }
}

/// Loads configuration from the default sources.
pub fn load_config() -> ConfigResult<RelayConfig> {
    ConfigLoader::new().load()
}

/// Checks cross-field constraints figment cannot express.
pub fn validate_config(config: &RelayConfig) -> ConfigResult<()> {
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::validation("logging.level must not be empty"));
    }
    if config.engine.drain_limit_ticks == 0 {
        return Err(ConfigError::validation(
            "engine.drain_limit_ticks must be at least 1, or `stopped` can never dispatch",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_sources() {
        let config = ConfigLoader::new().without_env().load().unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn programmatic_overrides_apply() {
        let mut overrides = RelayConfig::default();
        overrides.engine.idle_backoff_ms = 250;
        let config = ConfigLoader::new()
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();
        assert_eq!(config.engine.idle_backoff_ms, 250);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .without_env()
            .file("/definitely/not/here/relay.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn zero_drain_limit_is_rejected() {
        let mut config = RelayConfig::default();
        config.engine.drain_limit_ticks = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));
    }
}
