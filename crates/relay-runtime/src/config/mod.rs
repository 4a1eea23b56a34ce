//! Configuration for the relay runtime.
//!
//! Loading is figment-based (defaults, optional `relay.toml`, `RELAY_*`
//! environment variables); the schema lives in [`schema`] and cross-field
//! validation in [`loader::validate_config`].

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, validate_config};
pub use schema::{EngineConfig, LogFormat, LoggingConfig, RelayConfig, SpanEventPreset};
