//! # relay-runtime
//!
//! Runtime orchestration for the relay component framework.
//!
//! The dispatch engine in `relay-core` is deliberately inert: it never
//! reads config, installs logging, listens for signals, or blocks on
//! I/O. This crate provides that ambient layer:
//!
//! - **Configuration** ([`config`]) — figment-based loading from
//!   `relay.toml` and `RELAY_*` environment variables, with validation.
//! - **Logging** ([`logging`]) — `tracing-subscriber` setup from config
//!   or the [`LoggingBuilder`].
//! - **Event sources** ([`source`]) — the [`EventSource`] trait for
//!   pollers, timers and transports that inject events on idle ticks.
//! - **The runtime loop** ([`runtime`]) — [`Runtime`] drives the engine,
//!   stops on ctrl-c, and performs the orderly shutdown sequence.
//!
//! ## Feature flags
//!
//! - `toml-config`: enables the `relay.toml` file layer.
//! - `json-log`: enables newline-delimited JSON log output.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod source;

pub use config::{ConfigError, ConfigLoader, RelayConfig, load_config};
pub use error::{RelayError, RelayResult};
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
pub use runtime::Runtime;
pub use source::EventSource;
