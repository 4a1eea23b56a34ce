//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Engine and run-loop settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directives (e.g. "info" or "relay=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for log lines.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to colorize output.
    #[serde(default = "default_ansi")]
    pub ansi: bool,

    /// Which span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventPreset,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            ansi: default_ansi(),
            span_events: SpanEventPreset::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ansi() -> bool {
    true
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default human-readable format.
    #[default]
    Full,
    /// Condensed single-line format.
    Compact,
    /// Multi-line, indented format.
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Named presets for span lifecycle logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanEventPreset {
    /// No span events.
    #[default]
    None,
    /// Span creation and close only.
    Lifecycle,
    /// Enter and exit only.
    Active,
    /// Every span event.
    Full,
}

/// Engine and run-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of ticks spent draining the queue after the stop
    /// signal, so `stopped` and in-flight events still dispatch.
    #[serde(default = "default_drain_limit_ticks")]
    pub drain_limit_ticks: usize,

    /// How long an idle run loop sleeps before polling event sources
    /// again, in milliseconds.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drain_limit_ticks: default_drain_limit_ticks(),
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

fn default_drain_limit_ticks() -> usize {
    64
}

fn default_idle_backoff_ms() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = RelayConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Full);
        assert!(config.logging.ansi);
        assert_eq!(config.logging.span_events, SpanEventPreset::None);
        assert_eq!(config.engine.drain_limit_ticks, 64);
        assert_eq!(config.engine.idle_backoff_ms, 10);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: RelayConfig =
            serde_json::from_str(r#"{"logging": {"level": "debug"}}"#).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.engine.drain_limit_ticks, 64);
    }
}
