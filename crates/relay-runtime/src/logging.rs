//! Logging utilities for the relay runtime.
//!
//! This module provides a unified logging setup using `tracing` and
//! `tracing-subscriber`, driven either by a [`LoggingConfig`] or by the
//! [`LoggingBuilder`] directly. Span events make the engine's per-event
//! `dispatch` spans visible when debugging handler chains.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use relay_runtime::config::load_config;
//! use relay_runtime::logging;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use relay_runtime::logging::{LoggingBuilder, SpanEvents};
//!
//! LoggingBuilder::new()
//!     .directive("relay=debug")
//!     .span_events(SpanEvents::LIFECYCLE)
//!     .init();
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig, SpanEventPreset};

/// Span event configuration for logging.
///
/// Controls when span lifecycle events are logged, which is useful for
/// following an event through `dispatch` without adding handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanEvents {
    /// Log when a span is created.
    pub new: bool,
    /// Log when a span is entered.
    pub enter: bool,
    /// Log when a span is exited.
    pub exit: bool,
    /// Log when a span is closed (dropped).
    pub close: bool,
}

impl SpanEvents {
    /// No span events will be logged.
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Log span creation and close events.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    /// Log only enter and exit events.
    pub const ACTIVE: Self = Self {
        new: false,
        enter: true,
        exit: true,
        close: false,
    };

    /// Log all span events (new, enter, exit, close).
    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    /// Convert to `tracing_subscriber::fmt::format::FmtSpan` flags.
    fn to_fmt_span(self) -> fmt::format::FmtSpan {
        let mut span = fmt::format::FmtSpan::NONE;
        if self.new {
            span |= fmt::format::FmtSpan::NEW;
        }
        if self.enter {
            span |= fmt::format::FmtSpan::ENTER;
        }
        if self.exit {
            span |= fmt::format::FmtSpan::EXIT;
        }
        if self.close {
            span |= fmt::format::FmtSpan::CLOSE;
        }
        span
    }
}

impl From<SpanEventPreset> for SpanEvents {
    fn from(preset: SpanEventPreset) -> Self {
        match preset {
            SpanEventPreset::None => Self::NONE,
            SpanEventPreset::Lifecycle => Self::LIFECYCLE,
            SpanEventPreset::Active => Self::ACTIVE,
            SpanEventPreset::Full => Self::FULL,
        }
    }
}

// =============================================================================
// Configuration-Based Initialization
// =============================================================================

/// Initializes logging from a [`LoggingConfig`].
///
/// Safe to call more than once: a subscriber that is already installed
/// wins and the call becomes a no-op.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// A builder for configuring the tracing subscriber.
///
/// The `RUST_LOG` environment variable, when set, overrides the built
/// filter directives.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    span_events: SpanEvents,
    format: LogFormat,
    ansi: bool,
}

impl LoggingBuilder {
    /// Creates a builder with the `info` level, full format, ANSI colors.
    pub fn new() -> Self {
        Self {
            directives: vec!["info".to_string()],
            span_events: SpanEvents::NONE,
            format: LogFormat::Full,
            ansi: true,
        }
    }

    /// Creates a builder mirroring a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            directives: vec![config.level.clone()],
            span_events: SpanEvents::from(config.span_events),
            format: config.format,
            ansi: config.ansi,
        }
    }

    /// Adds a filter directive, e.g. `"relay_core=debug"`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Configures span lifecycle logging.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    /// Sets the log line format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables ANSI colors.
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Builds the `EnvFilter` from directives, honoring `RUST_LOG`.
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directives.join(",")))
    }

    /// Installs the subscriber, ignoring an already-installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, reporting an already-installed one.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.env_filter();
        let layer = fmt::layer()
            .with_ansi(self.ansi)
            .with_span_events(self.span_events.to_fmt_span());

        let registry = tracing_subscriber::registry().with(filter);
        match self.format {
            LogFormat::Full => registry.with(layer).try_init(),
            LogFormat::Compact => registry.with(layer.compact()).try_init(),
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => registry.with(layer.json()).try_init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_map_to_span_flags() {
        let none = SpanEvents::from(SpanEventPreset::None);
        assert!(!none.new && !none.enter && !none.exit && !none.close);

        let lifecycle = SpanEvents::from(SpanEventPreset::Lifecycle);
        assert!(lifecycle.new && lifecycle.close);
        assert!(!lifecycle.enter && !lifecycle.exit);

        let full = SpanEvents::from(SpanEventPreset::Full);
        assert!(full.new && full.enter && full.exit && full.close);
    }

    #[test]
    fn builder_mirrors_config() {
        let config = LoggingConfig {
            level: "relay=debug,warn".to_string(),
            format: LogFormat::Compact,
            ansi: false,
            span_events: SpanEventPreset::Active,
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.directives, vec!["relay=debug,warn".to_string()]);
        assert_eq!(builder.format, LogFormat::Compact);
        assert!(!builder.ansi);
        assert!(builder.span_events.enter && builder.span_events.exit);
    }

    #[test]
    fn double_initialization_is_tolerated() {
        LoggingBuilder::new().ansi(false).init();
        // The second install is a no-op rather than a panic.
        init_from_config(&LoggingConfig::default());
    }
}
