//! Tracing subscriber setup.
//!
//! Every Keystone crate logs through `tracing` macros with structured fields:
//!
//! | Level | Emitted for |
//! |-------|-------------|
//! | `debug` | startup and halt begin, resets, bridge suspensions and faults |
//! | `info` | completed startups and halts |
//! | `warn` | per-resource startup and halt failures |
//! | `error` | rejected startups and halts, missing runtime |
//!
//! Library code never installs a subscriber. Applications call
//! [`TracingSetup::init`] once, early.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The configuration a [`TracingSetup`] was initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
    /// Whether this setup installed the global subscriber.
    ///
    /// `false` when another subscriber was already installed.
    pub installed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSetup
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global `tracing` subscriber.
///
/// # Configuration Options
///
/// ```
/// use keystone_core::{TracingFormat, TracingSetup};
/// use tracing::Level;
///
/// // Development: pretty output with span enter/exit
/// let dev = TracingSetup::new()
///     .with_level(Level::DEBUG)
///     .with_format(TracingFormat::Pretty)
///     .with_span_events(true);
///
/// // Production: JSON output, quiet bridge
/// let prod = TracingSetup::new()
///     .with_level(Level::INFO)
///     .with_format(TracingFormat::Json)
///     .with_env_filter("keystone_lifecycle=info,keystone_bridge=warn");
/// # let _ = (dev, prod);
/// ```
#[derive(Debug, Clone)]
pub struct TracingSetup {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "keystone_lifecycle=debug").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingSetup {
    /// Creates a setup with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a target filter, `target=level,target=level,...`.
    ///
    /// An unparsable filter falls back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Installs the global subscriber.
    ///
    /// Tolerates an already installed subscriber; the returned config reports
    /// whether this call installed one.
    pub fn init(self) -> TracingConfig {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let registry = tracing_subscriber::registry().with(self.filter());
        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        if installed {
            tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        }

        TracingConfig {
            level: self.level,
            format: self.format,
            installed,
        }
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }
}
