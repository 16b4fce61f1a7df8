//! Logging setup
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and either a
//! human-readable or a JSON formatter. `RUST_LOG` wins over the configured
//! level when set.

use clap::ValueEnum;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directive could not be parsed
    #[error("invalid log filter {directive:?}: {message}")]
    InvalidFilter {
        /// Directive that failed to parse
        directive: String,
        /// Parser message
        message: String,
    },

    /// A global subscriber was already installed
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Output format of log lines
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default level for this crate when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is not set
    ///
    /// Only this crate follows `level`; kube and the HTTP stack stay quieter.
    pub fn default_directive(&self) -> String {
        format!(
            "warn,hive_simulator={},kube=info,tower=warn,hyper=warn",
            self.level
        )
    }

    fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let directive = self.default_directive();
        EnvFilter::try_new(&directive).map_err(|e| TelemetryError::InvalidFilter {
            directive,
            message: e.to_string(),
        })
    }
}

/// Initialize logging with the given configuration
///
/// # Example
///
/// ```ignore
/// use hive_simulator::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
///
/// init_telemetry(TelemetryConfig {
///     level: "debug".to_string(),
///     format: LogFormat::Json,
/// })?;
/// ```
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = config.filter()?;

    let (text, json) = match config.format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer().with_target(true)), None),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text)
        .with(json)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::SubscriberInit(e.to_string())
        })?;

    Ok(())
}
