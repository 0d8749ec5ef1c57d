//! Tracing subscriber initialization
//!
//! Sets up a `tracing-subscriber` registry with an `EnvFilter` (`RUST_LOG`
//! wins over the configured fallback) and either JSON or human-readable output.

use crate::ConfigError;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TelemetryConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "encore_sync=info,encore_storage=info,warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Filter built from `RUST_LOG`, or from the configured directives.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.filter).map_err(|e| ConfigError::InvalidValue {
            field: "telemetry.filter",
            reason: e.to_string(),
        })
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. Returns an error if a global subscriber is already
/// installed instead of panicking.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter = config.env_filter()?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::Telemetry {
            reason: e.to_string(),
        })?;

    tracing::info!(
        filter = %config.filter,
        format = ?config.format,
        "Telemetry initialized"
    );

    Ok(())
}
