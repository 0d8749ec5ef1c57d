//! Configuration loading for Encore.
//!
//! Configuration comes from a TOML file (every section optional, unknown keys
//! rejected) with `ENCORE_*` environment variables layered on top.

use crate::telemetry::{init_tracing, LogFormat, TelemetryConfig};
use crate::{ConfigError, EncoreResult, PlanTier};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ENCORE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EncoreConfig {
    pub cache: CacheConfig,
    pub coordinator: CoordinatorConfig,
    pub limits: LimitsConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    /// Buffered change events per kind before slow readers start lagging.
    pub broadcast_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CoordinatorConfig {
    /// Extra attempts at writing dependent child records before giving up.
    pub child_write_retries: u32,
    /// Emit a notification for successful mutations, not only failures.
    pub notify_success: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            child_write_retries: 1,
            notify_success: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LimitsConfig {
    /// Tier assumed while the limits source is unreachable.
    pub default_tier: PlanTier,
}

const MAX_CHILD_WRITE_RETRIES: u32 = 10;

impl EncoreConfig {
    /// Resolve the config path from `--config` or `ENCORE_CONFIG`, load it,
    /// apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let mut config = Self::from_path(&path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Startup entry point: [`load`](Self::load), then install the tracing
    /// subscriber described by `[telemetry]`.
    pub fn bootstrap() -> EncoreResult<Self> {
        let config = Self::load()?;
        init_tracing(&config.telemetry)?;
        Ok(config)
    }

    /// [`bootstrap`](Self::bootstrap) with an explicit config file.
    pub fn bootstrap_from(path: &Path) -> EncoreResult<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_env()?;
        config.validate()?;
        init_tracing(&config.telemetry)?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: EncoreConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Layer `ENCORE_*` process environment variables over this config.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Layer overrides from an arbitrary key lookup.
    ///
    /// Recognized keys: `ENCORE_CACHE_BROADCAST_CAPACITY`,
    /// `ENCORE_CHILD_WRITE_RETRIES`, `ENCORE_NOTIFY_SUCCESS`,
    /// `ENCORE_DEFAULT_TIER`, `ENCORE_LOG_FILTER`, `ENCORE_LOG_FORMAT`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("ENCORE_CACHE_BROADCAST_CAPACITY") {
            self.cache.broadcast_capacity =
                parse_number("cache.broadcast_capacity", &raw)?;
        }
        if let Some(raw) = lookup("ENCORE_CHILD_WRITE_RETRIES") {
            self.coordinator.child_write_retries =
                parse_number("coordinator.child_write_retries", &raw)?;
        }
        if let Some(raw) = lookup("ENCORE_NOTIFY_SUCCESS") {
            self.coordinator.notify_success = parse_bool("coordinator.notify_success", &raw)?;
        }
        if let Some(raw) = lookup("ENCORE_DEFAULT_TIER") {
            self.limits.default_tier = match raw.trim().to_ascii_lowercase().as_str() {
                "free" => PlanTier::Free,
                "pro" => PlanTier::Pro,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: "limits.default_tier",
                        reason: format!("unknown tier '{}'", other),
                    })
                }
            };
        }
        if let Some(raw) = lookup("ENCORE_LOG_FILTER") {
            self.telemetry.filter = raw;
        }
        if let Some(raw) = lookup("ENCORE_LOG_FORMAT") {
            self.telemetry.format = raw.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.broadcast_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.broadcast_capacity",
                reason: "must be > 0".to_string(),
            });
        }
        if self.coordinator.child_write_retries > MAX_CHILD_WRITE_RETRIES {
            return Err(ConfigError::InvalidValue {
                field: "coordinator.child_write_retries",
                reason: format!("must be <= {}", MAX_CHILD_WRITE_RETRIES),
            });
        }
        if self.telemetry.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::InvalidValue {
                field: "telemetry.format",
                reason: format!("expected 'json' or 'pretty', got '{}'", other),
            }),
        }
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        reason: format!("'{}' is not a valid number", raw),
    })
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field,
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
