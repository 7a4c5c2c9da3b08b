//! Process configuration, read once from the environment at startup.

use humantime::{parse_duration, DurationError};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the update period.
pub const INTERVAL_ENV: &str = "INTERVAL";
/// Environment variable holding the virtual IP to look for.
pub const VIP_ENV: &str = "VIP";
/// Update period used when `INTERVAL` is not set.
pub const DEFAULT_INTERVAL: &str = "2s";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid INTERVAL duration `{value}`")]
    InvalidInterval {
        value: String,
        #[source]
        source: DurationError,
    },
    #[error("INTERVAL must be a positive duration, got `{0}`")]
    NonPositiveInterval(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Period between two VIP checks.
    pub interval: Duration,
    /// Dotted-decimal IPv4 address to look for. Empty disables detection.
    pub vip: String,
}

impl Config {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration from an arbitrary key lookup.
    ///
    /// A key that is present is used verbatim, even when empty; only an
    /// absent key falls back to its default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_interval = lookup(INTERVAL_ENV).unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
        let trimmed = raw_interval.trim();
        if trimmed.starts_with('-') || trimmed == "0" {
            return Err(ConfigError::NonPositiveInterval(raw_interval));
        }
        let interval = parse_duration(trimmed).map_err(|source| ConfigError::InvalidInterval {
            value: raw_interval.clone(),
            source,
        })?;
        if interval.is_zero() {
            return Err(ConfigError::NonPositiveInterval(raw_interval));
        }

        let vip = lookup(VIP_ENV).unwrap_or_default();

        Ok(Config { interval, vip })
    }

    /// Whether a VIP is configured at all.
    pub fn detection_enabled(&self) -> bool {
        !self.vip.is_empty()
    }
}
