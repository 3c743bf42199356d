//! Tracker configuration.
//!
//! Plain structs with sensible defaults; `TrackerConfig::from_env()` layers
//! environment variables on top:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `OSRM_URL` | `routing_base_url` | `http://localhost:5000` |
//! | `FLEETVIEW_TICK_MS` | `tick_interval` | 1000 |
//! | `FLEETVIEW_ROUTING_TIMEOUT_MS` | `routing_timeout` | 10000 |
//! | `FLEETVIEW_ROUTING_RETRIES` | `retry.max_retries` | 0 |
//! | `FLEETVIEW_ROUTING_BACKOFF_MS` | `retry.backoff` | 250 |

use fleetview_env::{EnvError, OsrmClient};
use std::time::Duration;
use thiserror::Error;

pub const ENV_ROUTING_URL: &str = "OSRM_URL";
pub const ENV_TICK_MS: &str = "FLEETVIEW_TICK_MS";
pub const ENV_ROUTING_TIMEOUT_MS: &str = "FLEETVIEW_ROUTING_TIMEOUT_MS";
pub const ENV_ROUTING_RETRIES: &str = "FLEETVIEW_ROUTING_RETRIES";
pub const ENV_ROUTING_BACKOFF_MS: &str = "FLEETVIEW_ROUTING_BACKOFF_MS";

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Retry policy for Routing Engine calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure (default: 0 = no retry)
    pub max_retries: u32,

    /// Fixed delay between attempts (default: 250ms)
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Configuration for the tracking engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Base URL of the OSRM routing service
    pub routing_base_url: String,

    /// Period of each driver's advance/broadcast ticker (default: 1s)
    pub tick_interval: Duration,

    /// Upper bound for one Routing Engine call (default: 10s)
    pub routing_timeout: Duration,

    /// Retry policy for unavailable Routing Engine
    pub retry: RetryPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            routing_base_url: "http://localhost:5000".to_string(),
            tick_interval: Duration::from_secs(1),
            routing_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl TrackerConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; set keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_ROUTING_URL) {
            config.routing_base_url = url;
        }
        if let Some(ms) = parse_u64(&lookup, ENV_TICK_MS)? {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_ROUTING_TIMEOUT_MS)? {
            config.routing_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_u64(&lookup, ENV_ROUTING_RETRIES)? {
            config.retry.max_retries = u32::try_from(retries).map_err(|_| ConfigError::InvalidValue {
                key: ENV_ROUTING_RETRIES,
                value: retries.to_string(),
                reason: "too large",
            })?;
        }
        if let Some(ms) = parse_u64(&lookup, ENV_ROUTING_BACKOFF_MS)? {
            config.retry.backoff = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("routing base URL is empty"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid("tick interval must be non-zero"));
        }
        if self.routing_timeout.is_zero() {
            return Err(ConfigError::Invalid("routing timeout must be non-zero"));
        }
        Ok(())
    }

    /// Builds the OSRM client described by `routing_base_url` and
    /// `routing_timeout`.
    pub fn osrm_client(&self) -> Result<OsrmClient, EnvError> {
        OsrmClient::new(self.routing_base_url.clone(), self.routing_timeout)
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.retry = RetryPolicy { max_retries, backoff };
        self
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key,
                value: raw,
                reason: "expected a non-negative integer",
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_tracker_config_default() {
        let config = TrackerConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.routing_base_url, "http://localhost:5000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = TrackerConfig::from_lookup(lookup_from(&[
            (ENV_ROUTING_URL, "http://osrm:5000"),
            (ENV_TICK_MS, "250"),
            (ENV_ROUTING_RETRIES, "3"),
        ]))
        .unwrap();

        assert_eq!(config.routing_base_url, "http://osrm:5000");
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.retry.max_retries, 3);
        // Untouched keys keep defaults
        assert_eq!(config.routing_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = TrackerConfig::from_lookup(lookup_from(&[(ENV_TICK_MS, "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_TICK_MS, .. }));
    }

    #[test]
    fn test_zero_tick_is_invalid() {
        let err = TrackerConfig::from_lookup(lookup_from(&[(ENV_TICK_MS, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("tick interval must be non-zero"));
    }

    #[test]
    fn test_osrm_client_from_config() {
        let config = TrackerConfig::from_lookup(lookup_from(&[(ENV_ROUTING_URL, "http://osrm.internal:5000/")])).unwrap();
        let client = config.osrm_client().unwrap();
        assert_eq!(client.base_url(), "http://osrm.internal:5000");
    }

    #[test]
    fn test_empty_url_is_invalid() {
        let err = TrackerConfig::from_lookup(lookup_from(&[(ENV_ROUTING_URL, " ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
