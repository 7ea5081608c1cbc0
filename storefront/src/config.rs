//! Configuration management for the storefront.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::environment::SearchSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use storefront_state_runtime::StoreConfig;
use storefront_state_runtime::retry::RetryPolicy;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// A value parsed but is out of range
    #[error("{key} must be {requirement}")]
    OutOfRange {
        /// Variable name
        key: &'static str,
        /// What the value must satisfy
        requirement: &'static str,
    },
}

/// Storefront configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Log filter directives (`STOREFRONT_LOG`)
    pub log_filter: String,
    /// Products per search page (`STOREFRONT_SEARCH_PAGE_SIZE`)
    pub page_size: u32,
    /// Maximum suggestions per term (`STOREFRONT_MAX_SUGGESTIONS`)
    pub max_suggestions: usize,
    /// Capacity of the action broadcast channel (`STOREFRONT_BROADCAST_CAPACITY`)
    pub broadcast_capacity: usize,
    /// Graceful shutdown timeout in seconds (`STOREFRONT_SHUTDOWN_TIMEOUT`)
    pub shutdown_timeout: u64,
    /// Retries of transient backend failures (`STOREFRONT_RETRY_ATTEMPTS`)
    pub retry_attempts: usize,
    /// Delay before the first retry in milliseconds (`STOREFRONT_RETRY_DELAY_MS`)
    pub retry_delay_ms: u64,
    /// Catalog JSON replacing the bundled sample (`STOREFRONT_CATALOG`)
    pub catalog_path: Option<PathBuf>,
    /// Address of the Prometheus scrape endpoint (`STOREFRONT_METRICS_ADDR`)
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            log_filter: "storefront=info,storefront_state_runtime=info".to_string(),
            page_size: 20,
            max_suggestions: 10,
            broadcast_capacity: 16,
            shutdown_timeout: 30,
            retry_attempts: 3,
            retry_delay_ms: 100,
            catalog_path: None,
            metrics_addr: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            log_filter: lookup("STOREFRONT_LOG").unwrap_or(defaults.log_filter),
            page_size: parse(&lookup, "STOREFRONT_SEARCH_PAGE_SIZE")?.unwrap_or(defaults.page_size),
            max_suggestions: parse(&lookup, "STOREFRONT_MAX_SUGGESTIONS")?
                .unwrap_or(defaults.max_suggestions),
            broadcast_capacity: parse(&lookup, "STOREFRONT_BROADCAST_CAPACITY")?
                .unwrap_or(defaults.broadcast_capacity),
            shutdown_timeout: parse(&lookup, "STOREFRONT_SHUTDOWN_TIMEOUT")?
                .unwrap_or(defaults.shutdown_timeout),
            retry_attempts: parse(&lookup, "STOREFRONT_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.retry_attempts),
            retry_delay_ms: parse(&lookup, "STOREFRONT_RETRY_DELAY_MS")?
                .unwrap_or(defaults.retry_delay_ms),
            catalog_path: lookup("STOREFRONT_CATALOG")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            metrics_addr: parse(&lookup, "STOREFRONT_METRICS_ADDR")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first offending value.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "STOREFRONT_SEARCH_PAGE_SIZE",
                requirement: "at least 1",
            });
        }
        if self.max_suggestions == 0 {
            return Err(ConfigError::OutOfRange {
                key: "STOREFRONT_MAX_SUGGESTIONS",
                requirement: "at least 1",
            });
        }
        // tokio's broadcast channel panics on zero capacity
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "STOREFRONT_BROADCAST_CAPACITY",
                requirement: "at least 1",
            });
        }
        if self.shutdown_timeout == 0 {
            return Err(ConfigError::OutOfRange {
                key: "STOREFRONT_SHUTDOWN_TIMEOUT",
                requirement: "at least 1 second",
            });
        }
        Ok(())
    }

    /// Store runtime settings
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, Duration::from_secs(self.shutdown_timeout))
    }

    /// Retry policy for backend calls
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.retry_attempts)
            .initial_delay(Duration::from_millis(self.retry_delay_ms))
            .build()
    }

    /// Search tuning
    #[must_use]
    pub const fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            page_size: self.page_size,
            max_suggestions: self.max_suggestions,
        }
    }
}

fn parse<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
