//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `ttl_seconds` is 0 or exceeds one day
    /// - `capacity` is 0
    /// - `fetch_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `analyze_timeout_ms` is shorter than `fetch_timeout_ms`
    /// - `settle_timeout_ms` exceeds `fetch_timeout_ms`
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_seconds == 0 {
            return Err(invalid("ttl_seconds", "must be greater than 0"));
        }
        if self.ttl_seconds > 86_400 {
            return Err(invalid("ttl_seconds", "must not exceed one day (86400s)"));
        }

        if self.capacity == 0 {
            return Err(invalid("capacity", "must be greater than 0"));
        }

        if self.fetch_timeout_ms < 100 {
            return Err(invalid("fetch_timeout_ms", "must be at least 100ms"));
        }
        if self.fetch_timeout_ms > 300_000 {
            return Err(invalid("fetch_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.analyze_timeout_ms < self.fetch_timeout_ms {
            return Err(invalid("analyze_timeout_ms", "must be at least fetch_timeout_ms"));
        }

        if self.settle_timeout_ms > self.fetch_timeout_ms {
            return Err(invalid("settle_timeout_ms", "must not exceed fetch_timeout_ms"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.render_enabled {
            tracing::warn!("render_enabled is false; pages are fetched without executing JavaScript");
        }

        Ok(())
    }
}
