//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SEO_LENS_*)
//! 2. TOML config file (if SEO_LENS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Chromium user agent the renderer presents to analyzed sites.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SEO_LENS_*)
/// 2. TOML config file (if SEO_LENS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// How long an analysis result stays servable, in seconds.
    ///
    /// Set via SEO_LENS_TTL_SECONDS environment variable.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Maximum number of cached reports.
    ///
    /// Set via SEO_LENS_CAPACITY environment variable.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Renderer timeout per page in milliseconds.
    ///
    /// Set via SEO_LENS_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// How long a single caller waits for a result, in milliseconds.
    ///
    /// Set via SEO_LENS_ANALYZE_TIMEOUT_MS environment variable.
    #[serde(default = "default_analyze_timeout_ms")]
    pub analyze_timeout_ms: u64,

    /// Interval of the background expiry sweep in seconds; 0 disables it.
    ///
    /// Set via SEO_LENS_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Upper bound on waiting for a script-heavy page to settle, in milliseconds.
    ///
    /// Set via SEO_LENS_SETTLE_TIMEOUT_MS environment variable.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// User-Agent string for page loads.
    ///
    /// Set via SEO_LENS_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether pages are rendered in headless Chromium (otherwise plain HTTP).
    ///
    /// Set via SEO_LENS_RENDER_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub render_enabled: bool,
}

fn default_ttl_seconds() -> u64 {
    300
}

fn default_capacity() -> usize {
    1024
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_analyze_timeout_ms() -> u64 {
    45_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_settle_timeout_ms() -> u64 {
    15_000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            capacity: default_capacity(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            analyze_timeout_ms: default_analyze_timeout_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            settle_timeout_ms: default_settle_timeout_ms(),
            user_agent: default_user_agent(),
            render_enabled: true,
        }
    }
}

impl AppConfig {
    /// Cache entry TTL.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Renderer timeout as Duration for use with tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Per-caller wait budget.
    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_millis(self.analyze_timeout_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    /// Sweep interval, or `None` when the sweeper is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SEO_LENS_`
    /// 2. TOML file from `SEO_LENS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SEO_LENS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("SEO_LENS_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.fetch_timeout_ms, 30_000);
        assert_eq!(config.analyze_timeout_ms, 45_000);
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.settle_timeout_ms, 15_000);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.render_enabled);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert_eq!(config.fetch_timeout(), Duration::from_millis(30_000));
        assert_eq!(config.analyze_timeout(), Duration::from_millis(45_000));
        assert_eq!(config.settle_timeout(), Duration::from_millis(15_000));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_sweep_disabled() {
        let config = AppConfig { sweep_interval_secs: 0, ..Default::default() };
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("seo-lens.toml", "ttl_seconds = 60\ncapacity = 8\n")?;
            jail.set_env("SEO_LENS_CONFIG_FILE", "seo-lens.toml");
            jail.set_env("SEO_LENS_CAPACITY", "16");
            jail.set_env("SEO_LENS_RENDER_ENABLED", "false");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.ttl_seconds, 60);
            assert_eq!(config.capacity, 16);
            assert!(!config.render_enabled);
            assert_eq!(config.fetch_timeout_ms, 30_000);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SEO_LENS_CAPACITY", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "capacity"));
            Ok(())
        });
    }
}
