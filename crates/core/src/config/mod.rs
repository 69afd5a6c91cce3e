//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LINKSTASH_*)
//! 2. TOML config file (if LINKSTASH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{ConfigError, MAX_REFETCH_CHECK_INTERVAL_MINUTES, MAX_REFETCH_INTERVAL_HOURS};

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LINKSTASH_*)
/// 2. TOML config file (if LINKSTASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite record store.
    ///
    /// Set via LINKSTASH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via LINKSTASH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest response body accepted, in bytes.
    ///
    /// Set via LINKSTASH_CONTENT_SIZE_LIMIT_BYTES environment variable.
    #[serde(default = "default_content_size_limit_bytes")]
    pub content_size_limit_bytes: usize,

    /// Maximum number of redirects followed per fetch.
    ///
    /// Set via LINKSTASH_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Per-request timeout in milliseconds.
    ///
    /// Set via LINKSTASH_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Age in hours after which a stored record is refetched.
    ///
    /// Set via LINKSTASH_REFETCH_INTERVAL_HOURS environment variable.
    #[serde(default = "default_refetch_interval_hours")]
    pub refetch_interval_hours: u64,

    /// How often, in minutes, the refetch task looks for stale records.
    ///
    /// Set via LINKSTASH_REFETCH_CHECK_INTERVAL_MINUTES environment variable.
    #[serde(default = "default_refetch_check_interval_minutes")]
    pub refetch_check_interval_minutes: u64,

    /// Refuse to connect to loopback, private and link-local addresses.
    ///
    /// Set via LINKSTASH_BLOCK_PRIVATE_ADDRESSES environment variable.
    #[serde(default = "default_true")]
    pub block_private_addresses: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./linkstash.sqlite")
}

fn default_user_agent() -> String {
    "linkstash/0.1".into()
}

fn default_content_size_limit_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_refetch_interval_hours() -> u64 {
    12
}

fn default_refetch_check_interval_minutes() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            content_size_limit_bytes: default_content_size_limit_bytes(),
            max_redirects: default_max_redirects(),
            timeout_ms: default_timeout_ms(),
            refetch_interval_hours: default_refetch_interval_hours(),
            refetch_check_interval_minutes: default_refetch_check_interval_minutes(),
            block_private_addresses: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Age past which a record counts as stale. Clamped to the validated maximum.
    pub fn refetch_interval(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refetch_interval_hours.min(MAX_REFETCH_INTERVAL_HOURS) as i64)
    }

    /// Period of the refetch timer. Clamped to the validated maximum.
    pub fn refetch_check_interval(&self) -> Duration {
        Duration::from_secs(self.refetch_check_interval_minutes.min(MAX_REFETCH_CHECK_INTERVAL_MINUTES) * 60)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LINKSTASH_`
    /// 2. TOML file from `LINKSTASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LINKSTASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LINKSTASH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
