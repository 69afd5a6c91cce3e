//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Upper bound for `refetch_interval_hours` (one year).
pub const MAX_REFETCH_INTERVAL_HOURS: u64 = 8760;

/// Upper bound for `refetch_check_interval_minutes` (one week).
pub const MAX_REFETCH_CHECK_INTERVAL_MINUTES: u64 = 10_080;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `content_size_limit_bytes` is 0 or exceeds 50MB
    /// - `max_redirects` exceeds 20
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `refetch_interval_hours` is 0 or exceeds 8760 (one year)
    /// - `refetch_check_interval_minutes` is 0 or exceeds 10080 (one week)
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_size_limit_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "content_size_limit_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.content_size_limit_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid {
                field: "content_size_limit_bytes".into(),
                reason: "must not exceed 50MB".into(),
            });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.refetch_interval_hours == 0 {
            return Err(ConfigError::Invalid {
                field: "refetch_interval_hours".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.refetch_interval_hours > MAX_REFETCH_INTERVAL_HOURS {
            return Err(ConfigError::Invalid {
                field: "refetch_interval_hours".into(),
                reason: format!("must not exceed {MAX_REFETCH_INTERVAL_HOURS} hours"),
            });
        }
        if self.refetch_check_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                field: "refetch_check_interval_minutes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.refetch_check_interval_minutes > MAX_REFETCH_CHECK_INTERVAL_MINUTES {
            return Err(ConfigError::Invalid {
                field: "refetch_check_interval_minutes".into(),
                reason: format!("must not exceed {MAX_REFETCH_CHECK_INTERVAL_MINUTES} minutes"),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.refetch_check_interval_minutes > self.refetch_interval_hours * 60 {
            tracing::warn!(
                check_interval_minutes = self.refetch_check_interval_minutes,
                refetch_interval_hours = self.refetch_interval_hours,
                "refetch check interval is longer than the staleness threshold; \
                 records will be refreshed later than they become stale"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_size_limit_zero() {
        let config = AppConfig { content_size_limit_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "content_size_limit_bytes"));
    }

    #[test]
    fn test_validate_size_limit_exceeds_cap() {
        let config = AppConfig { content_size_limit_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "content_size_limit_bytes"));
    }

    #[test]
    fn test_validate_max_redirects() {
        let config = AppConfig { max_redirects: 21, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_redirects"));

        let config = AppConfig { max_redirects: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_refetch_intervals() {
        let config = AppConfig { refetch_interval_hours: 0, ..Default::default() };
        assert!(
            matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "refetch_interval_hours")
        );

        let config = AppConfig { refetch_check_interval_minutes: 0, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "refetch_check_interval_minutes"
        ));
    }

    #[test]
    fn test_validate_refetch_interval_upper_bounds() {
        let config = AppConfig { refetch_interval_hours: MAX_REFETCH_INTERVAL_HOURS + 1, ..Default::default() };
        assert!(
            matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "refetch_interval_hours")
        );

        let config = AppConfig { refetch_interval_hours: u64::MAX / 120, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { refetch_check_interval_minutes: u64::MAX, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "refetch_check_interval_minutes"
        ));

        let config = AppConfig {
            refetch_interval_hours: MAX_REFETCH_INTERVAL_HOURS,
            refetch_check_interval_minutes: MAX_REFETCH_CHECK_INTERVAL_MINUTES,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            content_size_limit_bytes: 1,
            timeout_ms: 100,
            refetch_interval_hours: 1,
            refetch_check_interval_minutes: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
