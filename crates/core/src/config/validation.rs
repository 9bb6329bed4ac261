//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MIN_TTL_SECS: u64 = 60;
const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;
const MAX_PRESET_CONCURRENCY: usize = 8;

/// Configuration validation errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is under a minute or over 30 days
    /// - `cache_max_entries` is set to 0
    /// - `timeout_ms` is under 1s or over 10 minutes
    /// - `preset_concurrency` is 0 or over 8
    /// - `user_agent` or a model name is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs < MIN_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be at least 60 seconds".into(),
            });
        }
        if self.cache_ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must not exceed 30 days".into() });
        }

        if self.cache_max_entries == Some(0) {
            return Err(ConfigError::Invalid {
                field: "cache_max_entries".into(),
                reason: "must be greater than 0 when set".into(),
            });
        }

        if self.timeout_ms < 1_000 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 1000ms".into() });
        }
        if self.timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.preset_concurrency == 0 || self.preset_concurrency > MAX_PRESET_CONCURRENCY {
            return Err(ConfigError::Invalid {
                field: "preset_concurrency".into(),
                reason: format!("must be between 1 and {MAX_PRESET_CONCURRENCY}"),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for (field, value) in [("analysis_model", &self.analysis_model), ("image_model", &self.image_model)] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        if self.gemini_api_key.is_some() && self.gcp_project_id.is_some() {
            tracing::warn!(
                "Both gemini_api_key and gcp_project_id are set; \
                 the API key takes precedence"
            );
        }

        Ok(())
    }
}
