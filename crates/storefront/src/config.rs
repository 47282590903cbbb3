//! Sync engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `MOSCENT_LOCAL_STORE_PATH` - Local storage file (default `.moscent/local-storage.json`)
//! - `MOSCENT_MERGE_POLICY` - How login merge combines quantities: `sum` or `max` (default: `sum`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag (e.g. `production`)
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate, 0.0 to 1.0 (default: 1.0)

use std::path::PathBuf;

use thiserror::Error;

use crate::merge::QuantityMergePolicy;

const DEFAULT_LOCAL_STORE_PATH: &str = ".moscent/local-storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Sync engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Path of the JSON file backing local storage
    pub local_store_path: PathBuf,
    /// Quantity policy for the login merge
    pub merge_policy: QuantityMergePolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Error event sample rate
    pub sentry_sample_rate: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_store_path: PathBuf::from(DEFAULT_LOCAL_STORE_PATH),
            merge_policy: QuantityMergePolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the merge policy or sample
    /// rate cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(get_optional_env)
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let local_store_path = PathBuf::from(get_or_default(
            &lookup,
            "MOSCENT_LOCAL_STORE_PATH",
            DEFAULT_LOCAL_STORE_PATH,
        ));

        let merge_policy = get_or_default(&lookup, "MOSCENT_MERGE_POLICY", "sum")
            .parse::<QuantityMergePolicy>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MOSCENT_MERGE_POLICY".to_string(), e.to_string())
            })?;

        let sentry_sample_rate = get_or_default(&lookup, "SENTRY_SAMPLE_RATE", "1.0")
            .parse::<f32>()
            .map_err(|e| e.to_string())
            .and_then(|rate| {
                if (0.0..=1.0).contains(&rate) {
                    Ok(rate)
                } else {
                    Err(format!("{rate} is outside 0.0..=1.0"))
                }
            })
            .map_err(|e| ConfigError::InvalidEnvVar("SENTRY_SAMPLE_RATE".to_string(), e))?;

        Ok(Self {
            local_store_path,
            merge_policy,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get a variable with a default value.
fn get_or_default(lookup: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SyncConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(
            config.local_store_path,
            PathBuf::from(".moscent/local-storage.json")
        );
    }

    #[test]
    fn test_merge_policy_max() {
        let config = load(&[("MOSCENT_MERGE_POLICY", "max")]).unwrap();
        assert_eq!(config.merge_policy, QuantityMergePolicy::Max);
    }

    #[test]
    fn test_invalid_merge_policy() {
        let err = load(&[("MOSCENT_MERGE_POLICY", "latest")]).unwrap_err();
        let ConfigError::InvalidEnvVar(key, _) = err;
        assert_eq!(key, "MOSCENT_MERGE_POLICY");
    }

    #[test]
    fn test_sample_rate_out_of_range() {
        assert!(load(&[("SENTRY_SAMPLE_RATE", "1.5")]).is_err());
        assert!(load(&[("SENTRY_SAMPLE_RATE", "often")]).is_err());
        let config = load(&[("SENTRY_SAMPLE_RATE", "0.25")]).unwrap();
        assert!((config.sentry_sample_rate - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_dsn_is_none() {
        let config = load(&[("SENTRY_DSN", ""), ("SENTRY_ENVIRONMENT", "staging")]).unwrap();
        assert!(config.sentry_dsn.is_none());
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }
}
