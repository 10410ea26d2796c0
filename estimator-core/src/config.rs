//! Runtime settings read from the process environment.
//!
//! | variable                  | meaning                                   | default           |
//! |---------------------------|-------------------------------------------|-------------------|
//! | `ESTIMATOR_VARIANT`       | `fence` or `shower`                       | `fence`           |
//! | `FORM_STEP_ORDER`         | comma-separated step identifiers          | variant default   |
//! | `FORM_AUTO_RESET_ENABLED` | `true` re-arms the form after success     | `true`            |
//! | `FORM_RESET_TIMEOUT`      | auto-reset delay in milliseconds          | `10000`           |
//! | `DATABASE_URL`            | primary store; unset disables it          | unset             |
//! | `SUPABASE_URL`            | secondary REST store base URL             | unset             |
//! | `SUPABASE_ANON_KEY`       | secondary REST store API key              | unset             |
//! | `ESTIMATOR_TABLE`         | table receiving submissions               | `fence_estimator` |

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::models::ProductVariant;

pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_TABLE: &str = "fence_estimator";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ESTIMATOR_VARIANT must be 'fence' or 'shower', got '{0}'")]
    InvalidVariant(String),
}

/// Credentials for the secondary (REST) store. Only present when both the
/// URL and the key are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestCredentials {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorConfig {
    pub variant: ProductVariant,
    /// Raw step order; parsed once per session by the step registry.
    pub step_order: Option<String>,
    pub auto_reset_enabled: bool,
    pub reset_timeout: Duration,
    pub database_url: Option<String>,
    pub rest: Option<RestCredentials>,
    pub table: String,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            variant: ProductVariant::default(),
            step_order: None,
            auto_reset_enabled: true,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            database_url: None,
            rest: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl EstimatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let variant = match get("ESTIMATOR_VARIANT") {
            Some(raw) => ProductVariant::parse(&raw).ok_or(ConfigError::InvalidVariant(raw))?,
            None => ProductVariant::default(),
        };

        let auto_reset_enabled = get("FORM_AUTO_RESET_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let reset_timeout = get("FORM_RESET_TIMEOUT")
            .map(|raw| parse_timeout(&raw))
            .unwrap_or(DEFAULT_RESET_TIMEOUT);

        let rest = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(RestCredentials { url, anon_key }),
            (Some(_), None) | (None, Some(_)) => {
                warn!("secondary store is only partially configured; treating it as unconfigured");
                None
            }
            (None, None) => None,
        };

        Ok(Self {
            variant,
            step_order: get("FORM_STEP_ORDER"),
            auto_reset_enabled,
            reset_timeout,
            database_url: get("DATABASE_URL"),
            rest,
            table: get("ESTIMATOR_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        })
    }
}

fn parse_timeout(raw: &str) -> Duration {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => {
            warn!(value = %raw, "invalid reset timeout; using default");
            DEFAULT_RESET_TIMEOUT
        }
    }
}
