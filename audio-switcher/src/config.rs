//! Runtime configuration.
//!
//! The binding layer receives configuration as JSON; the CLI and hosts that
//! pass nothing fall back to environment variables.

use crate::audio::{Apartment, PolicyVariant};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Log filter directives, `tracing-subscriber` EnvFilter syntax.
pub const LOG_ENV: &str = "AUDIO_SWITCHER_LOG";

/// `mta` or `sta`.
pub const APARTMENT_ENV: &str = "AUDIO_SWITCHER_APARTMENT";

/// `modern` or `vista`.
pub const POLICY_ENV: &str = "AUDIO_SWITCHER_POLICY";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings applied to every subsystem session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitcherConfig {
    /// Log filter; falls back to AUDIO_SWITCHER_LOG, then `warn`
    pub log_level: Option<String>,

    /// COM threading model for the calling thread
    pub apartment: Apartment,

    /// IPolicyConfig layout used for default device assignment
    pub policy: PolicyVariant,
}

impl SwitcherConfig {
    /// Parse a JSON document. Blank input yields the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`. Unparseable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LOG_ENV) {
            config.log_level = Some(level);
        }

        if let Some(value) = lookup(APARTMENT_ENV) {
            match value.parse() {
                Ok(apartment) => config.apartment = apartment,
                Err(e) => warn!(var = APARTMENT_ENV, error = %e, "ignoring invalid setting"),
            }
        }

        if let Some(value) = lookup(POLICY_ENV) {
            match value.parse() {
                Ok(policy) => config.policy = policy,
                Err(e) => warn!(var = POLICY_ENV, error = %e, "ignoring invalid setting"),
            }
        }

        config
    }
}
