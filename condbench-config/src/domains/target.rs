//! Target web service configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the server under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the web service being benchmarked
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline applied to every action
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_timeout"
    )]
    pub timeout: Duration,

    /// Grace period for `POST /initialize`
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_initialize_timeout"
    )]
    pub initialize_timeout: Duration,

    /// User agent sent by virtual users
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether to verify TLS certificates
    #[serde(default = "crate::domains::utils::default_true")]
    pub verify_ssl: bool,

    /// Maximum idle connections kept per host by each virtual user
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            initialize_timeout: default_initialize_timeout(),
            user_agent: default_user_agent(),
            verify_ssl: true,
            max_idle_per_host: default_max_idle_per_host(),
        }
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        validate_positive(self.timeout.as_millis(), "timeout", self.domain_name())?;
        validate_positive(
            self.initialize_timeout.as_millis(),
            "initialize_timeout",
            self.domain_name(),
        )?;
        validate_required_string(&self.user_agent, "user_agent", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_initialize_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_user_agent() -> String {
    "condbench/0.1".to_string()
}

fn default_max_idle_per_host() -> usize {
    4
}
