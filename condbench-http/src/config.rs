//! HTTP configuration

use condbench_config::TargetConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL every relative path is resolved against
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Whether to verify SSL certificates
    pub verify_ssl: bool,

    /// Maximum idle connections per host
    pub max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from(TargetConfig::default())
    }
}

impl From<TargetConfig> for HttpConfig {
    fn from(config: TargetConfig) -> Self {
        Self {
            base_url: config.base_url,
            timeout: config.timeout,
            user_agent: config.user_agent,
            verify_ssl: config.verify_ssl,
            max_idle_per_host: config.max_idle_per_host,
        }
    }
}

impl HttpConfig {
    /// Same settings pointed at a different base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Same settings with a different deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
