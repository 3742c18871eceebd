//! Device association service configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// Settings for the in-process device association service the target
/// server calls back into when a device is registered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Address the association service listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// URL the target server should use to reach the association service
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// User agent used when posting device readings to the target
    #[serde(default = "default_poster_user_agent")]
    pub poster_user_agent: String,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            public_url: default_public_url(),
            poster_user_agent: default_poster_user_agent(),
        }
    }
}

impl Validatable for AssociationConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.bind_address, "bind_address", self.domain_name())?;
        self.bind_address
            .parse::<std::net::SocketAddr>()
            .map_err(|e| self.validation_error(format!("bind_address is not a socket address: {}", e)))?;
        validate_url(&self.public_url, "public_url", self.domain_name())?;
        validate_required_string(&self.poster_user_agent, "poster_user_agent", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "association"
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_public_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poster_user_agent() -> String {
    "JIA-Members-Client/1.2".to_string()
}
