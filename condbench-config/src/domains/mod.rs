//! Domain-specific configuration modules

pub mod association;
pub mod logging;
pub mod scenario;
pub mod target;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main benchmark configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BenchConfig {
    /// Target web service configuration
    #[serde(default)]
    pub target: target::TargetConfig,

    /// Scenario (population, virtual clock, generator) configuration
    #[serde(default)]
    pub scenario: scenario::ScenarioConfig,

    /// Device association service configuration
    #[serde(default)]
    pub association: association::AssociationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl BenchConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.target.validate()?;
        self.scenario.validate()?;
        self.association.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = BenchConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
