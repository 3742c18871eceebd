//! Configuration loading and environment variable handling

use crate::domains::BenchConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "CONDBENCH".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<BenchConfig> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml_str(&content)
    }

    /// Load configuration from a YAML document with environment overrides
    pub fn from_yaml_str(&self, content: &str) -> ConfigResult<BenchConfig> {
        let mut config: BenchConfig = serde_yaml::from_str(content)?;
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<BenchConfig> {
        let mut config = BenchConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<BenchConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut BenchConfig) -> ConfigResult<()> {
        self.apply_target_overrides(&mut config.target)?;
        self.apply_scenario_overrides(&mut config.scenario)?;
        self.apply_association_overrides(&mut config.association)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_target_overrides(
        &self,
        config: &mut crate::domains::target::TargetConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("TARGET_URL") {
            config.base_url = url;
        }

        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            config.timeout = Duration::from_secs(self.parse_env("HTTP_TIMEOUT", &timeout)?);
        }

        Ok(())
    }

    fn apply_scenario_overrides(
        &self,
        config: &mut crate::domains::scenario::ScenarioConfig,
    ) -> ConfigResult<()> {
        if let Ok(multiplier) = self.get_env_var("VIRTUAL_TIME_MULTIPLIER") {
            config.virtual_time_multiplier = self.parse_env("VIRTUAL_TIME_MULTIPLIER", &multiplier)?;
        }

        if let Ok(duration) = self.get_env_var("LOAD_DURATION") {
            config.load_duration = Duration::from_secs(self.parse_env("LOAD_DURATION", &duration)?);
        }

        if let Ok(users) = self.get_env_var("INITIAL_NORMAL_USERS") {
            config.initial_normal_users = self.parse_env("INITIAL_NORMAL_USERS", &users)?;
        }

        if let Ok(users) = self.get_env_var("INITIAL_COMPANY_USERS") {
            config.initial_company_users = self.parse_env("INITIAL_COMPANY_USERS", &users)?;
        }

        if let Ok(seed) = self.get_env_var("SEED") {
            config.seed = Some(self.parse_env("SEED", &seed)?);
        }

        Ok(())
    }

    fn apply_association_overrides(
        &self,
        config: &mut crate::domains::association::AssociationConfig,
    ) -> ConfigResult<()> {
        if let Ok(url) = self.get_env_var("JIA_URL") {
            config.public_url = url;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn parse_env<T>(&self, name: &str, value: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e)))
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
