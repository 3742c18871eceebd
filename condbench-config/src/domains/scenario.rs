//! Scenario configuration: population, ramp policy, virtual clock and
//! synthetic generator settings

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// How many virtual seconds pass per real second
    #[serde(default = "default_virtual_time_multiplier")]
    pub virtual_time_multiplier: u32,

    /// Virtual instant corresponding to the start of the load phase
    #[serde(default = "default_virtual_time_start")]
    pub virtual_time_start: DateTime<Utc>,

    /// Length of the load phase
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_load_duration"
    )]
    pub load_duration: Duration,

    /// Normal users started at the beginning of the load phase
    #[serde(default = "default_initial_normal_users")]
    pub initial_normal_users: u32,

    /// Maniac users started at the beginning of the load phase
    #[serde(default)]
    pub initial_maniac_users: u32,

    /// Company users started at the beginning of the load phase
    #[serde(default = "default_initial_company_users")]
    pub initial_company_users: u32,

    /// Interval between two ramp-up steps
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_ramp_interval"
    )]
    pub ramp_interval: Duration,

    /// Normal users added at each ramp-up step
    #[serde(default = "default_ramp_normal_users")]
    pub ramp_normal_users: u32,

    /// Company users added at each ramp-up step
    #[serde(default)]
    pub ramp_company_users: u32,

    /// Real interval between two synthetic readings of one device
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_post_interval"
    )]
    pub post_interval: Duration,

    /// Think time between two actions of one virtual user
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_action_interval"
    )]
    pub action_interval: Duration,

    /// Capacity of each device's reading channel
    #[serde(default = "default_condition_channel_capacity")]
    pub condition_channel_capacity: usize,

    /// Upper bound of devices created by a company user
    #[serde(default = "default_max_company_devices")]
    pub max_company_devices: usize,

    /// Interval of the diagnostic counter report
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_report_interval"
    )]
    pub report_interval: Duration,

    /// Fixed seed for reproducible synthetic data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            virtual_time_multiplier: default_virtual_time_multiplier(),
            virtual_time_start: default_virtual_time_start(),
            load_duration: default_load_duration(),
            initial_normal_users: default_initial_normal_users(),
            initial_maniac_users: 0,
            initial_company_users: default_initial_company_users(),
            ramp_interval: default_ramp_interval(),
            ramp_normal_users: default_ramp_normal_users(),
            ramp_company_users: 0,
            post_interval: default_post_interval(),
            action_interval: default_action_interval(),
            condition_channel_capacity: default_condition_channel_capacity(),
            max_company_devices: default_max_company_devices(),
            report_interval: default_report_interval(),
            seed: None,
        }
    }
}

impl Validatable for ScenarioConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.virtual_time_multiplier,
            "virtual_time_multiplier",
            self.domain_name(),
        )?;
        validate_positive(self.load_duration.as_secs(), "load_duration", self.domain_name())?;
        validate_positive(self.ramp_interval.as_millis(), "ramp_interval", self.domain_name())?;
        validate_positive(self.post_interval.as_millis(), "post_interval", self.domain_name())?;
        validate_positive(
            self.condition_channel_capacity,
            "condition_channel_capacity",
            self.domain_name(),
        )?;
        validate_positive(
            self.max_company_devices,
            "max_company_devices",
            self.domain_name(),
        )?;
        validate_positive(self.report_interval.as_millis(), "report_interval", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "scenario"
    }
}

fn default_virtual_time_multiplier() -> u32 {
    // one reading every 300 virtual seconds = ten per real second
    3000
}

pub fn default_virtual_time_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn default_load_duration() -> Duration {
    Duration::from_secs(60)
}

fn default_initial_normal_users() -> u32 {
    10
}

fn default_initial_company_users() -> u32 {
    1
}

fn default_ramp_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_ramp_normal_users() -> u32 {
    2
}

fn default_post_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_action_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_condition_channel_capacity() -> usize {
    64
}

fn default_max_company_devices() -> usize {
    10
}

fn default_report_interval() -> Duration {
    Duration::from_secs(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_defaults() {
        let config = ScenarioConfig::default();
        assert_eq!(config.virtual_time_multiplier, 3000);
        assert_eq!(
            config.virtual_time_start.to_rfc3339(),
            "2020-07-01T00:00:00+00:00"
        );
        assert_eq!(config.post_interval, Duration::from_millis(100));
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_multiplier_rejected() {
        let config = ScenarioConfig {
            virtual_time_multiplier: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_channel_capacity_rejected() {
        let config = ScenarioConfig {
            condition_channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
