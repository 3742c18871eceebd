//! Synthetic device readings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity of a reading, ordered `Info < Warning < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConditionLevel {
    #[default]
    Info,
    Warning,
    Critical,
}

impl ConditionLevel {
    pub const ALL: [ConditionLevel; 3] = [
        ConditionLevel::Info,
        ConditionLevel::Warning,
        ConditionLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionLevel::Info => "info",
            ConditionLevel::Warning => "warning",
            ConditionLevel::Critical => "critical",
        }
    }

    /// Level implied by the number of raised flags
    pub fn from_raised_flags(count: usize) -> Result<Self, ConditionParseError> {
        match count {
            0 => Ok(ConditionLevel::Info),
            1 | 2 => Ok(ConditionLevel::Warning),
            3 => Ok(ConditionLevel::Critical),
            n => Err(ConditionParseError::TooManyFlags(n)),
        }
    }

    /// Comma-separated `condition_level` query value selecting this level
    /// and everything above it, most severe first
    pub fn at_least_query(&self) -> String {
        Self::ALL
            .iter()
            .rev()
            .filter(|l| *l >= self)
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ConditionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConditionLevel {
    type Err = ConditionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(ConditionLevel::Info),
            "warning" => Ok(ConditionLevel::Warning),
            "critical" => Ok(ConditionLevel::Critical),
            other => Err(ConditionParseError::UnknownLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConditionParseError {
    #[error("unknown condition level '{0}'")]
    UnknownLevel(String),

    #[error("unexpected warn count {0}")]
    TooManyFlags(usize),

    #[error("malformed condition string '{0}'")]
    Malformed(String),
}

/// The three boolean flags a device reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConditionFlags {
    pub is_dirty: bool,
    pub is_overweight: bool,
    pub is_broken: bool,
}

impl ConditionFlags {
    pub fn raised(&self) -> usize {
        [self.is_dirty, self.is_overweight, self.is_broken]
            .iter()
            .filter(|f| **f)
            .count()
    }

    pub fn level(&self) -> ConditionLevel {
        // at most three flags, never fails
        ConditionLevel::from_raised_flags(self.raised()).unwrap_or(ConditionLevel::Critical)
    }

    /// Wire form: `is_dirty=false,is_overweight=true,is_broken=false`
    pub fn to_condition_string(&self) -> String {
        format!(
            "is_dirty={},is_overweight={},is_broken={}",
            self.is_dirty, self.is_overweight, self.is_broken
        )
    }

    pub fn parse(condition: &str) -> Result<Self, ConditionParseError> {
        let malformed = || ConditionParseError::Malformed(condition.to_string());
        let mut parts = condition.split(',');
        let mut flag = |key: &str| -> Result<bool, ConditionParseError> {
            let part = parts.next().ok_or_else(malformed)?;
            let (k, v) = part.split_once('=').ok_or_else(malformed)?;
            if k != key {
                return Err(malformed());
            }
            v.parse::<bool>().map_err(|_| malformed())
        };

        let flags = ConditionFlags {
            is_dirty: flag("is_dirty")?,
            is_overweight: flag("is_overweight")?,
            is_broken: flag("is_broken")?,
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(flags)
    }
}

/// Level of a raw condition string, counted the way the target does:
/// occurrences of `=true`
pub fn level_of(condition: &str) -> Result<ConditionLevel, ConditionParseError> {
    ConditionLevel::from_raised_flags(condition.matches("=true").count())
}

/// One immutable synthetic reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub device_uuid: String,
    /// Virtual unix seconds
    pub timestamp: i64,
    pub is_sitting: bool,
    pub flags: ConditionFlags,
    pub message: String,
}

impl Condition {
    pub fn level(&self) -> ConditionLevel {
        self.flags.level()
    }

    pub fn condition_string(&self) -> String {
        self.flags.to_condition_string()
    }
}
