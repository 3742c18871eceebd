//! Response shapes of the target's JSON API
//!
//! Required fields are non-`Option`, so a missing or null field already
//! fails at decode time. [`Validate`] adds the checks serde cannot express,
//! such as "present but empty".

use serde::{Deserialize, Serialize};

pub trait Validate {
    /// `Err` names the first violated constraint
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        for (i, item) in self.iter().enumerate() {
            item.validate().map_err(|e| format!("[{}]: {}", i, e))?;
        }
        Ok(())
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err(format!("field `{}` is empty", field))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub language: String,
}

impl Validate for InitializeResponse {
    fn validate(&self) -> Result<(), String> {
        non_empty("language", &self.language)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeResponse {
    pub jia_user_id: String,
}

impl Validate for MeResponse {
    fn validate(&self) -> Result<(), String> {
        non_empty("jia_user_id", &self.jia_user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResponse {
    pub jia_isu_uuid: String,
    pub isu_name: String,
    pub timestamp: i64,
    pub is_sitting: bool,
    pub condition: String,
    pub condition_level: String,
    pub message: String,
}

impl Validate for ConditionResponse {
    fn validate(&self) -> Result<(), String> {
        non_empty("jia_isu_uuid", &self.jia_isu_uuid)?;
        non_empty("condition", &self.condition)?;
        non_empty("condition_level", &self.condition_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsuResponse {
    pub id: i64,
    pub jia_isu_uuid: String,
    pub name: String,
    pub character: String,
}

impl Validate for IsuResponse {
    fn validate(&self) -> Result<(), String> {
        non_empty("jia_isu_uuid", &self.jia_isu_uuid)?;
        non_empty("character", &self.character)
    }
}

/// Entry of `GET /api/isu`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsuListEntry {
    pub id: i64,
    pub jia_isu_uuid: String,
    pub name: String,
    pub character: String,
    #[serde(default)]
    pub latest_isu_condition: Option<ConditionResponse>,
}

impl Validate for IsuListEntry {
    fn validate(&self) -> Result<(), String> {
        non_empty("jia_isu_uuid", &self.jia_isu_uuid)?;
        non_empty("character", &self.character)?;
        if let Some(latest) = &self.latest_isu_condition {
            latest
                .validate()
                .map_err(|e| format!("latest_isu_condition: {}", e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphPercentage {
    pub sitting: i64,
    pub is_broken: i64,
    pub is_dirty: i64,
    pub is_overweight: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub score: i64,
    pub percentage: GraphPercentage,
}

/// One hour of `GET /api/isu/{id}/graph`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub start_at: i64,
    pub end_at: i64,
    #[serde(default)]
    pub data: Option<GraphData>,
    pub condition_timestamps: Vec<i64>,
}

impl Validate for GraphEntry {
    fn validate(&self) -> Result<(), String> {
        if self.end_at <= self.start_at {
            return Err(format!("end_at {} not after start_at {}", self.end_at, self.start_at));
        }
        if let Some(data) = &self.data {
            let p = data.percentage;
            for (name, value) in [
                ("sitting", p.sitting),
                ("is_broken", p.is_broken),
                ("is_dirty", p.is_dirty),
                ("is_overweight", p.is_overweight),
            ] {
                if !(0..=100).contains(&value) {
                    return Err(format!("percentage.{} out of range: {}", name, value));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendCondition {
    pub isu_id: i64,
    pub timestamp: i64,
}

/// One character's bucket of `GET /api/trend`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub character: String,
    pub info: Vec<TrendCondition>,
    pub warning: Vec<TrendCondition>,
    pub critical: Vec<TrendCondition>,
}

impl Validate for TrendEntry {
    fn validate(&self) -> Result<(), String> {
        non_empty("character", &self.character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_field_fails_decode() {
        let result: Result<IsuResponse, _> =
            serde_json::from_str(r#"{"id":1,"jia_isu_uuid":"u","name":"n"}"#);
        assert!(result.is_err());

        let result: Result<IsuResponse, _> =
            serde_json::from_str(r#"{"id":1,"jia_isu_uuid":"u","name":"n","character":null}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_latest_condition() {
        let entry: IsuListEntry = serde_json::from_str(
            r#"{"id":1,"jia_isu_uuid":"u","name":"n","character":"calm"}"#,
        )
        .unwrap();
        assert!(entry.latest_isu_condition.is_none());
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let list = vec![
            TrendEntry {
                character: "calm".to_string(),
                info: vec![],
                warning: vec![],
                critical: vec![],
            },
            TrendEntry {
                character: String::new(),
                info: vec![],
                warning: vec![],
                critical: vec![],
            },
        ];
        assert_eq!(list.validate().unwrap_err(), "[1]: field `character` is empty");
    }

    #[test]
    fn test_graph_percentage_range() {
        let entry = GraphEntry {
            start_at: 0,
            end_at: 3600,
            data: Some(GraphData {
                score: 100,
                percentage: GraphPercentage {
                    sitting: 120,
                    is_broken: 0,
                    is_dirty: 0,
                    is_overweight: 0,
                },
            }),
            condition_timestamps: vec![],
        };
        assert!(entry.validate().unwrap_err().contains("sitting"));
    }
}
