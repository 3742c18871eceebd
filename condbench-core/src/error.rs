//! Verification error taxonomy
//!
//! Everything except [`BenchError::Critical`] is soft: it is recorded and the
//! virtual user keeps going.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Http,
    StatusMismatch,
    Schema,
    DataMismatch,
    Critical,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Http,
        ErrorKind::StatusMismatch,
        ErrorKind::Schema,
        ErrorKind::DataMismatch,
        ErrorKind::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Http => "http",
            ErrorKind::StatusMismatch => "status_mismatch",
            ErrorKind::Schema => "schema",
            ErrorKind::DataMismatch => "data_mismatch",
            ErrorKind::Critical => "critical",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchError {
    /// Request could not be sent or the response could not be read
    #[error("{request}: request failed: {message}")]
    Http {
        request: String,
        message: String,
        timeout: bool,
    },

    #[error("{request}: expected status {expected:?}, got {actual}: {body}")]
    StatusMismatch {
        request: String,
        expected: Vec<u16>,
        actual: u16,
        body: String,
    },

    #[error("{request}: invalid response shape: {message}")]
    Schema { request: String, message: String },

    /// First record that diverges from ground truth
    #[error("{request}: record {index} field '{field}' expected {expected}, got {actual}")]
    DataMismatch {
        request: String,
        index: usize,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("critical: {message}")]
    Critical { message: String },
}

impl BenchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BenchError::Http { .. } => ErrorKind::Http,
            BenchError::StatusMismatch { .. } => ErrorKind::StatusMismatch,
            BenchError::Schema { .. } => ErrorKind::Schema,
            BenchError::DataMismatch { .. } => ErrorKind::DataMismatch,
            BenchError::Critical { .. } => ErrorKind::Critical,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, BenchError::Critical { .. })
    }

    pub fn schema(request: impl Into<String>, message: impl Into<String>) -> Self {
        BenchError::Schema {
            request: request.into(),
            message: message.into(),
        }
    }

    pub fn data_mismatch(
        request: impl Into<String>,
        index: usize,
        field: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        BenchError::DataMismatch {
            request: request.into(),
            index,
            field: field.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        BenchError::Critical {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_display() {
        let err = BenchError::StatusMismatch {
            request: "GET /api/isu".to_string(),
            expected: vec![200],
            actual: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::StatusMismatch);
        assert!(!err.is_critical());
        assert_eq!(
            err.to_string(),
            "GET /api/isu: expected status [200], got 500: boom"
        );

        let err = BenchError::data_mismatch("GET /api/condition/x", 2, "timestamp", 10, 11);
        assert_eq!(err.kind(), ErrorKind::DataMismatch);
        assert!(err.to_string().contains("record 2 field 'timestamp'"));

        assert!(BenchError::critical("signing failed").is_critical());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = BenchError::schema("GET /api/trend", "missing field `character`");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "schema");
        assert_eq!(value["request"], "GET /api/trend");
    }
}
