use condbench_http::TransportError;
use thiserror::Error;

use crate::credentials::CredentialError;

pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Errors that stop a scenario component from running at all.
///
/// Verification failures are not errors at this level; they are
/// [`condbench_core::BenchError`]s collected per action.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Virtual clock already set")]
    ClockAlreadySet,

    #[error("Virtual clock not set")]
    ClockNotSet,

    #[error("Association service error: {0}")]
    Association(String),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Initialize failed: {0}")]
    Initialize(String),
}
