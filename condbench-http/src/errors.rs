//! Transport error types

/// Failure to complete an HTTP exchange at all. A response with an
/// unexpected status is not a transport error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("No mock response for {0}")]
    NoMock(String),
}

impl TransportError {
    /// Whether the exchange failed because the deadline elapsed
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout(_) => true,
            TransportError::NetworkError(e) => e.is_timeout(),
            _ => false,
        }
    }
}
