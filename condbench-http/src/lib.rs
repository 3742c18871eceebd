//! HTTP transport for condbench
//!
//! Every virtual user owns one [`HttpAgent`]: a reqwest client with its own
//! cookie jar, bound to the target's base URL. Verification code talks to
//! the agent through the [`Transport`] trait so it can be exercised against
//! a [`MockTransport`] in tests.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export main types for convenience
pub use client::{HttpAgent, Transport};
pub use config::HttpConfig;
pub use errors::TransportError;
pub use types::{FormPart, HttpMethod, HttpRequest, HttpResponse, RequestBody};

#[cfg(feature = "mock")]
pub use mock::MockTransport;
