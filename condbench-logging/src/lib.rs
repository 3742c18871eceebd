//! Structured logging infrastructure for condbench
//!
//! This crate provides:
//! - tracing-subscriber initialisation from [`LoggingConfig`]
//! - a fire-and-forget periodic diagnostics reporter

pub mod init;
pub mod report;

// Re-export main types for convenience
pub use condbench_config::LoggingConfig;
pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
pub use report::{spawn_periodic_reporter, DIAGNOSTICS_TARGET};
