//! Domain-driven configuration management for condbench
//!
//! Configuration is split by functional domain (target server, scenario,
//! association service, logging), with validation, defaults, and
//! environment variable support.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    association::AssociationConfig, logging::LoggingConfig, scenario::ScenarioConfig,
    target::TargetConfig, BenchConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration, serde_duration_millis};
