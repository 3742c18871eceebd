//! CLI command implementations

pub mod auth_check;
pub mod run;

pub use auth_check::*;
pub use run::*;
