//! Scenario layer of condbench
//!
//! Everything that talks to the target: the verification pipeline, page
//! loads, the auth negative-test matrix, the device association service,
//! user behaviours and the orchestrator driving them.

pub mod actions;
pub mod api;
pub mod assets;
pub mod association;
pub mod auth_matrix;
pub mod behaviors;
pub mod context;
pub mod credentials;
pub mod error;
pub mod load;
pub mod orchestrator;
pub mod verify;

pub use actions::{ActionOutcome, ConditionQuery};
pub use assets::{PageType, StaticCache};
pub use association::{JiaService, PosterSettings, TargetPoster};
pub use auth_matrix::{run_auth_case, AuthCase};
pub use behaviors::{run_user, UserExit};
pub use context::{AgentFactory, ScenarioContext};
pub use credentials::{CredentialError, CredentialIssuer, JwtIssuer};
pub use error::{ScenarioError, ScenarioResult};
pub use load::{initialize_target, run_benchmark, run_load, RunReport};
pub use orchestrator::Orchestrator;
