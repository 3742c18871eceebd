//! Core domain model for condbench
//!
//! Virtual users own devices; each device runs a synthetic condition
//! generator whose readings are drained into ordered ground-truth stores
//! that verification reads back.

pub mod clock;
pub mod condition;
pub mod counters;
pub mod device;
pub mod error;
pub mod generator;
pub mod sink;
pub mod store;
pub mod user;

pub use clock::VirtualClock;
pub use condition::{Condition, ConditionFlags, ConditionLevel, ConditionParseError};
pub use counters::{CountersSnapshot, PopulationGuard, ScenarioCounters};
pub use device::{Character, Device, DeviceStateChange, GeneratorStreams};
pub use error::{BenchError, ErrorKind};
pub use generator::{ConditionGenerator, ConditionPoster, GeneratorSettings};
pub use sink::{ErrorSink, ErrorSummary};
pub use store::ConditionStore;
pub use user::{UserKind, VirtualUser};
