//! Run-wide state shared by every user task

use crate::association::JiaService;
use crate::credentials::CredentialIssuer;
use condbench_config::ScenarioConfig;
use condbench_core::{ErrorSink, GeneratorSettings, ScenarioCounters, VirtualClock};
use condbench_http::{HttpAgent, HttpConfig, MockTransport, Transport, TransportError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Creates one transport per virtual user, each with its own session
pub trait AgentFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn Transport>, TransportError>;
}

impl AgentFactory for HttpConfig {
    fn create(&self) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(HttpAgent::new(self.clone())?))
    }
}

/// All users share the mock's routes
impl AgentFactory for MockTransport {
    fn create(&self) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(self.clone()))
    }
}

/// Generator timing for every device of a run
pub fn generator_settings(config: &ScenarioConfig) -> GeneratorSettings {
    GeneratorSettings {
        interval: config.post_interval,
        pending_capacity: config.condition_channel_capacity,
    }
}

pub struct ScenarioContext {
    pub config: ScenarioConfig,
    pub clock: VirtualClock,
    pub counters: Arc<ScenarioCounters>,
    pub errors: ErrorSink,
    pub issuer: Arc<dyn CredentialIssuer>,
    pub jia: Arc<JiaService>,
    pub agents: Arc<dyn AgentFactory>,
    rng_streams: AtomicU64,
    auth_cases: AtomicUsize,
}

impl ScenarioContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ScenarioConfig,
        clock: VirtualClock,
        counters: Arc<ScenarioCounters>,
        errors: ErrorSink,
        issuer: Arc<dyn CredentialIssuer>,
        jia: Arc<JiaService>,
        agents: Arc<dyn AgentFactory>,
    ) -> Self {
        Self {
            config,
            clock,
            counters,
            errors,
            issuer,
            jia,
            agents,
            rng_streams: AtomicU64::new(0),
            auth_cases: AtomicUsize::new(0),
        }
    }

    /// Fresh generator for one user. With a configured seed, the n-th user
    /// always gets the same stream.
    pub fn user_rng(&self) -> StdRng {
        let stream = self.rng_streams.fetch_add(1, Ordering::Relaxed);
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))),
            None => StdRng::from_entropy(),
        }
    }

    /// Next auth negative-test case index, round robin across the run
    pub fn next_auth_case(&self) -> usize {
        self.auth_cases.fetch_add(1, Ordering::Relaxed)
    }

    /// Virtual start as unix seconds
    pub fn virtual_start_unix(&self) -> i64 {
        self.clock.virtual_start().timestamp()
    }
}
