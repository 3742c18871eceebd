//! Population management under a shared virtual clock
//!
//! The orchestrator owns the run's cancellation token and task tracker.
//! Every user task and every device generator is spawned on the same
//! tracker, so [`Orchestrator::wait`] returns only once all of them have
//! observed cancellation and exited.

use crate::association::{JiaService, PosterSettings};
use crate::behaviors::{run_user, UserExit};
use crate::context::{generator_settings, AgentFactory, ScenarioContext};
use crate::credentials::CredentialIssuer;
use crate::error::{ScenarioError, ScenarioResult};
use chrono::{DateTime, Utc};
use condbench_config::ScenarioConfig;
use condbench_core::{
    CountersSnapshot, ErrorSink, ErrorSummary, PopulationGuard, ScenarioCounters, UserKind, VirtualClock,
};
use condbench_logging::spawn_periodic_reporter;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub struct Orchestrator {
    config: ScenarioConfig,
    agents: Arc<dyn AgentFactory>,
    issuer: Arc<dyn CredentialIssuer>,
    poster: PosterSettings,
    context: OnceLock<Arc<ScenarioContext>>,
    counters: Arc<ScenarioCounters>,
    errors: ErrorSink,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Orchestrator {
    pub fn new(
        config: ScenarioConfig,
        agents: Arc<dyn AgentFactory>,
        issuer: Arc<dyn CredentialIssuer>,
        poster: PosterSettings,
    ) -> Self {
        Self {
            config,
            agents,
            issuer,
            poster,
            context: OnceLock::new(),
            counters: ScenarioCounters::new(),
            errors: ErrorSink::new(),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Fix the mapping from real to virtual time. Must happen once, before
    /// any user is added.
    pub fn set_virtual_clock(
        &self,
        real_start: DateTime<Utc>,
        virtual_start: DateTime<Utc>,
        multiplier: u32,
    ) -> ScenarioResult<VirtualClock> {
        if self.context.get().is_some() {
            return Err(ScenarioError::ClockAlreadySet);
        }
        let clock = VirtualClock::new(real_start, virtual_start, multiplier);
        let jia = JiaService::new(
            clock,
            generator_settings(&self.config),
            self.poster.clone(),
            self.cancel.clone(),
            self.tracker.clone(),
        );
        let context = Arc::new(ScenarioContext::new(
            self.config.clone(),
            clock,
            self.counters.clone(),
            self.errors.clone(),
            self.issuer.clone(),
            jia,
            self.agents.clone(),
        ));
        self.context
            .set(context)
            .map_err(|_| ScenarioError::ClockAlreadySet)?;
        info!(
            "Virtual clock set: {} at x{}",
            virtual_start.to_rfc3339(),
            clock.multiplier()
        );
        Ok(clock)
    }

    fn context(&self) -> ScenarioResult<&Arc<ScenarioContext>> {
        self.context.get().ok_or(ScenarioError::ClockNotSet)
    }

    pub fn clock(&self) -> Option<VirtualClock> {
        self.context.get().map(|ctx| ctx.clock)
    }

    /// Association service of this run, available once the clock is set
    pub fn jia(&self) -> Option<Arc<JiaService>> {
        self.context.get().map(|ctx| ctx.jia.clone())
    }

    /// Launch `count` users of `kind`. A non-positive count does nothing.
    pub fn add_users(&self, kind: UserKind, count: i64) -> ScenarioResult<usize> {
        if count <= 0 {
            return Ok(0);
        }
        let ctx = self.context()?;
        if self.cancel.is_cancelled() {
            warn!("Run already cancelled, not adding {} {} users", count, kind);
            return Ok(0);
        }

        for _ in 0..count {
            let guard = PopulationGuard::acquire(self.counters.clone(), kind);
            let ctx = ctx.clone();
            let run = self.cancel.clone();
            self.tracker.spawn(async move {
                let _guard = guard;
                if run_user(ctx, kind, run.child_token()).await == UserExit::Critical {
                    error!("Critical error in {} user, cancelling run", kind);
                    run.cancel();
                }
            });
        }
        debug!("Added {} {} users", count, kind);
        Ok(count as usize)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Join every user and generator task. Call after [`Self::cancel`].
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("All scenario tasks finished");
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub fn errors(&self) -> &ErrorSink {
        &self.errors
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Log the counters every `report_interval` until the run is cancelled
    pub fn spawn_reporter(&self) -> JoinHandle<()> {
        let counters = self.counters.clone();
        let errors = self.errors.clone();
        spawn_periodic_reporter(self.config.report_interval, self.cancel.clone(), move || {
            Diagnostics {
                counters: counters.snapshot(),
                errors: errors.summary(),
            }
        })
    }
}

#[derive(Debug, Serialize)]
struct Diagnostics {
    counters: CountersSnapshot,
    errors: ErrorSummary,
}
