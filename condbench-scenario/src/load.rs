//! Load phase driver and run report

use crate::actions::initialize;
use crate::association::PosterSettings;
use crate::credentials::JwtIssuer;
use crate::error::{ScenarioError, ScenarioResult};
use crate::orchestrator::Orchestrator;
use chrono::{DateTime, Utc};
use condbench_config::BenchConfig;
use condbench_core::{BenchError, CountersSnapshot, ErrorSummary, UserKind};
use condbench_http::{HttpAgent, HttpConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of one benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    /// Implementation language reported by the target
    pub language: String,
    pub counters: CountersSnapshot,
    pub errors: ErrorSummary,
    pub error_list: Vec<BenchError>,
    pub critical: bool,
}

impl RunReport {
    pub fn collect(
        orchestrator: &Orchestrator,
        language: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let sink = orchestrator.errors();
        Self {
            started_at,
            finished_at,
            duration_secs: (finished_at - started_at).num_milliseconds() as f64 / 1000.0,
            language: language.into(),
            counters: orchestrator.counters(),
            errors: sink.summary(),
            error_list: sink.snapshot(),
            critical: sink.has_critical(),
        }
    }
}

/// Initial population, then the fixed ramp until `duration` elapses or the
/// run is cancelled. Returns after every task has been joined.
pub async fn run_load(orchestrator: &Orchestrator, duration: Duration) -> ScenarioResult<()> {
    let config = orchestrator.config().clone();
    orchestrator.add_users(UserKind::Normal, config.initial_normal_users.into())?;
    orchestrator.add_users(UserKind::Maniac, config.initial_maniac_users.into())?;
    orchestrator.add_users(UserKind::Company, config.initial_company_users.into())?;
    info!(
        "Load started with {} users for {:?}",
        orchestrator.counters().total_active(),
        duration
    );

    let cancel = orchestrator.cancel_token();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut ramp = tokio::time::interval(config.ramp_interval.max(Duration::from_millis(1)));
    // first tick completes immediately
    ramp.tick().await;

    let mut step = 0u32;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Load cancelled early");
                break;
            }
            _ = &mut deadline => break,
            _ = ramp.tick() => {
                step += 1;
                orchestrator.add_users(UserKind::Normal, config.ramp_normal_users.into())?;
                orchestrator.add_users(UserKind::Company, config.ramp_company_users.into())?;
                info!(
                    "Ramp step {}: {} users active",
                    step,
                    orchestrator.counters().total_active()
                );
            }
        }
    }

    orchestrator.cancel();
    orchestrator.wait().await;
    info!("Load finished");
    Ok(())
}

/// `POST /initialize` with its own deadline; returns the reported language
pub async fn initialize_target(http: HttpConfig, jia_service_url: &str) -> ScenarioResult<String> {
    let agent = HttpAgent::new(http)?;
    let (response, errors) = initialize(&agent, jia_service_url).await.into_parts();
    match response {
        Some(response) if errors.is_empty() => Ok(response.language),
        _ => {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            Err(ScenarioError::Initialize(reasons.join("; ")))
        }
    }
}

/// Full run: association service, initialize, load, report
pub async fn run_benchmark(config: BenchConfig) -> ScenarioResult<RunReport> {
    let http = HttpConfig::from(config.target.clone());
    let poster = PosterSettings {
        user_agent: config.association.poster_user_agent.clone(),
        http: http.clone(),
    };
    let orchestrator = Orchestrator::new(
        config.scenario.clone(),
        Arc::new(http.clone()),
        Arc::new(JwtIssuer::new()?),
        poster,
    );

    let started_at = Utc::now();
    orchestrator.set_virtual_clock(
        started_at,
        config.scenario.virtual_time_start,
        config.scenario.virtual_time_multiplier,
    )?;
    let jia = orchestrator.jia().ok_or(ScenarioError::ClockNotSet)?;
    let (_, server) = jia.serve(&config.association.bind_address).await?;

    let language = match initialize_target(
        http.with_timeout(config.target.initialize_timeout),
        &config.association.public_url,
    )
    .await
    {
        Ok(language) => language,
        Err(e) => {
            error!("{}", e);
            orchestrator.cancel();
            orchestrator.wait().await;
            if let Err(join) = server.await {
                warn!("Association service task failed: {}", join);
            }
            return Err(e);
        }
    };
    info!("Target initialized, language: {}", language);

    let reporter = orchestrator.spawn_reporter();
    let loaded = run_load(&orchestrator, config.scenario.load_duration).await;

    for (name, handle) in [("reporter", reporter), ("association service", server)] {
        if let Err(join) = handle.await {
            warn!("{} task failed: {}", name, join);
        }
    }
    loaded?;

    Ok(RunReport::collect(&orchestrator, language, started_at, Utc::now()))
}
