use anyhow::{Context, Result};
use condbench_config::BenchConfig;
use condbench_scenario::{run_benchmark, RunReport};
use std::time::Duration;
use tracing::{info, warn};

/// Apply command line overrides on top of the loaded configuration
pub fn apply_run_overrides(config: &mut BenchConfig, target: Option<&String>, duration: Option<u64>) {
    if let Some(target) = target {
        config.target.base_url = target.clone();
    }
    if let Some(secs) = duration {
        config.scenario.load_duration = Duration::from_secs(secs);
    }
}

/// Run the benchmark; returns the report for the caller to print
pub async fn run_command(config: BenchConfig) -> Result<RunReport> {
    info!(
        "Benchmarking {} for {:?}",
        config.target.base_url, config.scenario.load_duration
    );
    let report = run_benchmark(config).await.context("Benchmark failed")?;

    if report.critical {
        warn!("Run finished with critical errors");
    }
    info!(
        "{} errors over {:.1}s",
        report.errors.total, report.duration_secs
    );
    Ok(report)
}
