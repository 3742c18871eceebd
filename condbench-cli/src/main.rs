use anyhow::{Context, Result};
use clap::Parser;
use condbench_config::{BenchConfig, ConfigLoader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{apply_run_overrides, auth_check_command, run_command};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<BenchConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

fn init_logging(config: &BenchConfig, log_level: Option<&String>) -> Result<()> {
    match log_level {
        Some(level) => condbench_logging::init_simple_tracing(level),
        None => condbench_logging::init_logging_from_config(&config.logging),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig = cli.command {
        println!("{}", BenchConfig::generate_sample());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = load_config(cli.config.as_ref())?;
    init_logging(&config, cli.log_level.as_ref())?;
    info!("condbench starting");

    match &cli.command {
        Commands::Run { target, duration } => {
            apply_run_overrides(&mut config, target.as_ref(), *duration);
            let report = run_command(config).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to format report as JSON")?
            );
            Ok(if report.critical {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::AuthCheck { target, cases } => {
            apply_run_overrides(&mut config, target.as_ref(), None);
            let (lines, passed) = auth_check_command(&config, *cases).await?;
            for line in lines {
                println!("{}", line);
            }
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::GenerateConfig => Ok(ExitCode::SUCCESS),
    }
}
