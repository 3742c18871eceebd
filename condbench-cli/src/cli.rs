//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full benchmark and print the report as JSON
    Run {
        /// Base URL of the target, overrides the configuration
        #[arg(long, value_name = "URL")]
        target: Option<String>,

        /// Length of the load phase in seconds
        #[arg(long, value_name = "SECONDS")]
        duration: Option<u64>,
    },

    /// Run the auth negative-test cases against the target
    AuthCheck {
        /// Base URL of the target, overrides the configuration
        #[arg(long, value_name = "URL")]
        target: Option<String>,

        /// Number of cases, taken round robin
        #[arg(long, value_name = "N", default_value_t = 8)]
        cases: usize,
    },

    /// Print a sample configuration file
    GenerateConfig,
}
