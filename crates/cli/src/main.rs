//! # flightd
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Module bootstrap on the host scheduler
//! - Graceful shutdown handling

mod cli;
mod commands;
mod error;
mod firmware;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_firmware, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "flightd starting");

    let result = match &cli.command {
        Commands::Run(args) => run_firmware(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let config = ObservabilityConfig {
        log_format: cli.log_format.clone().into(),
        ..ObservabilityConfig::for_verbosity(cli.verbose, cli.quiet)
    };
    observability::init_with_config(&config)
}
