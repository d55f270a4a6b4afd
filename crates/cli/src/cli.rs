//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// flightd - host runner for the flight software modules
#[derive(Parser, Debug)]
#[command(
    name = "flightd",
    author,
    version,
    about = "Run flight software modules on a host scheduler",
    long_about = "Boots the registered flight software modules on a host real-time scheduler.\n\n\
                  Every module is initialized before any module is started; each started \n\
                  module then publishes its objects periodically into the object store."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FLIGHTD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FLIGHTD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Boot the modules and run until the duration elapses or a signal arrives
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and module information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if omitted
    #[arg(short, long, env = "FLIGHTD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds (0 = run until Ctrl+C / SIGTERM)
    #[arg(long, default_value = "0", env = "FLIGHTD_DURATION_SECS")]
    pub duration_secs: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FLIGHTD_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without booting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "flightd.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults if omitted
    #[arg(short, long, env = "FLIGHTD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
