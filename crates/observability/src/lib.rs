//! # Observability
//!
//! Tracing and Prometheus metrics for the flight software host.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact)
//! - Prometheus metrics export
//! - Publish/overrun/module-state recording helpers
//! - Update stream aggregation for run summaries
//!
//! ## Usage Example
//!
//! ```ignore
//! use observability::{metrics, ObservabilityConfig};
//!
//! observability::init_with_config(&ObservabilityConfig::for_verbosity(1, false))?;
//!
//! store.set_object(data)?;
//! metrics::record_publish("altitude", tick);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_module_state, record_overrun, record_publish, record_publish_failure,
    record_skipped_read, record_worker_panic, RunningStats, StatsSummary, UpdateAggregator,
    UpdateSummary,
};

/// Logging and metrics settings for one process
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Level used when RUST_LOG is unset or ignored
    pub log_level: String,
    /// Let RUST_LOG override `log_level`
    pub honor_rust_log: bool,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            log_level: "info".to_string(),
            honor_rust_log: true,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// Settings for `-v` repeated `verbose` times, or `-q`
    ///
    /// Quiet pins the level to `warn` regardless of RUST_LOG.
    pub fn for_verbosity(verbose: u8, quiet: bool) -> Self {
        let (log_level, honor_rust_log) = if quiet {
            ("warn", false)
        } else {
            match verbose {
                0 => ("info", true),
                1 => ("debug", true),
                _ => ("trace", true),
            }
        };

        Self {
            log_level: log_level.to_string(),
            honor_rust_log,
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        if self.honor_rust_log {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
        } else {
            EnvFilter::new(&self.log_level)
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON
    Json,
    /// Human readable, multi-line
    Pretty,
    /// Single line
    #[default]
    Compact,
}

/// Install the tracing subscriber, then the Prometheus exporter if a port is set
///
/// Fails if a global subscriber is already installed.
pub fn init_with_config(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_thread_names(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        log_level = %config.log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Initialize only the Prometheus exporter
///
/// For processes where tracing is set up elsewhere.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
