//! `run` command implementation.

use anyhow::Result;
use contracts::FirmwareConfig;
use std::time::Duration;
use tracing::info;

use super::load_config;
use crate::cli::RunArgs;
use crate::firmware::{module_catalog, FirmwareHost, HostConfig};

/// Execute the `run` command
pub async fn run_firmware(args: &RunArgs) -> Result<()> {
    let firmware = load_config(args.config.as_deref())?;

    info!(
        tick_rate_hz = firmware.scheduler.tick_rate_hz,
        policy = ?firmware.bootstrap.init_failure_policy,
        altitude = firmware.modules.altitude.enabled,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&firmware);
        return Ok(());
    }

    let host = FirmwareHost::new(HostConfig {
        firmware,
        duration: if args.duration_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration_secs))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    let stats = host.run(shutdown_signal()).await?;
    stats.print_summary();

    info!("flightd finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(firmware: &FirmwareConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Scheduler:");
    println!("  Tick rate: {} Hz", firmware.scheduler.tick_rate_hz);
    println!("  Max tasks: {}", firmware.scheduler.max_tasks);
    println!("  Stack pool: {} words", firmware.scheduler.stack_pool_words);
    println!("\nBootstrap:");
    println!(
        "  Init failure policy: {:?}",
        firmware.bootstrap.init_failure_policy
    );

    println!("\nModules:");
    for module in module_catalog(firmware) {
        let state = if module.enabled { "enabled" } else { "disabled" };
        println!(
            "  - {} ({}) task '{}' every {} ticks",
            module.name, state, module.task, module.period_ticks
        );
    }

    println!();
}
