//! Firmware host orchestrator - boots the modules and watches their output.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::Receiver;
use contracts::{
    FirmwareConfig, ObjectId, ObjectUpdate, SonarAltitudeData, TypedObjectStore, UavObject,
};
use modules::Bootstrap;
use rtos::{RealTimeScheduler, ThreadScheduler};
use tracing::{debug, info, warn};
use uavobjects::ObjectStore;

use super::stats::ModuleSummary;
use super::{build_registry, RunStats};
use crate::error::CliError;

/// Host run configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub firmware: FirmwareConfig,

    /// Stop after this long (None = until shutdown signal)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Boots the firmware on a `ThreadScheduler` and observes it
pub struct FirmwareHost {
    config: HostConfig,
}

impl FirmwareHost {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    /// Boot, then observe until the duration elapses or `shutdown` resolves
    ///
    /// Module tasks are never stopped; they end with the process.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let start_time = Instant::now();
        let firmware = &self.config.firmware;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let scheduler = Arc::new(ThreadScheduler::from_config(&firmware.scheduler));
        let store = Arc::new(ObjectStore::with_config(firmware.object_store.clone()));

        info!(
            tick_rate_hz = firmware.scheduler.tick_rate_hz,
            max_tasks = firmware.scheduler.max_tasks,
            stack_pool_words = firmware.scheduler.stack_pool_words,
            "Host scheduler ready"
        );

        // Subscribe first so the first publish is observed
        let updates = subscribe_altitude(firmware, &store);

        // Bootstrap
        let registry = build_registry(firmware, store.clone(), scheduler.clone());
        info!(modules = ?registry.names(), "Booting modules");

        let system = Bootstrap::new(firmware.bootstrap.init_failure_policy)
            .run(registry)
            .map_err(CliError::from)
            .context("Bootstrap failed")?;

        if system.running() == 0 {
            warn!("No module is running");
        }

        // Observe
        let mut stats = RunStats::default();
        let deadline = self
            .config
            .duration
            .map(|duration| tokio::time::Instant::now() + duration);
        tokio::pin!(shutdown);

        info!(duration = ?self.config.duration, "Firmware running");

        loop {
            tokio::select! {
                update = next_update(updates.as_ref()) => {
                    let Some(update) = update else {
                        warn!("Update stream closed");
                        break;
                    };
                    let at_ms = start_time.elapsed().as_secs_f64() * 1000.0;
                    if let Some(data) = SonarAltitudeData::from_payload(&update.payload) {
                        stats.last_altitude = Some(data.altitude);
                    }
                    stats.updates.update(&update, at_ms);
                    debug!(sequence = update.sequence, at_ms, "SonarAltitude update");
                }
                _ = wait_until(deadline) => {
                    info!("Run duration reached");
                    break;
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping...");
                    break;
                }
            }
        }

        // Collect
        stats.duration = start_time.elapsed();
        stats.final_tick = scheduler.current_tick();
        stats.tasks = scheduler.tasks();
        stats.store = Some(store.metrics().snapshot());
        stats.modules = system
            .records()
            .iter()
            .map(|record| ModuleSummary {
                name: record.name.clone(),
                state: record.state,
                error: record.error.as_ref().map(ToString::to_string),
                worker: system.metrics(&record.name).map(|m| m.snapshot()),
            })
            .collect();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            updates = stats.updates.total_updates,
            rate_hz = format!("{:.1}", stats.update_rate()),
            "Firmware host stopped"
        );

        Ok(stats)
    }
}

/// Register `SonarAltitude` ahead of its producer and subscribe to it
///
/// Registration is idempotent, so the module's own `initialize` still succeeds.
fn subscribe_altitude(
    firmware: &FirmwareConfig,
    store: &ObjectStore,
) -> Option<Receiver<ObjectUpdate>> {
    if !firmware.modules.altitude.enabled {
        return None;
    }

    match store
        .initialize(ObjectId::SonarAltitude)
        .and_then(|()| store.subscribe(ObjectId::SonarAltitude))
    {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!(error = %e, "Cannot subscribe to SonarAltitude, nothing to observe");
            None
        }
    }
}

async fn next_update(updates: Option<&Receiver<ObjectUpdate>>) -> Option<ObjectUpdate> {
    match updates {
        Some(rx) => rx.recv().await.ok(),
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
