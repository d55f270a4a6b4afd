//! Firmware host: module catalogue, bootstrap and run loop.

mod orchestrator;
mod stats;

pub use orchestrator::{FirmwareHost, HostConfig};
pub use stats::RunStats;

use std::sync::Arc;

use contracts::{FirmwareConfig, ObjectId, RealTimeScheduler, TypedObjectStore};
use modules::altitude::{self, AltitudeModule};
use modules::ModuleRegistry;
use serde::Serialize;

/// Static description of a module the host can boot
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub enabled: bool,
    pub task: &'static str,
    pub priority: u8,
    pub stack_bytes: u32,
    pub stack_words: u32,
    pub period_ms: u32,
    /// Period at the configured tick rate
    pub period_ticks: u64,
    pub publishes: Vec<ObjectId>,
}

/// Every known module, with its settings under `config`
pub fn module_catalog(config: &FirmwareConfig) -> Vec<ModuleInfo> {
    let tick_rate = config.scheduler.tick_rate();
    let spec = AltitudeModule::task_spec();

    vec![ModuleInfo {
        name: altitude::MODULE_NAME,
        enabled: config.modules.altitude.enabled,
        task: altitude::TASK_NAME,
        priority: spec.priority.0,
        stack_bytes: altitude::STACK_SIZE_BYTES,
        stack_words: spec.stack_size_words,
        period_ms: altitude::SENSOR_PERIOD_MS,
        period_ticks: tick_rate.ms_to_ticks(altitude::SENSOR_PERIOD_MS),
        publishes: vec![ObjectId::SonarAltitude],
    }]
}

/// Register every enabled module, in boot order
pub fn build_registry(
    config: &FirmwareConfig,
    store: Arc<dyn TypedObjectStore>,
    scheduler: Arc<dyn RealTimeScheduler>,
) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    if config.modules.altitude.enabled {
        registry.register(AltitudeModule::descriptor(store, scheduler));
    }
    registry
}
