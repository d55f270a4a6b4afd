//! Sonar Altitude on Virtual Time
//!
//! Boots the altitude module on the lock-step scheduler and prints the tick
//! of every published update. No wall-clock sleeping is involved, so the
//! tick grid printed is exact.
//!
//! Run with: cargo run --bin sim_altitude [config.toml] [ticks]

use std::sync::Arc;

use config_loader::ConfigLoader;
use contracts::{
    FirmwareConfig, ObjectId, ObjectPayload, RealTimeScheduler, SonarAltitudeData,
    TypedObjectStore, UavObject,
};
use modules::{AltitudeModule, Bootstrap, ModuleRegistry};
use observability::ObservabilityConfig;
use rtos::{SimScheduler, TaskLimits};
use uavobjects::ObjectStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_with_config(&ObservabilityConfig::default())?;

    let mut args = std::env::args().skip(1);
    let firmware = match args.next() {
        Some(path) => {
            tracing::info!(path = %path, "Loading firmware config");
            ConfigLoader::load_from_path(std::path::Path::new(&path))?
        }
        None => FirmwareConfig::default(),
    };
    let ticks: u64 = match args.next() {
        Some(n) => n.parse()?,
        None => 60,
    };

    let scheduler = Arc::new(SimScheduler::new(
        firmware.scheduler.tick_rate(),
        TaskLimits::from(&firmware.scheduler),
    ));
    let store = Arc::new(ObjectStore::with_config(firmware.object_store.clone()));

    // Subscribe before boot to see the tick-0 update
    store.initialize(ObjectId::SonarAltitude)?;
    let updates = store.subscribe(ObjectId::SonarAltitude)?;

    let mut registry = ModuleRegistry::new();
    registry.register(AltitudeModule::descriptor(store.clone(), scheduler.clone()));

    let system = Bootstrap::new(firmware.bootstrap.init_failure_policy).run(registry)?;
    tracing::info!(running = system.running(), "Modules booted");

    scheduler.settle();
    for _ in 0..ticks {
        while let Ok(update) = updates.try_recv() {
            print_update(scheduler.current_tick(), &update.payload, update.sequence);
        }
        scheduler.advance(1);
    }
    while let Ok(update) = updates.try_recv() {
        print_update(scheduler.current_tick(), &update.payload, update.sequence);
    }

    for task in scheduler.tasks() {
        println!(
            "task '{}' priority {} stack {} words, created at tick {}",
            task.name, task.priority.0, task.stack_size_words, task.created_at
        );
    }

    let metrics = store.metrics().snapshot();
    println!(
        "store: {} updates, {} rejected, {} dropped",
        metrics.update_count, metrics.rejected_count, metrics.dropped_count
    );

    Ok(())
}

fn print_update(tick: u64, payload: &ObjectPayload, sequence: u64) {
    match SonarAltitudeData::from_payload(payload) {
        Some(data) => println!(
            "tick {:>5}  seq {:>4}  altitude {:.1} m",
            tick, sequence, data.altitude
        ),
        None => println!("tick {:>5}  seq {:>4}  unexpected payload", tick, sequence),
    }
}
