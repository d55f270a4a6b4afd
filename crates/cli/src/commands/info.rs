//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::FirmwareConfig;
use serde::Serialize;

use super::load_config;
use crate::cli::InfoArgs;
use crate::firmware::{module_catalog, ModuleInfo};

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    config: FirmwareConfig,
    modules: Vec<ModuleInfo>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let firmware = load_config(args.config.as_deref())?;

    if args.json {
        let info = ConfigInfo {
            modules: module_catalog(&firmware),
            config: firmware,
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&firmware);
    }

    Ok(())
}

fn print_config_info(firmware: &FirmwareConfig) {
    println!("=== flightd configuration ===\n");

    println!("Scheduler");
    println!("   ├─ Tick rate: {} Hz", firmware.scheduler.tick_rate_hz);
    println!("   ├─ Task slots: {}", firmware.scheduler.max_tasks);
    println!("   └─ Stack pool: {} words", firmware.scheduler.stack_pool_words);

    println!("\nObject Store");
    println!("   ├─ Max objects: {}", firmware.object_store.max_objects);
    println!(
        "   └─ Subscriber queue: {}",
        firmware.object_store.subscriber_queue
    );

    println!("\nBootstrap");
    println!(
        "   └─ Init failure policy: {:?}",
        firmware.bootstrap.init_failure_policy
    );

    let catalog = module_catalog(firmware);
    println!("\nModules ({})", catalog.len());
    for (i, module) in catalog.iter().enumerate() {
        let is_last = i + 1 == catalog.len();
        let prefix = if is_last { "└─" } else { "├─" };
        let child = if is_last { "   " } else { "│  " };
        let state = if module.enabled { "enabled" } else { "disabled" };

        println!("   {} {} ({})", prefix, module.name, state);
        println!("   {}  ├─ Task: {} (priority {})", child, module.task, module.priority);
        println!(
            "   {}  ├─ Stack: {} bytes ({} words)",
            child, module.stack_bytes, module.stack_words
        );
        println!(
            "   {}  ├─ Period: {} ms ({} ticks)",
            child, module.period_ms, module.period_ticks
        );
        let objects: Vec<_> = module.publishes.iter().map(|id| id.name()).collect();
        println!("   {}  └─ Publishes: {}", child, objects.join(", "));
    }

    println!();
}
