//! Run statistics.

use std::time::Duration;

use modules::{ModuleState, WorkerMetricsSnapshot};
use observability::UpdateAggregator;
use rtos::TaskInfo;
use uavobjects::StoreMetricsSnapshot;

/// Outcome of one module's bootstrap
#[derive(Debug, Clone)]
pub struct ModuleSummary {
    pub name: String,
    pub state: ModuleState,
    pub error: Option<String>,
    pub worker: Option<WorkerMetricsSnapshot>,
}

/// Statistics from a firmware run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Scheduler tick at shutdown
    pub final_tick: u64,

    pub modules: Vec<ModuleSummary>,

    /// Task monitor snapshot
    pub tasks: Vec<TaskInfo>,

    pub store: Option<StoreMetricsSnapshot>,

    /// Latest altitude seen by the subscriber
    pub last_altitude: Option<f32>,

    /// SonarAltitude update stream, as seen by the host subscriber
    pub updates: UpdateAggregator,
}

impl RunStats {
    /// Observed update rate (Hz)
    pub fn update_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.updates.total_updates as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn running_modules(&self) -> usize {
        self.modules
            .iter()
            .filter(|module| module.state == ModuleState::Running)
            .count()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Final tick: {}", self.final_tick);
        println!("   ├─ Modules running: {}/{}", self.running_modules(), self.modules.len());
        println!("   └─ Tasks: {}", self.tasks.len());

        println!("\nModules");
        for (i, module) in self.modules.iter().enumerate() {
            let prefix = if i + 1 == self.modules.len() { "└─" } else { "├─" };
            println!("   {} {} [{}]", prefix, module.name, module.state);
            if let Some(ref error) = module.error {
                println!("   │     error: {}", error);
            }
            if let Some(worker) = module.worker {
                println!(
                    "   │     iterations={} publishes={} failures={} skipped={} overruns={} panics={}",
                    worker.iterations,
                    worker.publishes,
                    worker.publish_failures,
                    worker.skipped_reads,
                    worker.overruns,
                    worker.panics
                );
            }
        }

        if !self.tasks.is_empty() {
            println!("\nTasks");
            for task in &self.tasks {
                println!(
                    "   - #{} {} (priority {}, {} words, created at tick {})",
                    task.id, task.name, task.priority, task.stack_size_words, task.created_at
                );
            }
        }

        if let Some(store) = self.store {
            println!("\nObject Store");
            println!("   ├─ Registered objects: {}", store.registered);
            println!("   ├─ Updates: {}", store.update_count);
            println!("   ├─ Rejected writes: {}", store.rejected_count);
            println!("   └─ Dropped notifications: {}", store.dropped_count);
        }

        println!("\nSonarAltitude");
        match self.last_altitude {
            Some(altitude) => println!("   ├─ Last value: {:.2} m", altitude),
            None => println!("   ├─ Last value: (never published)"),
        }
        println!("   ├─ Update rate: {:.1} Hz", self.update_rate());
        for line in self.updates.summary().to_string().lines() {
            println!("   │  {}", line);
        }

        println!();
    }
}
