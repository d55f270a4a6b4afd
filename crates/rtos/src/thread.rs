//! Wall-clock scheduler backed by OS threads
//!
//! Ticks are derived from a monotonic epoch and the tick rate. Priorities are
//! recorded in the task monitor but not enforced: the host OS decides.
//! Stack budgets are accounted against the stack pool; the OS thread itself
//! gets the platform default stack.

use std::thread;
use std::time::Instant;

use contracts::{
    ContractError, RealTimeScheduler, SchedulerConfig, TaskEntry, TaskHandle, TaskSpec, Tick,
    TickRate,
};
use tracing::{debug, warn};

use crate::table::{TaskInfo, TaskLimits, TaskTable};

/// Scheduler running each task on its own named OS thread
#[derive(Debug)]
pub struct ThreadScheduler {
    tick_rate: TickRate,
    epoch: Instant,
    table: TaskTable,
}

impl ThreadScheduler {
    /// Create scheduler; tick 0 is now
    pub fn new(tick_rate: TickRate, limits: TaskLimits) -> Self {
        Self {
            tick_rate,
            epoch: Instant::now(),
            table: TaskTable::new(limits),
        }
    }

    /// Create scheduler from configuration
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.tick_rate(), TaskLimits::from(config))
    }

    /// Snapshot of created tasks
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.table.tasks()
    }

    /// Task table (slots and stack pool usage)
    pub fn table(&self) -> &TaskTable {
        &self.table
    }

    fn instant_of(&self, tick: Tick) -> Instant {
        self.epoch + self.tick_rate.ticks_to_duration(tick)
    }
}

impl RealTimeScheduler for ThreadScheduler {
    fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    fn create_task(&self, spec: TaskSpec, entry: TaskEntry) -> Result<TaskHandle, ContractError> {
        let id = self.table.reserve(&spec, self.current_tick())?;

        let task_name = spec.name.clone();
        let spawned = thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || {
                debug!(task = %task_name, task_id = id, "task started");
                entry();
                // Periodic tasks never return; reaching this is a loss of function.
                warn!(task = %task_name, task_id = id, "task entry returned");
            });

        match spawned {
            Ok(_) => {
                debug!(
                    task = %spec.name,
                    task_id = id,
                    priority = %spec.priority,
                    stack_words = spec.stack_size_words,
                    "task created"
                );
                Ok(TaskHandle::new(id, spec.name))
            }
            Err(e) => {
                self.table.release(id);
                Err(ContractError::task_creation(spec.name, e.to_string()))
            }
        }
    }

    fn current_tick(&self) -> Tick {
        self.tick_rate.duration_to_ticks(self.epoch.elapsed())
    }

    fn delay_until(&self, last_wake: &mut Tick, period: Tick) {
        let target = last_wake.saturating_add(period);
        let deadline = self.instant_of(target);
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
        *last_wake = target;
    }

    fn delay(&self, ticks: Tick) {
        thread::sleep(self.tick_rate.ticks_to_duration(ticks));
    }
}
