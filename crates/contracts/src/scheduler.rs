//! RealTimeScheduler trait - RTOS capability abstraction
//!
//! Modules never touch threads or clocks directly. They create tasks and
//! sleep through this trait, so the same module code runs on the host
//! thread scheduler and on the virtual-time scheduler used by tests.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ContractError, Tick, TickRate};

/// Task priority, higher = more important
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskPriority(pub u8);

impl TaskPriority {
    /// Priority of the idle task
    pub const IDLE: TaskPriority = TaskPriority(0);

    /// Priority `levels` above this one
    pub const fn raised(self, levels: u8) -> Self {
        TaskPriority(self.0.saturating_add(levels))
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a task to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Task name, for logging and the task monitor
    pub name: String,

    /// Stack budget in 32-bit words
    pub stack_size_words: u32,

    /// Scheduling priority
    pub priority: TaskPriority,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, stack_size_words: u32, priority: TaskPriority) -> Self {
        Self {
            name: name.into(),
            stack_size_words,
            priority,
        }
    }
}

/// Scheduler-assigned task identifier
pub type TaskId = u32;

/// Handle to a created task
///
/// Owned by whoever created the task. Tasks are not torn down during normal
/// operation, so the handle carries identity only.
#[derive(Debug, PartialEq, Eq)]
pub struct TaskHandle {
    id: TaskId,
    name: Arc<str>,
}

impl TaskHandle {
    /// Create a handle (scheduler implementations only)
    pub fn new(id: TaskId, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Task entry point
///
/// Takes no argument: everything the task needs is captured by the closure.
pub type TaskEntry = Box<dyn FnOnce() + Send + 'static>;

/// Real-time scheduler capability
pub trait RealTimeScheduler: Send + Sync {
    /// Tick rate used to convert millisecond periods
    fn tick_rate(&self) -> TickRate;

    /// Create a task and make it runnable
    ///
    /// On error no part of the task exists and `entry` is never invoked.
    fn create_task(&self, spec: TaskSpec, entry: TaskEntry) -> Result<TaskHandle, ContractError>;

    /// Current scheduler tick
    fn current_tick(&self) -> Tick;

    /// Block until `*last_wake + period`, then set `*last_wake` to that tick
    ///
    /// The wake instant is computed from the previous wake instant, not from
    /// "now", so variable work time does not accumulate as drift. If the
    /// target already passed, returns immediately.
    fn delay_until(&self, last_wake: &mut Tick, period: Tick);

    /// Block for `ticks` ticks counted from now
    fn delay(&self, ticks: Tick);
}
