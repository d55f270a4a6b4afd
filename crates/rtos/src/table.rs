//! Task table: task slots, stack pool and the task monitor

use std::sync::{Mutex, PoisonError};

use contracts::{ContractError, SchedulerConfig, TaskId, TaskPriority, TaskSpec, Tick};

/// Scheduler resource limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLimits {
    /// Maximum number of tasks
    pub max_tasks: usize,

    /// Memory available for task stacks, in 32-bit words
    pub stack_pool_words: u32,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            max_tasks: 16,
            stack_pool_words: 8192,
        }
    }
}

impl From<&SchedulerConfig> for TaskLimits {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            max_tasks: config.max_tasks,
            stack_pool_words: config.stack_pool_words,
        }
    }
}

/// Monitor entry for a created task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub priority: TaskPriority,
    pub stack_size_words: u32,
    /// Tick at which the task was created
    pub created_at: Tick,
}

#[derive(Debug, Default)]
struct TableState {
    tasks: Vec<TaskInfo>,
    stack_used: u32,
    next_id: TaskId,
}

/// Bounded task table
///
/// `reserve` and `release` are the only mutations; a reservation that is not
/// released stays for the life of the process, like tasks on the flight
/// controller.
#[derive(Debug)]
pub struct TaskTable {
    limits: TaskLimits,
    state: Mutex<TableState>,
}

impl TaskTable {
    pub fn new(limits: TaskLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(TableState::default()),
        }
    }

    pub fn limits(&self) -> TaskLimits {
        self.limits
    }

    /// Reserve a slot and stack memory for `spec`
    ///
    /// # Errors
    /// `ContractError::TaskCreation` if the stack budget is zero, all slots are
    /// taken, or the stack pool cannot hold the requested stack.
    pub fn reserve(&self, spec: &TaskSpec, now: Tick) -> Result<TaskId, ContractError> {
        if spec.stack_size_words == 0 {
            return Err(ContractError::task_creation(
                &spec.name,
                "stack budget must be > 0 words",
            ));
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.tasks.len() >= self.limits.max_tasks {
            return Err(ContractError::task_creation(
                &spec.name,
                format!("no free task slots ({} in use)", state.tasks.len()),
            ));
        }

        let available = self.limits.stack_pool_words - state.stack_used;
        if spec.stack_size_words > available {
            return Err(ContractError::task_creation(
                &spec.name,
                format!(
                    "stack pool exhausted: requested {} words, {} available",
                    spec.stack_size_words, available
                ),
            ));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.stack_used += spec.stack_size_words;
        state.tasks.push(TaskInfo {
            id,
            name: spec.name.clone(),
            priority: spec.priority,
            stack_size_words: spec.stack_size_words,
            created_at: now,
        });

        Ok(id)
    }

    /// Undo a reservation whose task could not be started
    pub fn release(&self, id: TaskId) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = state.tasks.iter().position(|task| task.id == id) {
            let task = state.tasks.remove(pos);
            state.stack_used -= task.stack_size_words;
        }
    }

    /// Snapshot of all created tasks, in creation order
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .clone()
    }

    /// Number of created tasks
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stack words currently reserved
    pub fn stack_used(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stack_used
    }
}
