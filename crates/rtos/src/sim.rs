//! Virtual-time scheduler for deterministic tests
//!
//! Tasks run on real threads, but the tick counter only moves when the
//! driver calls [`SimScheduler::advance`]. Each step releases every task whose
//! wake tick has arrived and then waits until all tasks are blocked in a delay
//! again, so the state observed between steps is fully determined by the tick.
//!
//! A task that never reaches a delay (busy loop, blocking I/O) stalls the
//! driver; tasks under test must follow the periodic contract.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use contracts::{
    ContractError, RealTimeScheduler, TaskEntry, TaskHandle, TaskSpec, Tick, TickRate,
};
use tracing::{debug, trace};

use crate::table::{TaskInfo, TaskLimits, TaskTable};

thread_local! {
    /// Set on threads created by a `SimScheduler`
    static SIM_TASK: Cell<bool> = const { Cell::new(false) };
}

#[derive(Debug)]
struct Sleeper {
    token: u64,
    wake_at: Tick,
}

#[derive(Debug, Default)]
struct SimState {
    tick: Tick,
    /// Tasks currently executing (not blocked in a delay)
    running: usize,
    sleepers: Vec<Sleeper>,
    released: HashSet<u64>,
    next_token: u64,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<SimState>,
    cond: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, SimState>) -> MutexGuard<'a, SimState> {
        self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_idle<'a>(&self, mut guard: MutexGuard<'a, SimState>) -> MutexGuard<'a, SimState> {
        while guard.running > 0 {
            guard = self.wait(guard);
        }
        guard
    }

    /// Block the calling thread until the driver reaches `wake_at`
    fn block<'a>(&self, mut guard: MutexGuard<'a, SimState>, wake_at: Tick) {
        if wake_at <= guard.tick {
            return;
        }

        if !SIM_TASK.with(Cell::get) {
            // Foreign thread: wait for time to pass without lock-step accounting
            while guard.tick < wake_at {
                guard = self.wait(guard);
            }
            return;
        }

        let token = guard.next_token;
        guard.next_token += 1;
        guard.sleepers.push(Sleeper { token, wake_at });
        guard.running -= 1;
        self.cond.notify_all();

        while !guard.released.remove(&token) {
            guard = self.wait(guard);
        }
    }

    fn task_exited(&self) {
        let mut guard = self.lock();
        guard.running -= 1;
        self.cond.notify_all();
    }
}

/// Decrements the running count when a task thread ends, including by panic
struct ExitGuard(Arc<Shared>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.task_exited();
    }
}

/// Lock-step virtual-time scheduler
#[derive(Debug)]
pub struct SimScheduler {
    tick_rate: TickRate,
    table: TaskTable,
    shared: Arc<Shared>,
}

impl SimScheduler {
    /// Create scheduler at tick 0
    pub fn new(tick_rate: TickRate, limits: TaskLimits) -> Self {
        Self {
            tick_rate,
            table: TaskTable::new(limits),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Wait until every task is blocked in a delay
    pub fn settle(&self) {
        let guard = self.shared.lock();
        drop(self.shared.wait_idle(guard));
    }

    /// Advance virtual time by `ticks`, one tick at a time
    ///
    /// Returns once every task released along the way has blocked again.
    pub fn advance(&self, ticks: Tick) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Advance virtual time until the current tick equals `tick`
    pub fn advance_to(&self, tick: Tick) {
        let now = self.current_tick();
        if tick > now {
            self.advance(tick - now);
        }
    }

    /// Snapshot of created tasks
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.table.tasks()
    }

    /// Task table (slots and stack pool usage)
    pub fn table(&self) -> &TaskTable {
        &self.table
    }

    fn step(&self) {
        let guard = self.shared.lock();
        let mut guard = self.shared.wait_idle(guard);

        guard.tick += 1;
        let now = guard.tick;

        let state = &mut *guard;
        let mut woken = 0;
        let released = &mut state.released;
        state.sleepers.retain(|sleeper| {
            if sleeper.wake_at <= now {
                released.insert(sleeper.token);
                woken += 1;
                false
            } else {
                true
            }
        });
        state.running += woken;

        trace!(tick = now, woken, "sim tick");
        self.shared.cond.notify_all();
        drop(self.shared.wait_idle(guard));
    }
}

impl RealTimeScheduler for SimScheduler {
    fn tick_rate(&self) -> TickRate {
        self.tick_rate
    }

    fn create_task(&self, spec: TaskSpec, entry: TaskEntry) -> Result<TaskHandle, ContractError> {
        let id = self.table.reserve(&spec, self.current_tick())?;

        // Count the task as running before it exists so a concurrent step
        // waits for its first delay.
        self.shared.lock().running += 1;

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || {
                SIM_TASK.with(|flag| flag.set(true));
                let _exit = ExitGuard(shared);
                entry();
            });

        match spawned {
            Ok(_) => {
                debug!(task = %spec.name, task_id = id, "sim task created");
                Ok(TaskHandle::new(id, spec.name))
            }
            Err(e) => {
                self.shared.task_exited();
                self.table.release(id);
                Err(ContractError::task_creation(spec.name, e.to_string()))
            }
        }
    }

    fn current_tick(&self) -> Tick {
        self.shared.lock().tick
    }

    fn delay_until(&self, last_wake: &mut Tick, period: Tick) {
        let target = last_wake.saturating_add(period);
        *last_wake = target;
        let guard = self.shared.lock();
        self.shared.block(guard, target);
    }

    fn delay(&self, ticks: Tick) {
        let guard = self.shared.lock();
        let wake_at = guard.tick.saturating_add(ticks);
        self.shared.block(guard, wake_at);
    }
}
