//! Periodic worker: one unit of work per period, forever
//!
//! The loop reads the tick once, then alternates work and an absolute
//! `delay_until` on `last_wake`, so wake times stay on the `start + k * period`
//! grid no matter how long each iteration's work takes. Failures of a single
//! period are logged and counted; nothing inside the loop ends it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{RealTimeScheduler, Tick};
use tracing::{info, trace, warn};

use crate::error::JobError;

/// The unit of work a `PeriodicWorker` runs every period
pub trait PeriodicJob: Send + 'static {
    /// Perform one period's work; `tick` is the tick it started at
    fn execute(&mut self, tick: Tick) -> Result<(), JobError>;
}

const NEVER: u64 = u64::MAX;

/// Worker counters, shared between the task and its observers
#[derive(Debug)]
pub struct WorkerMetrics {
    iterations: AtomicU64,
    publishes: AtomicU64,
    publish_failures: AtomicU64,
    skipped_reads: AtomicU64,
    panics: AtomicU64,
    overruns: AtomicU64,
    last_publish_tick: AtomicU64,
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self {
            iterations: AtomicU64::new(0),
            publishes: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            skipped_reads: AtomicU64::new(0),
            panics: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            last_publish_tick: AtomicU64::new(NEVER),
        }
    }
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    pub fn skipped_reads(&self) -> u64 {
        self.skipped_reads.load(Ordering::Relaxed)
    }

    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Tick at which the latest successful unit of work returned
    pub fn last_publish_tick(&self) -> Option<Tick> {
        match self.last_publish_tick.load(Ordering::Relaxed) {
            NEVER => None,
            tick => Some(tick),
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> WorkerMetricsSnapshot {
        WorkerMetricsSnapshot {
            iterations: self.iterations(),
            publishes: self.publishes(),
            publish_failures: self.publish_failures(),
            skipped_reads: self.skipped_reads(),
            panics: self.panics(),
            overruns: self.overruns(),
            last_publish_tick: self.last_publish_tick(),
        }
    }
}

/// Snapshot of worker metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerMetricsSnapshot {
    pub iterations: u64,
    pub publishes: u64,
    pub publish_failures: u64,
    pub skipped_reads: u64,
    pub panics: u64,
    pub overruns: u64,
    pub last_publish_tick: Option<Tick>,
}

/// Drift-free periodic loop around a `PeriodicJob`
pub struct PeriodicWorker<J> {
    module: String,
    job: J,
    scheduler: Arc<dyn RealTimeScheduler>,
    period: Tick,
    metrics: Arc<WorkerMetrics>,
}

impl<J: PeriodicJob> PeriodicWorker<J> {
    /// `period` is in scheduler ticks and is clamped to at least 1
    pub fn new(
        module: impl Into<String>,
        job: J,
        scheduler: Arc<dyn RealTimeScheduler>,
        period: Tick,
    ) -> Self {
        Self {
            module: module.into(),
            job,
            scheduler,
            period: period.max(1),
            metrics: Arc::new(WorkerMetrics::new()),
        }
    }

    /// Report into an existing metrics handle
    pub fn with_metrics(mut self, metrics: Arc<WorkerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn period(&self) -> Tick {
        self.period
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.metrics.clone()
    }

    /// Run the loop; never returns
    pub fn run(mut self) -> ! {
        let mut last_wake = self.scheduler.current_tick();
        info!(
            module = %self.module,
            period_ticks = self.period,
            start_tick = last_wake,
            "periodic worker running"
        );

        loop {
            self.run_period(last_wake);
            self.scheduler.delay_until(&mut last_wake, self.period);
        }
    }

    /// One iteration: work, accounting, overrun check
    fn run_period(&mut self, last_wake: Tick) {
        let tick = self.scheduler.current_tick();
        self.metrics.iterations.fetch_add(1, Ordering::Relaxed);

        let job = &mut self.job;
        match panic::catch_unwind(AssertUnwindSafe(|| job.execute(tick))) {
            Ok(Ok(())) => {
                let published_at = self.scheduler.current_tick();
                self.metrics.publishes.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .last_publish_tick
                    .store(published_at, Ordering::Relaxed);
                observability::record_publish(&self.module, published_at);
                trace!(module = %self.module, tick, published_at, "period complete");
            }
            Ok(Err(JobError::Read(e))) => {
                self.metrics.skipped_reads.fetch_add(1, Ordering::Relaxed);
                observability::record_skipped_read(&self.module);
                warn!(module = %self.module, tick, error = %e, "read failed, publish skipped");
            }
            Ok(Err(JobError::Publish(e))) => {
                self.metrics.publish_failures.fetch_add(1, Ordering::Relaxed);
                observability::record_publish_failure(&self.module);
                warn!(module = %self.module, tick, error = %e, "publish failed");
            }
            Err(payload) => {
                self.metrics.panics.fetch_add(1, Ordering::Relaxed);
                observability::record_worker_panic(&self.module);
                warn!(
                    module = %self.module,
                    tick,
                    panic = panic_message(payload.as_ref()),
                    "unit of work panicked"
                );
            }
        }

        let deadline = last_wake.saturating_add(self.period);
        let now = self.scheduler.current_tick();
        if now > deadline {
            let late = now - deadline;
            self.metrics.overruns.fetch_add(1, Ordering::Relaxed);
            observability::record_overrun(&self.module, late);
            warn!(module = %self.module, tick = now, late_ticks = late, "period overrun");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use contracts::{ContractError, ObjectId, TaskPriority, TaskSpec, TickRate};
    use rtos::{SimScheduler, TaskLimits};
    use std::sync::Mutex;

    /// Job scripted per iteration index
    struct ScriptedJob {
        calls: Arc<Mutex<Vec<Tick>>>,
        script: fn(usize) -> Result<(), JobError>,
    }

    impl PeriodicJob for ScriptedJob {
        fn execute(&mut self, tick: Tick) -> Result<(), JobError> {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.len();
            calls.push(tick);
            drop(calls);
            (self.script)(n)
        }
    }

    fn start(
        script: fn(usize) -> Result<(), JobError>,
    ) -> (Arc<SimScheduler>, Arc<WorkerMetrics>, Arc<Mutex<Vec<Tick>>>) {
        let scheduler = Arc::new(SimScheduler::new(TickRate::KHZ, TaskLimits::default()));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let job = ScriptedJob {
            calls: calls.clone(),
            script,
        };
        let worker = PeriodicWorker::new("worker", job, scheduler.clone(), 6);
        let metrics = worker.metrics();

        scheduler
            .create_task(
                TaskSpec::new("worker", 250, TaskPriority::IDLE.raised(3)),
                Box::new(move || {
                    worker.run();
                }),
            )
            .unwrap();
        scheduler.settle();
        (scheduler, metrics, calls)
    }

    #[test]
    fn test_worker_runs_once_per_period() {
        let (scheduler, metrics, calls) = start(|_| Ok(()));
        scheduler.advance(24);

        assert_eq!(*calls.lock().unwrap(), vec![0, 6, 12, 18, 24]);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.iterations, 5);
        assert_eq!(snapshot.publishes, 5);
        assert_eq!(snapshot.last_publish_tick, Some(24));
        assert_eq!(snapshot.overruns, 0);
    }

    #[test]
    fn test_failures_do_not_stop_the_loop() {
        let (scheduler, metrics, calls) = start(|n| match n {
            1 => Err(ReadError::NotReady.into()),
            2 => Err(ContractError::ObjectNotRegistered {
                object: ObjectId::SonarAltitude,
            }
            .into()),
            _ => Ok(()),
        });
        scheduler.advance(24);

        assert_eq!(*calls.lock().unwrap(), vec![0, 6, 12, 18, 24]);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.skipped_reads, 1);
        assert_eq!(snapshot.publish_failures, 1);
        assert_eq!(snapshot.publishes, 3);
    }

    #[test]
    fn test_panic_is_contained() {
        let (scheduler, metrics, calls) = start(|n| {
            if n == 0 {
                panic!("sensor driver bug");
            }
            Ok(())
        });
        scheduler.advance(12);

        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(metrics.panics(), 1);
        assert_eq!(metrics.publishes(), 2);
    }

    /// Job whose work takes `work` ticks of scheduler time
    struct SlowJob {
        scheduler: Arc<SimScheduler>,
        work: Tick,
    }

    impl PeriodicJob for SlowJob {
        fn execute(&mut self, _tick: Tick) -> Result<(), JobError> {
            self.scheduler.delay(self.work);
            Ok(())
        }
    }

    #[test]
    fn test_last_publish_tick_is_completion_tick() {
        let scheduler = Arc::new(SimScheduler::new(TickRate::KHZ, TaskLimits::default()));
        let job = SlowJob {
            scheduler: scheduler.clone(),
            work: 2,
        };
        let worker = PeriodicWorker::new("slow", job, scheduler.clone(), 6);
        let metrics = worker.metrics();
        scheduler
            .create_task(
                TaskSpec::new("slow", 250, TaskPriority::IDLE.raised(3)),
                Box::new(move || {
                    worker.run();
                }),
            )
            .unwrap();
        scheduler.settle();

        scheduler.advance(2);
        assert_eq!(metrics.last_publish_tick(), Some(2));

        scheduler.advance(10);
        // The period started at 12 is still working
        assert_eq!(metrics.publishes(), 2);
        assert_eq!(metrics.last_publish_tick(), Some(8));
        assert_eq!(metrics.overruns(), 0);
    }

    #[test]
    fn test_metrics_start_empty() {
        let metrics = WorkerMetrics::new();
        assert_eq!(metrics.last_publish_tick(), None);
        assert_eq!(metrics.iterations(), 0);
    }
}
