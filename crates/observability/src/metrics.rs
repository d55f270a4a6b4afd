//! Firmware metrics
//!
//! Recording helpers over the `metrics` facade plus in-memory aggregation of
//! object updates for run summaries.

use contracts::{ObjectUpdate, Tick};
use metrics::{counter, gauge};

/// Record an accepted publish
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_publish;
///
/// store.set_object(data)?;
/// record_publish("altitude", tick);
/// ```
pub fn record_publish(module: &str, tick: Tick) {
    counter!("flightd_publishes_total", "module" => module.to_string()).increment(1);

    gauge!("flightd_last_publish_tick", "module" => module.to_string()).set(tick as f64);
}

/// Record a publish the store rejected
pub fn record_publish_failure(module: &str) {
    counter!("flightd_publish_failures_total", "module" => module.to_string()).increment(1);
}

/// Record a period whose sensor read failed
pub fn record_skipped_read(module: &str) {
    counter!("flightd_skipped_reads_total", "module" => module.to_string()).increment(1);
}

/// Record a period whose work ran past the next wake tick
pub fn record_overrun(module: &str, late_ticks: Tick) {
    counter!("flightd_overruns_total", "module" => module.to_string()).increment(1);
    gauge!("flightd_last_overrun_ticks", "module" => module.to_string()).set(late_ticks as f64);
}

/// Record a panic caught at the worker loop boundary
pub fn record_worker_panic(module: &str) {
    counter!("flightd_worker_panics_total", "module" => module.to_string()).increment(1);
}

/// Set the (module, state) gauge: 1 on entering the state, 0 on leaving it
pub fn record_module_state(module: &str, state: &str, active: bool) {
    gauge!(
        "flightd_module_state",
        "module" => module.to_string(),
        "state" => state.to_string()
    )
    .set(if active { 1.0 } else { 0.0 });
}

/// Aggregates the update stream of one object
///
/// Keeps counts in memory so the CLI can print a summary at shutdown.
#[derive(Debug, Clone, Default)]
pub struct UpdateAggregator {
    /// Updates observed
    pub total_updates: u64,

    /// Updates the subscriber never saw (sequence gaps, counted from 1)
    pub missed_updates: u64,

    /// Latest observed sequence number
    pub last_sequence: Option<u64>,

    /// Interval between observed updates (ms)
    pub interval_stats: RunningStats,

    last_at_ms: Option<f64>,
}

impl UpdateAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one update observed at `at_ms` (any monotonic millisecond clock)
    pub fn update(&mut self, update: &ObjectUpdate, at_ms: f64) {
        self.total_updates += 1;

        // Sequences start at 1, so a late first update is a gap too
        let expected = self.last_sequence.map_or(1, |last| last + 1);
        if update.sequence > expected {
            self.missed_updates += update.sequence - expected;
        }
        self.last_sequence = Some(update.sequence);

        if let Some(last_at) = self.last_at_ms {
            self.interval_stats.push(at_ms - last_at);
        }
        self.last_at_ms = Some(at_ms);
    }

    /// Generate summary report
    pub fn summary(&self) -> UpdateSummary {
        UpdateSummary {
            total_updates: self.total_updates,
            missed_updates: self.missed_updates,
            last_sequence: self.last_sequence,
            interval_ms: StatsSummary::from(&self.interval_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Update stream summary
#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    pub total_updates: u64,
    pub missed_updates: u64,
    pub last_sequence: Option<u64>,
    pub interval_ms: StatsSummary,
}

impl std::fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Updates observed: {}", self.total_updates)?;
        writeln!(f, "Updates missed: {}", self.missed_updates)?;
        if let Some(sequence) = self.last_sequence {
            writeln!(f, "Last sequence: {}", sequence)?;
        }
        writeln!(f, "Interval (ms): {}", self.interval_ms)
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
