//! Scheduler time base

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Scheduler tick counter (monotonic, owned by the scheduler)
pub type Tick = u64;

/// Scheduler tick rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRate {
    /// Ticks per second, must be > 0
    pub hz: u32,
}

impl TickRate {
    /// 1 kHz, one tick per millisecond
    pub const KHZ: TickRate = TickRate { hz: 1000 };

    pub const fn new(hz: u32) -> Self {
        Self { hz }
    }

    /// Convert a millisecond period to ticks
    ///
    /// Truncates like the firmware's `MS2TICKS`, but never returns 0: a zero
    /// period would turn a periodic task into a busy loop.
    pub const fn ms_to_ticks(&self, ms: u32) -> Tick {
        let ticks = (ms as u64 * self.hz as u64) / 1000;
        if ticks == 0 {
            1
        } else {
            ticks
        }
    }

    /// Wall-clock length of `ticks` ticks
    pub fn ticks_to_duration(&self, ticks: Tick) -> Duration {
        let nanos = ticks as u128 * 1_000_000_000 / self.hz as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    /// Whole ticks elapsed in `duration`
    pub fn duration_to_ticks(&self, duration: Duration) -> Tick {
        (duration.as_nanos() * self.hz as u128 / 1_000_000_000) as Tick
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self::KHZ
    }
}
