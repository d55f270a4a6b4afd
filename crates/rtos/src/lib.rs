//! # RTOS
//!
//! Host implementations of the `RealTimeScheduler` capability.
//!
//! - [`ThreadScheduler`]: wall-clock ticks, one OS thread per task
//! - [`SimScheduler`]: virtual ticks advanced by the caller, lock-step and
//!   deterministic; used to test timing properties
//!
//! Both account task slots and stack memory through a shared [`TaskTable`],
//! so resource exhaustion surfaces as a `create_task` error exactly like on
//! the flight controller.
//!
//! ## Usage Example
//!
//! ```ignore
//! use rtos::{SimScheduler, TaskLimits};
//!
//! let scheduler = Arc::new(SimScheduler::new(TickRate::KHZ, TaskLimits::default()));
//! let handle = scheduler.create_task(spec, Box::new(move || worker.run()))?;
//! scheduler.settle();
//! scheduler.advance(6);
//! ```

mod sim;
mod table;
mod thread;

pub use contracts::{RealTimeScheduler, TaskHandle, TaskSpec, Tick, TickRate};
pub use sim::SimScheduler;
pub use table::{TaskInfo, TaskLimits, TaskTable};
pub use thread::ThreadScheduler;
