//! # Contracts
//!
//! Frozen interface contracts shared by every firmware crate.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Time Model
//! - Scheduler ticks (`Tick`, u64) are the only clock a module sees
//! - Millisecond periods are converted with the scheduler's `TickRate`
//!
//! ## Capabilities
//! - [`RealTimeScheduler`]: task creation, tick clock, drift-free delay
//! - [`TypedObjectStore`]: type-addressed latest-value store

mod config;
mod error;
mod object;
mod scheduler;
mod store;
mod tick;

pub use config::*;
pub use error::*;
pub use object::*;
pub use scheduler::*;
pub use store::*;
pub use tick::*;
