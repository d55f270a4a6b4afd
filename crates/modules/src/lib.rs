//! # Modules
//!
//! Firmware modules and the machinery that brings them up.
//!
//! - [`Module`] / [`ModuleDescriptor`] / [`ModuleRegistry`]: registration
//! - [`Bootstrap`]: initializes every module, then starts every module
//! - [`PeriodicWorker`]: drift-free periodic loop around a [`PeriodicJob`]
//! - [`AltitudeModule`]: sonar altitude producer
//!
//! ## Usage Example
//!
//! ```ignore
//! use modules::{AltitudeModule, Bootstrap, ModuleRegistry};
//!
//! let mut registry = ModuleRegistry::new();
//! registry.register(AltitudeModule::descriptor(store.clone(), scheduler.clone()));
//!
//! let system = Bootstrap::new(InitFailurePolicy::Skip).run(registry)?;
//! ```

pub mod altitude;
mod error;
mod lifecycle;
mod worker;

pub use altitude::{AltitudeModule, AltitudeSource, FixedAltitude};
pub use error::{JobError, ModuleError, ReadError};
pub use lifecycle::{
    Bootstrap, Module, ModuleDescriptor, ModuleRecord, ModuleRegistry, ModuleState, SystemModules,
};
pub use worker::{PeriodicJob, PeriodicWorker, WorkerMetrics, WorkerMetricsSnapshot};
