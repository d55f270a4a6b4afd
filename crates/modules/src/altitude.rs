//! Sonar altitude module
//!
//! Publishes `SonarAltitudeData` every `SENSOR_PERIOD_MS`. Without a sonar
//! driver the source is `FixedAltitude`, which always reads 10.0 m.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    ObjectStoreExt, RealTimeScheduler, SonarAltitudeData, TaskHandle, TaskPriority, TaskSpec,
    Tick, TypedObjectStore,
};
use tracing::{debug, info, instrument};

use crate::error::{JobError, ModuleError, ReadError};
use crate::lifecycle::{Module, ModuleDescriptor};
use crate::worker::{PeriodicJob, PeriodicWorker, WorkerMetrics};

/// Module name in records, logs and metrics
pub const MODULE_NAME: &str = "altitude";

/// Name of the module's task
pub const TASK_NAME: &str = "Sonar";

/// Task stack budget
pub const STACK_SIZE_BYTES: u32 = 1000;

pub const TASK_PRIORITY: TaskPriority = TaskPriority::IDLE.raised(3);

/// Publish period; allows sensor data to arrive as slow as 166 Hz
pub const SENSOR_PERIOD_MS: u32 = 6;

/// Altitude published by `FixedAltitude`
pub const FIXED_ALTITUDE: f32 = 10.0;

/// Where the module's altitude comes from
pub trait AltitudeSource: Send + 'static {
    /// Altitude above ground in meters
    fn read(&mut self) -> Result<f32, ReadError>;
}

/// Source that always reads the same altitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAltitude(pub f32);

impl Default for FixedAltitude {
    fn default() -> Self {
        Self(FIXED_ALTITUDE)
    }
}

impl AltitudeSource for FixedAltitude {
    fn read(&mut self) -> Result<f32, ReadError> {
        Ok(self.0)
    }
}

struct AltitudeJob {
    source: Box<dyn AltitudeSource>,
    store: Arc<dyn TypedObjectStore>,
}

impl PeriodicJob for AltitudeJob {
    fn execute(&mut self, _tick: Tick) -> Result<(), JobError> {
        let altitude = self.source.read()?;
        self.store.set_object(SonarAltitudeData { altitude })?;
        Ok(())
    }
}

/// Producer of the `SonarAltitude` object
pub struct AltitudeModule {
    store: Arc<dyn TypedObjectStore>,
    scheduler: Arc<dyn RealTimeScheduler>,
    /// Taken by the task entry when it first runs
    source: Arc<Mutex<Option<Box<dyn AltitudeSource>>>>,
    initialized: bool,
    started: bool,
    metrics: Arc<WorkerMetrics>,
}

impl AltitudeModule {
    /// Module publishing `FIXED_ALTITUDE`
    pub fn new(store: Arc<dyn TypedObjectStore>, scheduler: Arc<dyn RealTimeScheduler>) -> Self {
        Self::with_source(store, scheduler, FixedAltitude::default())
    }

    /// Module reading from a custom source
    pub fn with_source(
        store: Arc<dyn TypedObjectStore>,
        scheduler: Arc<dyn RealTimeScheduler>,
        source: impl AltitudeSource,
    ) -> Self {
        Self {
            store,
            scheduler,
            source: Arc::new(Mutex::new(Some(Box::new(source)))),
            initialized: false,
            started: false,
            metrics: Arc::new(WorkerMetrics::new()),
        }
    }

    /// Registration entry for the bootstrap
    pub fn descriptor(
        store: Arc<dyn TypedObjectStore>,
        scheduler: Arc<dyn RealTimeScheduler>,
    ) -> ModuleDescriptor {
        ModuleDescriptor::new(Self::new(store, scheduler))
    }

    /// Task period in ticks of the module's scheduler
    pub fn period_ticks(&self) -> Tick {
        self.scheduler.tick_rate().ms_to_ticks(SENSOR_PERIOD_MS)
    }

    pub fn task_spec() -> TaskSpec {
        TaskSpec::new(TASK_NAME, STACK_SIZE_BYTES / 4, TASK_PRIORITY)
    }
}

impl Module for AltitudeModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    #[instrument(skip_all, fields(module = MODULE_NAME))]
    fn initialize(&mut self) -> Result<(), ModuleError> {
        self.store
            .initialize_object::<SonarAltitudeData>()
            .map_err(|e| ModuleError::initialization(MODULE_NAME, e))?;
        self.initialized = true;
        debug!("SonarAltitude registered");
        Ok(())
    }

    #[instrument(skip_all, fields(module = MODULE_NAME))]
    fn start(&mut self) -> Result<TaskHandle, ModuleError> {
        if !self.initialized {
            return Err(ModuleError::not_initialized(MODULE_NAME));
        }
        if self.started {
            return Err(ModuleError::already_started(MODULE_NAME));
        }

        let period = self.period_ticks();
        let source = self.source.clone();
        let store = self.store.clone();
        let scheduler = self.scheduler.clone();
        let metrics = self.metrics.clone();

        // A failed create drops the entry unrun, leaving the source for a retry
        let handle = self
            .scheduler
            .create_task(
                Self::task_spec(),
                Box::new(move || {
                    let taken = source.lock().unwrap_or_else(PoisonError::into_inner).take();
                    let Some(source) = taken else {
                        return;
                    };
                    let job = AltitudeJob { source, store };
                    PeriodicWorker::new(MODULE_NAME, job, scheduler, period)
                        .with_metrics(metrics)
                        .run();
                }),
            )
            .map_err(|e| ModuleError::task_creation(MODULE_NAME, e))?;
        self.started = true;

        info!(task = handle.name(), period_ticks = period, "altitude task created");
        Ok(handle)
    }

    fn metrics(&self) -> Option<Arc<WorkerMetrics>> {
        Some(self.metrics.clone())
    }
}
