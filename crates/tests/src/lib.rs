//! # Integration Tests
//!
//! End-to-end tests of the module runtime.
//!
//! Covers:
//! - Contract snapshots
//! - Timing properties on the virtual-time scheduler
//! - Bootstrap ordering and failure isolation
//! - Wall-clock e2e through the object store subscription

#[cfg(test)]
mod support {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{
        ContractError, ObjectId, ObjectPayload, RealTimeScheduler, SonarAltitudeData, Tick,
        TickRate, TypedObjectStore, UavObject,
    };
    use modules::{AltitudeSource, ReadError};
    use rtos::{SimScheduler, TaskLimits};
    use uavobjects::ObjectStore;

    pub fn sim() -> Arc<SimScheduler> {
        Arc::new(SimScheduler::new(TickRate::KHZ, TaskLimits::default()))
    }

    /// Store wrapper that records the tick of every accepted write and can
    /// reject chosen writes
    pub struct RecordingStore {
        inner: ObjectStore,
        scheduler: Arc<SimScheduler>,
        calls: AtomicUsize,
        reject: Mutex<HashSet<usize>>,
        writes: Mutex<Vec<(Tick, f32)>>,
    }

    impl RecordingStore {
        pub fn new(scheduler: Arc<SimScheduler>) -> Arc<Self> {
            Arc::new(Self {
                inner: ObjectStore::new(),
                scheduler,
                calls: AtomicUsize::new(0),
                reject: Mutex::new(HashSet::new()),
                writes: Mutex::new(Vec::new()),
            })
        }

        /// Reject the `n`-th call to `set` (0-based)
        pub fn reject_call(&self, n: usize) {
            self.reject.lock().unwrap().insert(n);
        }

        pub fn write_ticks(&self) -> Vec<Tick> {
            self.writes.lock().unwrap().iter().map(|(t, _)| *t).collect()
        }

        pub fn write_values(&self) -> Vec<f32> {
            self.writes.lock().unwrap().iter().map(|(_, v)| *v).collect()
        }
    }

    impl TypedObjectStore for RecordingStore {
        fn initialize(&self, object: ObjectId) -> Result<(), ContractError> {
            self.inner.initialize(object)
        }

        fn set(&self, object: ObjectId, payload: ObjectPayload) -> Result<(), ContractError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject.lock().unwrap().contains(&n) {
                return Err(ContractError::publish_rejected(object, "injected failure"));
            }

            let tick = self.scheduler.current_tick();
            let value = SonarAltitudeData::from_payload(&payload)
                .map(|data| data.altitude)
                .unwrap_or(f32::NAN);
            self.inner.set(object, payload)?;
            self.writes.lock().unwrap().push((tick, value));
            Ok(())
        }

        fn get(&self, object: ObjectId) -> Option<ObjectPayload> {
            self.inner.get(object)
        }
    }

    /// Source whose read takes a scripted number of ticks
    pub struct BusySource {
        pub scheduler: Arc<SimScheduler>,
        pub reads: Arc<Mutex<Vec<Tick>>>,
        pub work: fn(usize) -> Tick,
    }

    impl AltitudeSource for BusySource {
        fn read(&mut self) -> Result<f32, ReadError> {
            let mut reads = self.reads.lock().unwrap();
            let n = reads.len();
            reads.push(self.scheduler.current_tick());
            drop(reads);

            let work = (self.work)(n);
            if work > 0 {
                self.scheduler.delay(work);
            }
            Ok(10.0)
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{FirmwareConfig, InitFailurePolicy, ObjectId, TaskPriority, TickRate};
    use modules::altitude;

    #[test]
    fn test_altitude_constants() {
        assert_eq!(altitude::STACK_SIZE_BYTES, 1000);
        assert_eq!(altitude::TASK_PRIORITY, TaskPriority::IDLE.raised(3));
        assert_eq!(altitude::SENSOR_PERIOD_MS, 6);
        assert_eq!(altitude::TASK_NAME, "Sonar");
        assert_eq!(altitude::FIXED_ALTITUDE, 10.0);
        assert_eq!(TickRate::KHZ.ms_to_ticks(altitude::SENSOR_PERIOD_MS), 6);
    }

    #[test]
    fn test_default_config_snapshot() {
        let config = FirmwareConfig::default();
        assert_eq!(config.scheduler.tick_rate_hz, 1000);
        assert_eq!(config.bootstrap.init_failure_policy, InitFailurePolicy::Skip);
        assert!(config.modules.altitude.enabled);
        assert_eq!(ObjectId::SonarAltitude.name(), "SonarAltitude");
    }
}

#[cfg(test)]
mod timing_tests {
    use std::sync::{Arc, Mutex};

    use contracts::{ObjectStoreExt, SonarAltitudeData};
    use modules::{AltitudeModule, Module, ModuleError};
    use rtos::{RealTimeScheduler, SimScheduler, TaskLimits, TickRate};

    use crate::support::{sim, BusySource, RecordingStore};

    #[test]
    fn test_five_periods_spaced_exactly_six_ticks() {
        let scheduler = sim();
        // Boot away from tick 0 so the grid is anchored at the start tick
        scheduler.advance(100);

        let store = RecordingStore::new(scheduler.clone());
        let mut module = AltitudeModule::new(store.clone(), scheduler.clone());
        module.initialize().unwrap();
        module.start().unwrap();
        scheduler.settle();
        scheduler.advance(24);

        assert_eq!(store.write_ticks(), vec![100, 106, 112, 118, 124]);
    }

    #[test]
    fn test_variable_work_does_not_accumulate_drift() {
        let scheduler = sim();
        let store = RecordingStore::new(scheduler.clone());
        let reads = Arc::new(Mutex::new(Vec::new()));
        let work = |n: usize| (n % 5) as u64;

        let source = BusySource {
            scheduler: scheduler.clone(),
            reads: reads.clone(),
            work,
        };
        let mut module = AltitudeModule::with_source(store.clone(), scheduler.clone(), source);
        module.initialize().unwrap();
        module.start().unwrap();
        scheduler.settle();
        scheduler.advance(60);

        // Wake ticks stay on the grid
        let reads = reads.lock().unwrap().clone();
        assert_eq!(reads, (0..=10).map(|k| k * 6).collect::<Vec<_>>());

        // Each publish lands after that period's work, never later
        let expected: Vec<_> = (0..=10usize).map(|k| k as u64 * 6 + work(k)).collect();
        assert_eq!(store.write_ticks(), expected);

        let metrics = module.metrics().unwrap();
        assert_eq!(metrics.overruns(), 0);
    }

    #[test]
    fn test_published_within_one_period_of_start() {
        let scheduler = sim();
        let store = Arc::new(uavobjects::ObjectStore::new());
        let mut module = AltitudeModule::new(store.clone(), scheduler.clone());
        module.initialize().unwrap();
        module.start().unwrap();

        scheduler.settle();
        scheduler.advance(6);
        assert!(store.get_object::<SonarAltitudeData>().is_some());
    }

    #[test]
    fn test_every_publish_is_ten_meters() {
        let scheduler = sim();
        let store = RecordingStore::new(scheduler.clone());
        let mut module = AltitudeModule::new(store.clone(), scheduler.clone());
        module.initialize().unwrap();
        module.start().unwrap();
        scheduler.settle();
        scheduler.advance(120);

        let values = store.write_values();
        assert_eq!(values.len(), 21);
        assert!(values.iter().all(|v| *v == 10.0));
    }

    #[test]
    fn test_rejected_publish_keeps_schedule() {
        let scheduler = sim();
        let store = RecordingStore::new(scheduler.clone());
        store.reject_call(1);

        let mut module = AltitudeModule::new(store.clone(), scheduler.clone());
        let metrics = module.metrics().unwrap();
        module.initialize().unwrap();
        module.start().unwrap();
        scheduler.settle();
        scheduler.advance(18);

        // The write at tick 6 was rejected; the next one is on time
        assert_eq!(store.write_ticks(), vec![0, 12, 18]);
        assert_eq!(metrics.publish_failures(), 1);
        assert_eq!(metrics.publishes(), 3);
        assert_eq!(metrics.iterations(), 4);
    }

    #[test]
    fn test_task_creation_failure_never_runs_worker() {
        let scheduler = Arc::new(SimScheduler::new(
            TickRate::KHZ,
            TaskLimits {
                max_tasks: 0,
                stack_pool_words: 8192,
            },
        ));
        let store = RecordingStore::new(scheduler.clone());
        let mut module = AltitudeModule::new(store.clone(), scheduler.clone());
        module.initialize().unwrap();

        let err = module.start().unwrap_err();
        assert!(matches!(err, ModuleError::TaskCreation { .. }));

        scheduler.advance(30);
        assert!(store.write_ticks().is_empty());
        assert!(store.get_object::<SonarAltitudeData>().is_none());
        assert_eq!(module.metrics().unwrap().iterations(), 0);
        assert_eq!(scheduler.current_tick(), 30);
    }
}

#[cfg(test)]
mod bootstrap_tests {
    use std::sync::{Arc, Mutex};

    use contracts::{InitFailurePolicy, ObjectId, ObjectStoreConfig, TaskHandle};
    use modules::{
        AltitudeModule, Bootstrap, Module, ModuleDescriptor, ModuleError, ModuleRegistry,
        ModuleState,
    };
    use uavobjects::ObjectStore;

    use crate::support::sim;

    /// Consumer registered before the producer; its start checks that the
    /// producer's object already exists
    struct Consumer {
        store: Arc<ObjectStore>,
        saw_object_at_start: Arc<Mutex<Option<bool>>>,
    }

    impl Module for Consumer {
        fn name(&self) -> &str {
            "consumer"
        }

        fn initialize(&mut self) -> Result<(), ModuleError> {
            Ok(())
        }

        fn start(&mut self) -> Result<TaskHandle, ModuleError> {
            let registered = self.store.is_registered(ObjectId::SonarAltitude);
            *self.saw_object_at_start.lock().unwrap() = Some(registered);
            Ok(TaskHandle::new(99, "Consumer"))
        }
    }

    #[test]
    fn test_producer_initialized_before_earlier_consumer_starts() {
        let scheduler = sim();
        let store = Arc::new(ObjectStore::new());
        let saw = Arc::new(Mutex::new(None));

        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new(Consumer {
                store: store.clone(),
                saw_object_at_start: saw.clone(),
            }))
            .register(AltitudeModule::descriptor(store.clone(), scheduler.clone()));

        let system = Bootstrap::default().run(registry).unwrap();
        scheduler.settle();

        assert_eq!(*saw.lock().unwrap(), Some(true));
        assert_eq!(system.running(), 2);
        let record = system.record("altitude").unwrap();
        assert_eq!(record.task.as_ref().map(TaskHandle::name), Some("Sonar"));
    }

    #[test]
    fn test_init_failure_policies() {
        let full_store = || {
            Arc::new(ObjectStore::with_config(ObjectStoreConfig {
                max_objects: 0,
                ..Default::default()
            }))
        };

        // Skip: the module is recorded as failed and never started
        let scheduler = sim();
        let mut registry = ModuleRegistry::new();
        registry.register(AltitudeModule::descriptor(full_store(), scheduler.clone()));
        let system = Bootstrap::new(InitFailurePolicy::Skip).run(registry).unwrap();
        assert_eq!(
            system.record("altitude").unwrap().state,
            ModuleState::InitFailed
        );
        assert!(scheduler.tasks().is_empty());

        // Abort: bootstrap fails
        let scheduler = sim();
        let mut registry = ModuleRegistry::new();
        registry.register(AltitudeModule::descriptor(full_store(), scheduler.clone()));
        let err = Bootstrap::new(InitFailurePolicy::Abort)
            .run(registry)
            .unwrap_err();
        assert!(matches!(err, ModuleError::Initialization { .. }));
        assert!(scheduler.tasks().is_empty());
    }

    #[test]
    fn test_config_disables_module() {
        let config = config_loader::ConfigLoader::load_from_str(
            "[modules.altitude]\nenabled = false\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        assert!(!config.modules.altitude.enabled);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use contracts::{FirmwareConfig, ObjectId, SonarAltitudeData, TypedObjectStore, UavObject};
    use modules::{AltitudeModule, Bootstrap, ModuleRegistry};
    use observability::UpdateAggregator;
    use rtos::ThreadScheduler;
    use uavobjects::ObjectStore;

    /// End-to-end: ThreadScheduler -> AltitudeModule -> ObjectStore -> subscriber
    #[tokio::test]
    async fn test_e2e_subscriber_sees_periodic_updates() {
        let config = FirmwareConfig::default();
        let scheduler = Arc::new(ThreadScheduler::from_config(&config.scheduler));
        let store = Arc::new(ObjectStore::with_config(config.object_store.clone()));

        store.initialize(ObjectId::SonarAltitude).unwrap();
        let updates = store.subscribe(ObjectId::SonarAltitude).unwrap();

        let mut registry = ModuleRegistry::new();
        registry.register(AltitudeModule::descriptor(store.clone(), scheduler.clone()));
        let system = Bootstrap::new(config.bootstrap.init_failure_policy)
            .run(registry)
            .unwrap();
        assert_eq!(system.running(), 1);

        let start = Instant::now();
        let mut aggregator = UpdateAggregator::new();

        let received = tokio::time::timeout(Duration::from_secs(5), async {
            for _ in 0..10 {
                let update = updates.recv().await.unwrap();
                aggregator.update(&update, start.elapsed().as_secs_f64() * 1000.0);
                assert_eq!(
                    SonarAltitudeData::from_payload(&update.payload),
                    Some(SonarAltitudeData { altitude: 10.0 })
                );
            }
        })
        .await;

        assert!(received.is_ok(), "no updates within 5s");
        let summary = aggregator.summary();
        assert_eq!(summary.total_updates, 10);
        assert_eq!(summary.missed_updates, 0);
        assert_eq!(summary.last_sequence, Some(10));
        assert!(summary.interval_ms.mean > 0.0);
    }
}
