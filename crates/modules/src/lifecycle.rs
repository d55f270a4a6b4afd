//! Module lifecycle: registration and two-phase bring-up
//!
//! Every module is described once, registered into a `ModuleRegistry`, and
//! handed to `Bootstrap::run`, which initializes all modules before starting
//! any of them.

use std::fmt;
use std::sync::Arc;

use contracts::{InitFailurePolicy, TaskHandle};
use tracing::{error, info, instrument, warn};

use crate::error::ModuleError;
use crate::worker::WorkerMetrics;

/// A firmware module with a two-phase lifecycle
pub trait Module: Send {
    /// Stable name for logs, metrics and records
    fn name(&self) -> &str;

    /// Register the module's objects; no timing side effects
    fn initialize(&mut self) -> Result<(), ModuleError>;

    /// Create the module's task; requires a successful `initialize`
    fn start(&mut self) -> Result<TaskHandle, ModuleError>;

    /// Counters of the module's worker, if it has one
    fn metrics(&self) -> Option<Arc<WorkerMetrics>> {
        None
    }
}

/// Registration entry for one module
pub struct ModuleDescriptor {
    module: Box<dyn Module>,
}

impl ModuleDescriptor {
    pub fn new(module: impl Module + 'static) -> Self {
        Self {
            module: Box::new(module),
        }
    }

    pub fn name(&self) -> &str {
        self.module.name()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name())
            .finish()
    }
}

/// Ordered set of module descriptors, consumed once by the bootstrap
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    descriptors: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor; registration order is the init and start order
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered module names, in order
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(ModuleDescriptor::name).collect()
    }
}

/// Lifecycle state of a module after bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Registered,
    Initialized,
    InitFailed,
    Running,
    StartFailed,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Registered => "registered",
            ModuleState::Initialized => "initialized",
            ModuleState::InitFailed => "init_failed",
            ModuleState::Running => "running",
            ModuleState::StartFailed => "start_failed",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bootstrap outcome for one module
#[derive(Debug)]
pub struct ModuleRecord {
    pub name: String,
    pub state: ModuleState,
    /// Handle of the module's task, owned here for the life of the process
    pub task: Option<TaskHandle>,
    pub error: Option<ModuleError>,
}

/// Modules brought up by the bootstrap, kept alive with their records
pub struct SystemModules {
    modules: Vec<Box<dyn Module>>,
    records: Vec<ModuleRecord>,
}

impl SystemModules {
    /// Records in registration order
    pub fn records(&self) -> &[ModuleRecord] {
        &self.records
    }

    pub fn record(&self, name: &str) -> Option<&ModuleRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    /// Number of modules whose task is running
    pub fn running(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.state == ModuleState::Running)
            .count()
    }

    /// Worker metrics of the named module
    pub fn metrics(&self, name: &str) -> Option<Arc<WorkerMetrics>> {
        self.modules
            .iter()
            .find(|module| module.name() == name)
            .and_then(|module| module.metrics())
    }
}

impl fmt::Debug for SystemModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemModules")
            .field("records", &self.records)
            .finish()
    }
}

/// Two-phase bring-up of every registered module
#[derive(Debug, Clone, Copy, Default)]
pub struct Bootstrap {
    policy: InitFailurePolicy,
}

impl Bootstrap {
    pub fn new(policy: InitFailurePolicy) -> Self {
        Self { policy }
    }

    /// Initialize every module, then start every initialized module
    ///
    /// Start failures are recorded and never affect other modules.
    ///
    /// # Errors
    /// With `InitFailurePolicy::Abort`, the first initialize error; no module
    /// is started in that case.
    #[instrument(name = "bootstrap", skip_all, fields(modules = registry.len(), policy = ?self.policy))]
    pub fn run(&self, registry: ModuleRegistry) -> Result<SystemModules, ModuleError> {
        let mut modules: Vec<Box<dyn Module>> = registry
            .descriptors
            .into_iter()
            .map(|descriptor| descriptor.module)
            .collect();

        let mut records: Vec<ModuleRecord> = modules
            .iter()
            .map(|module| ModuleRecord {
                name: module.name().to_string(),
                state: ModuleState::Registered,
                task: None,
                error: None,
            })
            .collect();

        // Phase 1: initialize all
        for (module, record) in modules.iter_mut().zip(records.iter_mut()) {
            match module.initialize() {
                Ok(()) => {
                    transition(record, ModuleState::Initialized);
                    info!(module = %record.name, "module initialized");
                }
                Err(e) => {
                    error!(module = %record.name, error = %e, "module initialization failed");
                    if self.policy == InitFailurePolicy::Abort {
                        return Err(e);
                    }
                    transition(record, ModuleState::InitFailed);
                    record.error = Some(e);
                }
            }
        }

        // Phase 2: start the initialized ones
        for (module, record) in modules.iter_mut().zip(records.iter_mut()) {
            if record.state != ModuleState::Initialized {
                warn!(module = %record.name, state = %record.state, "module not started");
                continue;
            }

            match module.start() {
                Ok(task) => {
                    info!(module = %record.name, task = task.name(), task_id = task.id(), "module started");
                    transition(record, ModuleState::Running);
                    record.task = Some(task);
                }
                Err(e) => {
                    error!(module = %record.name, error = %e, "module start failed");
                    transition(record, ModuleState::StartFailed);
                    record.error = Some(e);
                }
            }
        }

        let system = SystemModules { modules, records };
        info!(running = system.running(), "bootstrap complete");
        Ok(system)
    }
}

fn transition(record: &mut ModuleRecord, state: ModuleState) {
    observability::record_module_state(&record.name, record.state.as_str(), false);
    observability::record_module_state(&record.name, state.as_str(), true);
    record.state = state;
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Module that journals its lifecycle calls
    struct JournaledModule {
        name: &'static str,
        journal: Journal,
        fail_init: bool,
        fail_start: bool,
        next_id: u32,
    }

    impl JournaledModule {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: journal.clone(),
                fail_init: false,
                fail_start: false,
                next_id: 0,
            }
        }
    }

    impl Module for JournaledModule {
        fn name(&self) -> &str {
            self.name
        }

        fn initialize(&mut self) -> Result<(), ModuleError> {
            self.journal.lock().unwrap().push(format!("init:{}", self.name));
            if self.fail_init {
                return Err(ModuleError::initialization(
                    self.name,
                    ContractError::Other("store full".into()),
                ));
            }
            Ok(())
        }

        fn start(&mut self) -> Result<TaskHandle, ModuleError> {
            self.journal.lock().unwrap().push(format!("start:{}", self.name));
            if self.fail_start {
                return Err(ModuleError::task_creation(
                    self.name,
                    ContractError::task_creation(self.name, "no free task slots"),
                ));
            }
            self.next_id += 1;
            Ok(TaskHandle::new(self.next_id, self.name))
        }
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[test]
    fn test_all_inits_run_before_any_start() {
        let journal = Journal::default();
        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new(JournaledModule::new("b", &journal)))
            .register(ModuleDescriptor::new(JournaledModule::new("a", &journal)))
            .register(ModuleDescriptor::new(JournaledModule::new("c", &journal)));
        assert_eq!(registry.names(), vec!["b", "a", "c"]);

        let system = Bootstrap::default().run(registry).unwrap();

        assert_eq!(
            entries(&journal),
            vec!["init:b", "init:a", "init:c", "start:b", "start:a", "start:c"]
        );
        assert_eq!(system.running(), 3);
        assert!(system.record("a").unwrap().task.is_some());
    }

    #[test]
    fn test_skip_policy_leaves_failed_module_stopped() {
        let journal = Journal::default();
        let mut broken = JournaledModule::new("broken", &journal);
        broken.fail_init = true;

        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new(broken))
            .register(ModuleDescriptor::new(JournaledModule::new("ok", &journal)));

        let system = Bootstrap::new(InitFailurePolicy::Skip).run(registry).unwrap();

        assert_eq!(entries(&journal), vec!["init:broken", "init:ok", "start:ok"]);
        let record = system.record("broken").unwrap();
        assert_eq!(record.state, ModuleState::InitFailed);
        assert!(matches!(record.error, Some(ModuleError::Initialization { .. })));
        assert_eq!(system.running(), 1);
    }

    #[test]
    fn test_abort_policy_starts_nothing() {
        let journal = Journal::default();
        let mut broken = JournaledModule::new("broken", &journal);
        broken.fail_init = true;

        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new(JournaledModule::new("first", &journal)))
            .register(ModuleDescriptor::new(broken))
            .register(ModuleDescriptor::new(JournaledModule::new("last", &journal)));

        let err = Bootstrap::new(InitFailurePolicy::Abort)
            .run(registry)
            .unwrap_err();

        assert!(matches!(err, ModuleError::Initialization { .. }));
        assert_eq!(entries(&journal), vec!["init:first", "init:broken"]);
    }

    #[test]
    fn test_start_failure_is_isolated() {
        let journal = Journal::default();
        let mut stuck = JournaledModule::new("stuck", &journal);
        stuck.fail_start = true;

        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new(stuck))
            .register(ModuleDescriptor::new(JournaledModule::new("ok", &journal)));

        let system = Bootstrap::default().run(registry).unwrap();

        assert_eq!(system.record("stuck").unwrap().state, ModuleState::StartFailed);
        assert_eq!(system.record("ok").unwrap().state, ModuleState::Running);
        assert!(system.metrics("ok").is_none());
    }

    #[test]
    fn test_empty_registry_boots() {
        let system = Bootstrap::default().run(ModuleRegistry::new()).unwrap();
        assert!(system.records().is_empty());
        assert_eq!(system.running(), 0);
    }
}
