//! FirmwareConfig - Config Loader output
//!
//! Host harness settings: scheduler limits, object store limits, bootstrap
//! policy and which modules are enabled. Module timing constants are
//! compile-time and live with each module.

use serde::{Deserialize, Serialize};

use crate::TickRate;

/// Complete firmware harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirmwareConfig {
    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Object store settings
    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    /// Bootstrap settings
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Per-module switches
    #[serde(default)]
    pub modules: ModulesConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tick rate (Hz)
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    /// Maximum number of tasks
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    /// Memory available for task stacks, in 32-bit words
    #[serde(default = "default_stack_pool_words")]
    pub stack_pool_words: u32,
}

impl SchedulerConfig {
    pub fn tick_rate(&self) -> TickRate {
        TickRate::new(self.tick_rate_hz)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            max_tasks: default_max_tasks(),
            stack_pool_words: default_stack_pool_words(),
        }
    }
}

fn default_tick_rate_hz() -> u32 {
    1000
}

fn default_max_tasks() -> usize {
    16
}

fn default_stack_pool_words() -> u32 {
    8192
}

/// Object store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Maximum number of registered object types
    #[serde(default = "default_max_objects")]
    pub max_objects: usize,

    /// Per-subscriber notification queue length
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            max_objects: default_max_objects(),
            subscriber_queue: default_subscriber_queue(),
        }
    }
}

fn default_max_objects() -> usize {
    64
}

fn default_subscriber_queue() -> usize {
    32
}

/// Bootstrap configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// What to do when a module fails to initialize
    #[serde(default)]
    pub init_failure_policy: InitFailurePolicy,
}

/// Reaction to a module initialization failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitFailurePolicy {
    /// Leave the failed module unstarted, keep booting the rest
    #[default]
    Skip,
    /// Abort the whole boot
    Abort,
}

/// Per-module switches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModulesConfig {
    /// Sonar altitude module
    #[serde(default)]
    pub altitude: ModuleToggle,
}

/// Module enable switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleToggle {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for ModuleToggle {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}
