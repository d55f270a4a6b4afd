//! Module error types

use contracts::ContractError;
use thiserror::Error;

/// Lifecycle errors, returned synchronously to the bootstrap
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Initialize could not register the module's objects
    #[error("module '{module}' failed to initialize: {source}")]
    Initialization {
        module: String,
        #[source]
        source: ContractError,
    },

    /// Start could not create the module's task
    #[error("module '{module}' failed to create its task: {source}")]
    TaskCreation {
        module: String,
        #[source]
        source: ContractError,
    },

    /// Start called before a successful initialize
    #[error("module '{module}' started before initialize")]
    NotInitialized { module: String },

    /// Start called twice
    #[error("module '{module}' already started")]
    AlreadyStarted { module: String },
}

impl ModuleError {
    pub fn initialization(module: impl Into<String>, source: ContractError) -> Self {
        Self::Initialization {
            module: module.into(),
            source,
        }
    }

    pub fn task_creation(module: impl Into<String>, source: ContractError) -> Self {
        Self::TaskCreation {
            module: module.into(),
            source,
        }
    }

    pub fn not_initialized(module: impl Into<String>) -> Self {
        Self::NotInitialized {
            module: module.into(),
        }
    }

    pub fn already_started(module: impl Into<String>) -> Self {
        Self::AlreadyStarted {
            module: module.into(),
        }
    }
}

/// Sensor read failure
#[derive(Debug, Error)]
pub enum ReadError {
    /// No fresh sample this period
    #[error("sensor not ready")]
    NotReady,

    /// Device reported an error
    #[error("sensor read failed: {0}")]
    Device(String),
}

/// Failure of one period's unit of work; never ends the worker loop
#[derive(Debug, Error)]
pub enum JobError {
    /// Read failed, nothing was published this period
    #[error("read skipped: {0}")]
    Read(#[from] ReadError),

    /// Store rejected the publish
    #[error("publish failed: {0}")]
    Publish(#[from] ContractError),
}
