//! Layered error definitions
//!
//! Categorized by source: config / object store / scheduler

use thiserror::Error;

use crate::ObjectId;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Object Store Errors =====
    /// Object type could not be registered
    #[error("failed to register object {object}: {message}")]
    ObjectRegistration { object: ObjectId, message: String },

    /// Write or subscription on an object that was never initialized
    #[error("object {object} is not registered")]
    ObjectNotRegistered { object: ObjectId },

    /// Payload does not belong to the addressed object
    #[error("payload for {actual} cannot be stored under {expected}")]
    TypeMismatch {
        expected: ObjectId,
        actual: ObjectId,
    },

    /// Store refused the write
    #[error("publish to {object} rejected: {message}")]
    PublishRejected { object: ObjectId, message: String },

    // ===== Scheduler Errors =====
    /// Task could not be created
    #[error("failed to create task '{task}': {message}")]
    TaskCreation { task: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create object registration error
    pub fn object_registration(object: ObjectId, message: impl Into<String>) -> Self {
        Self::ObjectRegistration {
            object,
            message: message.into(),
        }
    }

    /// Create publish rejection error
    pub fn publish_rejected(object: ObjectId, message: impl Into<String>) -> Self {
        Self::PublishRejected {
            object,
            message: message.into(),
        }
    }

    /// Create task creation error
    pub fn task_creation(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskCreation {
            task: task.into(),
            message: message.into(),
        }
    }
}
