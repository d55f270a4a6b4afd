//! Configuration validation
//!
//! Rules:
//! - tick_rate_hz in 1..=100_000
//! - max_tasks > 0, stack_pool_words > 0
//! - max_objects > 0, subscriber_queue > 0

use contracts::{ContractError, FirmwareConfig};

/// Highest tick rate the host schedulers can honor
pub const MAX_TICK_RATE_HZ: u32 = 100_000;

/// Validate a FirmwareConfig
///
/// Returns the first violation found, or Ok(()).
pub fn validate(config: &FirmwareConfig) -> Result<(), ContractError> {
    validate_scheduler(config)?;
    validate_object_store(config)?;
    Ok(())
}

fn validate_scheduler(config: &FirmwareConfig) -> Result<(), ContractError> {
    let scheduler = &config.scheduler;

    if scheduler.tick_rate_hz == 0 || scheduler.tick_rate_hz > MAX_TICK_RATE_HZ {
        return Err(ContractError::config_validation(
            "scheduler.tick_rate_hz",
            format!(
                "tick_rate_hz must be in 1..={MAX_TICK_RATE_HZ}, got {}",
                scheduler.tick_rate_hz
            ),
        ));
    }

    if scheduler.max_tasks == 0 {
        return Err(ContractError::config_validation(
            "scheduler.max_tasks",
            "max_tasks must be > 0",
        ));
    }

    if scheduler.stack_pool_words == 0 {
        return Err(ContractError::config_validation(
            "scheduler.stack_pool_words",
            "stack_pool_words must be > 0",
        ));
    }

    Ok(())
}

fn validate_object_store(config: &FirmwareConfig) -> Result<(), ContractError> {
    let store = &config.object_store;

    if store.max_objects == 0 {
        return Err(ContractError::config_validation(
            "object_store.max_objects",
            "max_objects must be > 0",
        ));
    }

    if store.subscriber_queue == 0 {
        return Err(ContractError::config_validation(
            "object_store.subscriber_queue",
            "subscriber_queue must be > 0",
        ));
    }

    Ok(())
}
