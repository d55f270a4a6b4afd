//! Latest-value object store

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{
    ContractError, ObjectId, ObjectPayload, ObjectStoreConfig, ObjectUpdate, TypedObjectStore,
};
use tracing::{debug, trace, warn};

use crate::metrics::StoreMetrics;

#[derive(Debug, Default)]
struct ObjectSlot {
    value: Option<ObjectPayload>,
    sequence: u64,
    subscribers: Vec<Sender<ObjectUpdate>>,
}

/// Thread-safe object store
#[derive(Debug)]
pub struct ObjectStore {
    config: ObjectStoreConfig,
    objects: RwLock<HashMap<ObjectId, ObjectSlot>>,
    metrics: Arc<StoreMetrics>,
}

impl ObjectStore {
    /// Create store with default limits
    pub fn new() -> Self {
        Self::with_config(ObjectStoreConfig::default())
    }

    /// Create store with the given limits
    pub fn with_config(config: ObjectStoreConfig) -> Self {
        Self {
            config,
            objects: RwLock::new(HashMap::new()),
            metrics: Arc::new(StoreMetrics::new()),
        }
    }

    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    /// Get metrics handle
    pub fn metrics(&self) -> Arc<StoreMetrics> {
        self.metrics.clone()
    }

    /// Whether `object` has been initialized
    pub fn is_registered(&self, object: ObjectId) -> bool {
        self.read().contains_key(&object)
    }

    /// Registered object ids, sorted
    pub fn registered(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of accepted writes to `object`
    pub fn sequence(&self, object: ObjectId) -> Option<u64> {
        self.read().get(&object).map(|slot| slot.sequence)
    }

    /// Receive every later update of `object`
    ///
    /// The queue holds `subscriber_queue` updates; when a consumer falls
    /// behind, newer updates are dropped for that consumer and counted.
    /// Dropping the receiver ends the subscription.
    ///
    /// # Errors
    /// `ContractError::ObjectNotRegistered` if `object` was never initialized.
    pub fn subscribe(&self, object: ObjectId) -> Result<Receiver<ObjectUpdate>, ContractError> {
        let mut objects = self.write();
        let slot = objects
            .get_mut(&object)
            .ok_or(ContractError::ObjectNotRegistered { object })?;

        let (tx, rx) = async_channel::bounded(self.config.subscriber_queue.max(1));
        slot.subscribers.push(tx);
        debug!(%object, subscribers = slot.subscribers.len(), "subscriber added");
        Ok(rx)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObjectId, ObjectSlot>> {
        self.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ObjectId, ObjectSlot>> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject(&self, err: ContractError) -> Result<(), ContractError> {
        self.metrics.inc_rejected_count();
        Err(err)
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TypedObjectStore for ObjectStore {
    fn initialize(&self, object: ObjectId) -> Result<(), ContractError> {
        let mut objects = self.write();
        if objects.contains_key(&object) {
            return Ok(());
        }

        if objects.len() >= self.config.max_objects {
            return Err(ContractError::object_registration(
                object,
                format!("store full ({} objects)", objects.len()),
            ));
        }

        objects.insert(object, ObjectSlot::default());
        self.metrics.set_registered(objects.len());
        debug!(%object, "object registered");
        Ok(())
    }

    fn set(&self, object: ObjectId, payload: ObjectPayload) -> Result<(), ContractError> {
        let actual = payload.object_id();
        if actual != object {
            return self.reject(ContractError::TypeMismatch {
                expected: object,
                actual,
            });
        }

        let mut objects = self.write();
        let Some(slot) = objects.get_mut(&object) else {
            drop(objects);
            return self.reject(ContractError::ObjectNotRegistered { object });
        };

        slot.sequence += 1;
        let sequence = slot.sequence;

        if !slot.subscribers.is_empty() {
            let update = ObjectUpdate {
                object,
                sequence,
                payload: payload.clone(),
            };
            slot.subscribers.retain(|tx| match tx.try_send(update.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.metrics.inc_dropped_count();
                    warn!(%object, sequence, "subscriber queue full, update dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
        }

        slot.value = Some(payload);
        self.metrics.inc_update_count();
        trace!(%object, sequence, "object updated");
        Ok(())
    }

    fn get(&self, object: ObjectId) -> Option<ObjectPayload> {
        self.read().get(&object).and_then(|slot| slot.value.clone())
    }
}
