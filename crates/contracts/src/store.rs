//! TypedObjectStore trait - shared object bus abstraction
//!
//! Process-wide latest-value store keyed by `ObjectId`.
//! Policy: one designated writer per object, many readers. The store only
//! guarantees atomic replace per key; there is no cross-key consistency.

use crate::{ContractError, ObjectId, ObjectPayload, UavObject};

/// Notification delivered to subscribers after each accepted write
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUpdate {
    /// Object that changed
    pub object: ObjectId,

    /// Number of accepted writes to this object so far (1 for the first)
    pub sequence: u64,

    /// New value
    pub payload: ObjectPayload,
}

/// Type-addressed object store capability
///
/// # Example
///
/// ```ignore
/// store.initialize(ObjectId::SonarAltitude)?;
/// store.set(ObjectId::SonarAltitude, SonarAltitudeData { altitude: 10.0 }.into_payload())?;
/// let latest = store.get(ObjectId::SonarAltitude);
/// ```
pub trait TypedObjectStore: Send + Sync {
    /// Register an object type; calling it again for the same id is a no-op
    fn initialize(&self, object: ObjectId) -> Result<(), ContractError>;

    /// Atomically replace the current value of `object`
    fn set(&self, object: ObjectId, payload: ObjectPayload) -> Result<(), ContractError>;

    /// Latest value, `None` if never written
    fn get(&self, object: ObjectId) -> Option<ObjectPayload>;
}

/// Typed helpers over any `TypedObjectStore`
pub trait ObjectStoreExt: TypedObjectStore {
    /// Register `T`'s object id
    fn initialize_object<T: UavObject>(&self) -> Result<(), ContractError> {
        self.initialize(T::ID)
    }

    /// Publish a typed value
    fn set_object<T: UavObject>(&self, value: T) -> Result<(), ContractError> {
        self.set(T::ID, value.into_payload())
    }

    /// Read a typed value
    fn get_object<T: UavObject>(&self) -> Option<T> {
        self.get(T::ID).and_then(|payload| T::from_payload(&payload))
    }
}

impl<S: TypedObjectStore + ?Sized> ObjectStoreExt for S {}
