//! # UAV Objects
//!
//! In-memory implementation of the `TypedObjectStore` capability.
//!
//! Each registered object holds its latest value, a write sequence number and
//! a list of subscribers. Writes replace the value atomically under the store
//! lock; readers always see a complete value.
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{ObjectStoreExt, SonarAltitudeData};
//! use uavobjects::ObjectStore;
//!
//! let store = ObjectStore::new();
//! store.initialize_object::<SonarAltitudeData>()?;
//! let updates = store.subscribe(ObjectId::SonarAltitude)?;
//! store.set_object(SonarAltitudeData { altitude: 10.0 })?;
//! let update = updates.recv().await?;
//! ```

mod metrics;
mod store;

pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use store::ObjectStore;
