//! Typed data objects exchanged through the object store
//!
//! Every object has a type identity (`ObjectId`) and a payload. Producers and
//! consumers agree on the payload shape through the `UavObject` trait.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Object type identity (the store key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ObjectId {
    /// Altitude measured by the downward sonar
    SonarAltitude,
}

impl ObjectId {
    /// Object name as shown in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            ObjectId::SonarAltitude => "SonarAltitude",
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Object payload, one variant per object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ObjectPayload {
    SonarAltitude(SonarAltitudeData),
}

impl ObjectPayload {
    /// Identity of the object this payload belongs to
    pub fn object_id(&self) -> ObjectId {
        match self {
            ObjectPayload::SonarAltitude(_) => ObjectId::SonarAltitude,
        }
    }
}

/// Sonar altitude reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SonarAltitudeData {
    /// Altitude above ground (meters)
    pub altitude: f32,
}

/// A payload type bound to its object identity
pub trait UavObject: Clone + Send + Sync + 'static {
    /// Store key of this object
    const ID: ObjectId;

    /// Wrap into the store payload
    fn into_payload(self) -> ObjectPayload;

    /// Unwrap from the store payload, `None` if it belongs to another object
    fn from_payload(payload: &ObjectPayload) -> Option<Self>;
}

impl UavObject for SonarAltitudeData {
    const ID: ObjectId = ObjectId::SonarAltitude;

    fn into_payload(self) -> ObjectPayload {
        ObjectPayload::SonarAltitude(self)
    }

    fn from_payload(payload: &ObjectPayload) -> Option<Self> {
        match payload {
            ObjectPayload::SonarAltitude(data) => Some(*data),
        }
    }
}
