//! Recorded objects of resource instances.
//!
//! These types represent what is already known about a remote object before
//! a change is planned for it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::{Marks, Value};

/// Status of a recorded object.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStatus {
    /// Object exists and is usable.
    #[default]
    Ready,
    /// Object exists but is known to be bad and must be replaced.
    Tainted,
    /// Placeholder for an object with a change still in flight.
    Planned,
}

impl fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "ready",
            Self::Tainted => "tainted",
            Self::Planned => "planned",
        };
        write!(f, "{s}")
    }
}

/// One recorded object of a resource instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstanceObject {
    /// The object's value.
    pub value: Value,
    /// Marks on the value.
    pub marks: Marks,
    /// Status.
    pub status: ObjectStatus,
    /// Provider-private bytes, opaque to the engine.
    pub private: Vec<u8>,
}

impl ResourceInstanceObject {
    /// Creates a ready object without marks or private data.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self {
            value,
            marks: Marks::new(),
            status: ObjectStatus::Ready,
            private: Vec::new(),
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: ObjectStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the marks.
    #[must_use]
    pub fn with_marks(mut self, marks: Marks) -> Self {
        self.marks = marks;
        self
    }

    /// Sets the provider-private bytes.
    #[must_use]
    pub fn with_private(mut self, private: Vec<u8>) -> Self {
        self.private = private;
        self
    }

    /// Returns true if the object is tainted.
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        self.status == ObjectStatus::Tainted
    }
}
