//! Planned changes to resource instances.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::{DeposedKey, Generation, ProviderAddr, ResourceInstanceAddr};
use crate::value::{Marks, PathSet, Value};

/// Action a change performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do.
    NoOp,
    /// Create a new object.
    Create,
    /// Update the object in place.
    Update,
    /// Destroy the object.
    Delete,
    /// Replace, creating the new object before destroying the old one.
    CreateThenDelete,
    /// Replace, destroying the old object before creating the new one.
    DeleteThenCreate,
}

impl Action {
    /// Returns true for either replace ordering.
    #[must_use]
    pub const fn is_replace(self) -> bool {
        matches!(self, Self::CreateThenDelete | Self::DeleteThenCreate)
    }

    /// The replace variant for a create-before-destroy setting.
    #[must_use]
    pub const fn replace(create_before_destroy: bool) -> Self {
        if create_before_destroy {
            Self::CreateThenDelete
        } else {
            Self::DeleteThenCreate
        }
    }

    /// Short symbol used in plan output.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::NoOp => " ",
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
            Self::CreateThenDelete => "+/-",
            Self::DeleteThenCreate => "-/+",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoOp => "NoOp",
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::CreateThenDelete => "CreateThenDelete",
            Self::DeleteThenCreate => "DeleteThenCreate",
        };
        write!(f, "{s}")
    }
}

/// A planned change to one object of a resource instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstanceChange {
    /// The instance.
    pub addr: ResourceInstanceAddr,
    /// Set when the change concerns a deposed object.
    pub deposed_key: Option<DeposedKey>,
    /// The provider configuration managing the instance.
    pub provider_addr: ProviderAddr,
    /// What the change does.
    pub action: Action,
    /// Value before the change.
    pub before: Value,
    /// Value after the change. May contain unknowns.
    pub after: Value,
    /// Marks on `before`.
    pub before_marks: Marks,
    /// Marks on `after`.
    pub after_marks: Marks,
    /// Provider-private bytes to pass to apply.
    pub private: Vec<u8>,
    /// Attributes whose change forces replacement.
    pub required_replace: PathSet,
}

impl ResourceInstanceChange {
    /// The object generation this change concerns.
    #[must_use]
    pub fn generation(&self) -> Generation {
        Generation::from_deposed(self.deposed_key.as_ref())
    }

    /// Human readable name: the address, plus the deposed key if any.
    #[must_use]
    pub fn display_addr(&self) -> String {
        match &self.deposed_key {
            Some(key) => format!("{} (deposed object {key})", self.addr),
            None => self.addr.to_string(),
        }
    }
}
