//! Evaluated configuration of one resource instance.

use crate::planner::IgnoreSpec;
use crate::value::{Marks, Value};

/// Desired configuration handed to the diff engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    /// Configuration value, already evaluated against the schema.
    pub value: Value,
    /// Marks on the configuration value.
    pub marks: Marks,
    /// Parts of the configuration to ignore once the object exists.
    pub ignore: IgnoreSpec,
    /// Provider metadata forwarded unchanged to the provider.
    pub provider_meta: Option<Value>,
}

impl ResourceConfig {
    /// Creates a configuration without marks, ignores or provider metadata.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value,
            marks: Marks::new(),
            ignore: IgnoreSpec::default(),
            provider_meta: None,
        }
    }

    /// Sets the marks.
    #[must_use]
    pub fn with_marks(mut self, marks: Marks) -> Self {
        self.marks = marks;
        self
    }

    /// Sets the ignore spec.
    #[must_use]
    pub fn with_ignore(mut self, ignore: IgnoreSpec) -> Self {
        self.ignore = ignore;
        self
    }

    /// Sets the provider metadata.
    #[must_use]
    pub fn with_provider_meta(mut self, meta: Value) -> Self {
        self.provider_meta = Some(meta);
        self
    }
}
