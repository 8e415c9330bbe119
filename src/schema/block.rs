//! Resource type schemas.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::{Path, PathSet, Type, Value};

/// Schema of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub ty: Type,

    /// Must be set in configuration.
    #[serde(default)]
    pub required: bool,

    /// May be set in configuration.
    #[serde(default)]
    pub optional: bool,

    /// May be decided by the provider.
    #[serde(default)]
    pub computed: bool,

    /// Value must not be shown to users.
    #[serde(default)]
    pub sensitive: bool,
}

impl Attribute {
    /// Creates a required attribute.
    #[must_use]
    pub const fn required(ty: Type) -> Self {
        Self {
            ty,
            required: true,
            optional: false,
            computed: false,
            sensitive: false,
        }
    }

    /// Creates an optional attribute.
    #[must_use]
    pub const fn optional(ty: Type) -> Self {
        Self {
            ty,
            required: false,
            optional: true,
            computed: false,
            sensitive: false,
        }
    }

    /// Creates a computed-only attribute.
    #[must_use]
    pub const fn computed(ty: Type) -> Self {
        Self {
            ty,
            required: false,
            optional: false,
            computed: true,
            sensitive: false,
        }
    }

    /// Creates an optional attribute the provider may also decide.
    #[must_use]
    pub const fn optional_computed(ty: Type) -> Self {
        Self {
            ty,
            required: false,
            optional: true,
            computed: true,
            sensitive: false,
        }
    }

    /// Marks the attribute as sensitive.
    #[must_use]
    pub fn with_sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Checks that the flag combination makes sense.
    ///
    /// # Errors
    ///
    /// Returns a description of the invalid combination.
    pub fn check_flags(&self) -> Result<(), String> {
        match (self.required, self.optional, self.computed) {
            (true, false, false) | (false, true, _) | (false, false, true) => Ok(()),
            (true, _, true) => Err(String::from("cannot be both required and computed")),
            (true, true, false) => Err(String::from("cannot be both required and optional")),
            (false, false, false) => Err(String::from(
                "must be at least one of required, optional or computed",
            )),
        }
    }
}

/// How a nested block is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    /// At most one block.
    Single,
    /// Ordered sequence of blocks.
    List,
    /// Blocks identified by a label.
    Map,
}

/// A nested block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// Repetition mode.
    pub nesting: NestingMode,

    /// Contents of each block.
    #[serde(flatten)]
    pub block: Schema,
}

impl NestedBlock {
    /// Type of the value holding all blocks of this kind.
    #[must_use]
    pub fn implied_type(&self) -> Type {
        let inner = self.block.implied_type();
        match self.nesting {
            NestingMode::Single => inner,
            NestingMode::List => Type::list(inner),
            NestingMode::Map => Type::map(inner),
        }
    }

    /// The value of this block when nothing is configured.
    #[must_use]
    pub fn empty_value(&self) -> Value {
        let inner = self.block.implied_type();
        match self.nesting {
            NestingMode::Single => Value::null(inner),
            NestingMode::List => Value::list(inner, Vec::new()),
            NestingMode::Map => Value::Map(inner, BTreeMap::new()),
        }
    }
}

/// Schema of a resource type, or of a block within one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Attributes by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,

    /// Nested block types by name.
    #[serde(default)]
    pub blocks: BTreeMap<String, NestedBlock>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: BTreeMap::new(),
            blocks: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Adds a nested block type.
    #[must_use]
    pub fn with_block(mut self, name: impl Into<String>, nesting: NestingMode, block: Self) -> Self {
        self.blocks.insert(name.into(), NestedBlock { nesting, block });
        self
    }

    /// The object type of values conforming to this schema.
    #[must_use]
    pub fn implied_type(&self) -> Type {
        let attrs = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.ty.clone()));
        let blocks = self
            .blocks
            .iter()
            .map(|(name, block)| (name.clone(), block.implied_type()));
        Type::Object(attrs.chain(blocks).collect())
    }

    /// A non-null object with every attribute null and every block collection
    /// empty.
    #[must_use]
    pub fn all_attributes_null(&self) -> Value {
        let attrs = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), Value::null(attr.ty.clone())));
        let blocks = self
            .blocks
            .iter()
            .map(|(name, block)| (name.clone(), block.empty_value()));
        Value::Object(attrs.chain(blocks).collect())
    }

    /// Paths of sensitive attributes, descending into single blocks.
    #[must_use]
    pub fn sensitive_paths(&self) -> PathSet {
        let mut paths = PathSet::new();
        self.collect_sensitive(&Path::root(), &mut paths);
        paths
    }

    fn collect_sensitive(&self, prefix: &Path, paths: &mut PathSet) {
        for (name, attr) in &self.attributes {
            if attr.sensitive {
                paths.insert(prefix.join_attr(name));
            }
        }
        for (name, block) in &self.blocks {
            if block.nesting == NestingMode::Single {
                block.block.collect_sensitive(&prefix.join_attr(name), paths);
            }
        }
    }

    /// Returns true if the top-level attribute `name` exists.
    #[must_use]
    pub fn has_attribute_or_block(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.blocks.contains_key(name)
    }
}
