//! Resource schemas.
//!
//! A [`Schema`] describes the attributes and nested blocks of one resource
//! type; a [`ProviderSchema`] collects the schemas a provider publishes.

mod block;
mod provider;

pub use block::{Attribute, NestedBlock, NestingMode, Schema};
pub use provider::ProviderSchema;
