//! Dynamic value model.
//!
//! - [`Value`]: typed dynamic values, including typed unknowns
//! - [`Type`]: value types and conformance checks
//! - [`Path`]: addresses of locations inside a value
//! - [`Marks`]: path-keyed annotations kept beside a value

mod json;
mod marks;
mod path;
mod ty;
#[allow(clippy::module_inception)]
mod value;

pub use marks::{Mark, Marks};
pub use path::{IndexKey, Path, PathParseError, PathSet, PathStep};
pub use ty::{PathError, Type, TypeParseError};
pub use value::Value;
