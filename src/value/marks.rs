//! Path-keyed annotations carried alongside a [`Value`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::path::{Path, PathSet};
use super::value::Value;

const SENSITIVE: &str = "sensitive";

/// An opaque annotation on part of a value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mark(String);

impl Mark {
    /// Creates a mark with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The sensitivity mark.
    #[must_use]
    pub fn sensitive() -> Self {
        Self(SENSITIVE.to_string())
    }

    /// Returns true for the sensitivity mark.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.0 == SENSITIVE
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side table of marks keyed by the path they apply to.
///
/// A mark on a path covers everything beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks(BTreeMap<Path, BTreeSet<Mark>>);

impl Marks {
    /// Creates an empty side table.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Marks every path in `paths` as sensitive.
    #[must_use]
    pub fn sensitive<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Self {
        let mut marks = Self::new();
        for path in paths {
            marks.insert(path.clone(), Mark::sensitive());
        }
        marks
    }

    /// Adds `mark` at `path`.
    pub fn insert(&mut self, path: Path, mark: Mark) {
        self.0.entry(path).or_default().insert(mark);
    }

    /// Returns true if nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of marked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over marked paths and their marks.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &BTreeSet<Mark>)> {
        self.0.iter()
    }

    /// Paths carrying the sensitivity mark.
    #[must_use]
    pub fn sensitive_paths(&self) -> PathSet {
        self.0
            .iter()
            .filter(|(_, marks)| marks.iter().any(Mark::is_sensitive))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Returns true if `path` or one of its ancestors is sensitive.
    #[must_use]
    pub fn covers_sensitive(&self, path: &Path) -> bool {
        self.0
            .iter()
            .any(|(marked, marks)| path.starts_with(marked) && marks.iter().any(Mark::is_sensitive))
    }

    /// Keeps only the marks whose path still resolves in `value`.
    #[must_use]
    pub fn filter_to(&self, value: &Value) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(path, _)| value.get_path(path).is_ok())
                .map(|(path, marks)| (path.clone(), marks.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(Path, Mark)> for Marks {
    fn from_iter<I: IntoIterator<Item = (Path, Mark)>>(iter: I) -> Self {
        let mut marks = Self::new();
        for (path, mark) in iter {
            marks.insert(path, mark);
        }
        marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Type;

    #[test]
    fn test_covers_descendants() {
        let marks = Marks::sensitive([&Path::attr("secret")]);
        assert!(marks.covers_sensitive(&Path::attr("secret")));
        assert!(marks.covers_sensitive(&Path::attr("secret").join_key("k")));
        assert!(!marks.covers_sensitive(&Path::attr("name")));
    }

    #[test]
    fn test_filter_to_drops_vanished_paths() {
        let marks = Marks::sensitive([&Path::attr("password"), &Path::attr("gone")]);
        let value = Value::object([("password", Value::string("hunter2"))]);

        let filtered = marks.filter_to(&value);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.sensitive_paths().contains(&Path::attr("password")));
    }

    #[test]
    fn test_filter_to_keeps_paths_under_unknowns() {
        let marks = Marks::sensitive([&Path::attr("password")]);
        let value = Value::unknown(Type::object([("password", Type::String)]));
        assert_eq!(marks.filter_to(&value), marks);
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a: Marks = [
            (Path::attr("a"), Mark::sensitive()),
            (Path::attr("b"), Mark::sensitive()),
        ]
        .into_iter()
        .collect();
        let b: Marks = [
            (Path::attr("b"), Mark::sensitive()),
            (Path::attr("a"), Mark::sensitive()),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
    }
}
