//! Attribute paths addressing locations inside a [`Value`](super::Value).
//!
//! Paths are written the same way users write them in `ignore_changes`:
//! `name`, `tags["env"]`, `disks[0].size`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Key of an index step.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Position in a list.
    Int(u64),
    /// Key in a map.
    String(String),
}

/// A single step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    /// Attribute of an object.
    Attr(String),
    /// Element of a list or map.
    Index(IndexKey),
}

/// An ordered sequence of steps from the root of a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path(Vec<PathStep>);

/// Error produced when a path string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path {input:?}: {reason}")]
pub struct PathParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Ordered set of paths.
pub type PathSet = BTreeSet<Path>;

impl Path {
    /// The empty path, addressing the root value.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from explicit steps.
    #[must_use]
    pub const fn from_steps(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    /// Shorthand for a single attribute step path.
    #[must_use]
    pub fn attr(name: impl Into<String>) -> Self {
        Self(vec![PathStep::Attr(name.into())])
    }

    /// Returns a new path with an attribute step appended.
    #[must_use]
    pub fn join_attr(&self, name: impl Into<String>) -> Self {
        self.join(PathStep::Attr(name.into()))
    }

    /// Returns a new path with a list index step appended.
    #[must_use]
    pub fn join_index(&self, index: usize) -> Self {
        self.join(PathStep::Index(IndexKey::Int(index as u64)))
    }

    /// Returns a new path with a map key step appended.
    #[must_use]
    pub fn join_key(&self, key: impl Into<String>) -> Self {
        self.join(PathStep::Index(IndexKey::String(key.into())))
    }

    /// Returns a new path with `step` appended.
    #[must_use]
    pub fn join(&self, step: PathStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    /// The steps of this path.
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The last step, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// The path without its last step.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, rest)| Self(rest.to_vec()))
    }

    /// If the last step is a textual map key, splits it off.
    #[must_use]
    pub fn split_map_key(&self) -> Option<(Self, String)> {
        match self.0.split_last() {
            Some((PathStep::Index(IndexKey::String(key)), rest)) => {
                Some((Self(rest.to_vec()), key.clone()))
            }
            _ => None,
        }
    }

    /// Returns true if `self` is `other` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Attr(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Attr(name) => write!(f, ".{name}")?,
                PathStep::Index(IndexKey::Int(idx)) => write!(f, "[{idx}]")?,
                PathStep::Index(IndexKey::String(key)) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| PathParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = input.trim().chars().collect();
        let mut steps = Vec::new();
        let mut pos = 0;

        while pos < chars.len() {
            match chars[pos] {
                '.' if steps.is_empty() => return Err(fail("path cannot start with '.'")),
                '.' => {
                    pos += 1;
                    let name = read_identifier(&chars, &mut pos);
                    if name.is_empty() {
                        return Err(fail("expected attribute name after '.'"));
                    }
                    steps.push(PathStep::Attr(name));
                }
                '[' => {
                    pos += 1;
                    let key = read_index(&chars, &mut pos).map_err(|reason| fail(&reason))?;
                    steps.push(PathStep::Index(key));
                }
                c if steps.is_empty() && is_identifier_char(c) => {
                    let name = read_identifier(&chars, &mut pos);
                    steps.push(PathStep::Attr(name));
                }
                c => return Err(fail(&format!("unexpected character '{c}'"))),
            }
        }

        if steps.is_empty() {
            return Err(fail("path is empty"));
        }
        Ok(Self(steps))
    }
}

impl TryFrom<String> for Path {
    type Error = PathParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn read_identifier(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < chars.len() && is_identifier_char(chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}

fn read_index(chars: &[char], pos: &mut usize) -> Result<IndexKey, String> {
    let key = if chars.get(*pos) == Some(&'"') {
        *pos += 1;
        let mut key = String::new();
        loop {
            match chars.get(*pos) {
                None => return Err(String::from("unterminated string key")),
                Some('"') => {
                    *pos += 1;
                    break;
                }
                Some('\\') => {
                    let escaped = chars
                        .get(*pos + 1)
                        .ok_or_else(|| String::from("dangling escape in key"))?;
                    key.push(*escaped);
                    *pos += 2;
                }
                Some(c) => {
                    key.push(*c);
                    *pos += 1;
                }
            }
        }
        IndexKey::String(key)
    } else {
        let start = *pos;
        while *pos < chars.len() && chars[*pos].is_ascii_digit() {
            *pos += 1;
        }
        let digits: String = chars[start..*pos].iter().collect();
        let idx = digits
            .parse::<u64>()
            .map_err(|_| format!("invalid index {digits:?}"))?;
        IndexKey::Int(idx)
    };

    if chars.get(*pos) != Some(&']') {
        return Err(String::from("expected ']'"));
    }
    *pos += 1;
    Ok(key)
}
