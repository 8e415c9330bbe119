//! Value types.
//!
//! Types are written in a compact textual form, for example
//! `map(string)` or `object({name=string,size=number})`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::path::Path;

/// The type of a [`Value`](super::Value).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    /// Any type; decided by the value itself.
    Dynamic,
    /// Boolean.
    Bool,
    /// Arbitrary precision number.
    Number,
    /// UTF-8 string.
    String,
    /// Ordered list of a single element type.
    List(Box<Self>),
    /// String-keyed map of a single element type.
    Map(Box<Self>),
    /// Object with a fixed set of typed attributes.
    Object(BTreeMap<String, Self>),
}

/// Error produced when a type string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type {input:?}: {reason}")]
pub struct TypeParseError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

/// A problem found at a specific path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    /// Where the problem was found.
    pub path: Path,
    /// What the problem is.
    pub message: String,
}

impl PathError {
    /// Creates a new path error.
    #[must_use]
    pub fn new(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Renders the error with `prefix` (usually an instance address) in front
    /// of the path.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> String {
        if self.path.is_root() {
            format!("{prefix}: {}", self.message)
        } else {
            format!("{prefix}.{}: {}", self.path, self.message)
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.message)
        } else {
            write!(f, ".{}: {}", self.path, self.message)
        }
    }
}

impl Type {
    /// Shorthand for `list(elem)`.
    #[must_use]
    pub fn list(elem: Self) -> Self {
        Self::List(Box::new(elem))
    }

    /// Shorthand for `map(elem)`.
    #[must_use]
    pub fn map(elem: Self) -> Self {
        Self::Map(Box::new(elem))
    }

    /// Builds an object type from `(name, type)` pairs.
    #[must_use]
    pub fn object<I, K>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns true for bool, number and string.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Bool | Self::Number | Self::String)
    }

    /// Attribute types of an object type.
    #[must_use]
    pub const fn attribute_types(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Object(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Element type of a list or map type.
    #[must_use]
    pub fn element_type(&self) -> Option<&Self> {
        match self {
            Self::List(elem) | Self::Map(elem) => Some(elem),
            _ => None,
        }
    }

    /// Checks whether `self` conforms to `want`, returning one error per
    /// mismatching location.
    #[must_use]
    pub fn conformance_errors(&self, want: &Self) -> Vec<PathError> {
        let mut errs = Vec::new();
        self.collect_conformance(want, &Path::root(), &mut errs);
        errs
    }

    fn collect_conformance(&self, want: &Self, path: &Path, errs: &mut Vec<PathError>) {
        match (self, want) {
            (_, Self::Dynamic) => {}
            (Self::List(got), Self::List(exp)) | (Self::Map(got), Self::Map(exp)) => {
                let before = errs.len();
                got.collect_conformance(exp, path, errs);
                for err in &mut errs[before..] {
                    err.message = format!("element {}", err.message);
                }
            }
            (Self::Object(got), Self::Object(exp)) => {
                for (name, exp_ty) in exp {
                    match got.get(name) {
                        Some(got_ty) => {
                            got_ty.collect_conformance(exp_ty, &path.join_attr(name), errs);
                        }
                        None => errs.push(PathError::new(
                            path.clone(),
                            format!("attribute {name:?} is required"),
                        )),
                    }
                }
                for name in got.keys().filter(|name| !exp.contains_key(*name)) {
                    errs.push(PathError::new(
                        path.clone(),
                        format!("unsupported attribute {name:?}"),
                    ));
                }
            }
            (got, exp) if got == exp => {}
            (got, exp) => errs.push(PathError::new(
                path.clone(),
                format!("{} required, but have {}", exp.friendly_name(), got.friendly_name()),
            )),
        }
    }

    /// Human-oriented name used in error messages.
    #[must_use]
    pub fn friendly_name(&self) -> String {
        match self {
            Self::Dynamic => String::from("any type"),
            Self::Bool => String::from("bool"),
            Self::Number => String::from("number"),
            Self::String => String::from("string"),
            Self::List(elem) => format!("list of {}", elem.friendly_name()),
            Self::Map(elem) => format!("map of {}", elem.friendly_name()),
            Self::Object(_) => String::from("object"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic => write!(f, "dynamic"),
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::List(elem) => write!(f, "list({elem})"),
            Self::Map(elem) => write!(f, "map({elem})"),
            Self::Object(attrs) => {
                write!(f, "object({{")?;
                for (i, (name, ty)) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{name}={ty}")?;
                }
                write!(f, "}})")
            }
        }
    }
}

impl FromStr for Type {
    type Err = TypeParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let compact: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
        let mut pos = 0;
        let ty = parse_type(&compact, &mut pos).map_err(|reason| TypeParseError {
            input: input.to_string(),
            reason,
        })?;
        if pos != compact.len() {
            return Err(TypeParseError {
                input: input.to_string(),
                reason: String::from("trailing characters after type"),
            });
        }
        Ok(ty)
    }
}

impl TryFrom<String> for Type {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> Self {
        ty.to_string()
    }
}

fn parse_type(chars: &[char], pos: &mut usize) -> Result<Type, String> {
    let start = *pos;
    while *pos < chars.len() && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '_') {
        *pos += 1;
    }
    let keyword: String = chars[start..*pos].iter().collect();

    match keyword.as_str() {
        "dynamic" | "any" => Ok(Type::Dynamic),
        "bool" => Ok(Type::Bool),
        "number" => Ok(Type::Number),
        "string" => Ok(Type::String),
        "list" | "map" => {
            expect(chars, pos, '(')?;
            let elem = parse_type(chars, pos)?;
            expect(chars, pos, ')')?;
            Ok(if keyword == "list" {
                Type::list(elem)
            } else {
                Type::map(elem)
            })
        }
        "object" => {
            expect(chars, pos, '(')?;
            expect(chars, pos, '{')?;
            let mut attrs = BTreeMap::new();
            while chars.get(*pos) != Some(&'}') {
                let name_start = *pos;
                while *pos < chars.len()
                    && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '_')
                {
                    *pos += 1;
                }
                let name: String = chars[name_start..*pos].iter().collect();
                if name.is_empty() {
                    return Err(String::from("expected attribute name in object type"));
                }
                expect(chars, pos, '=')?;
                let ty = parse_type(chars, pos)?;
                attrs.insert(name, ty);
                if chars.get(*pos) == Some(&',') {
                    *pos += 1;
                }
            }
            expect(chars, pos, '}')?;
            expect(chars, pos, ')')?;
            Ok(Type::Object(attrs))
        }
        "" => Err(String::from("expected a type name")),
        other => Err(format!("unknown type {other:?}")),
    }
}

fn expect(chars: &[char], pos: &mut usize, want: char) -> Result<(), String> {
    if chars.get(*pos) == Some(&want) {
        *pos += 1;
        Ok(())
    } else {
        Err(format!("expected '{want}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ty: Type = "object({ name = string, tags = map(string), sizes = list(number) })"
            .parse()
            .unwrap();
        assert_eq!(
            ty,
            Type::object([
                ("name", Type::String),
                ("sizes", Type::list(Type::Number)),
                ("tags", Type::map(Type::String)),
            ])
        );
        assert_eq!(
            ty.to_string(),
            "object({name=string,sizes=list(number),tags=map(string)})"
        );
    }

    #[test]
    fn test_reject_unknown_type() {
        assert!("set(string)".parse::<Type>().is_err());
        assert!("list(string".parse::<Type>().is_err());
    }

    #[test]
    fn test_conformance_reports_each_path() {
        let want = Type::object([("name", Type::String), ("size", Type::Number)]);
        let got = Type::object([("name", Type::Bool), ("extra", Type::String)]);

        let errs = got.conformance_errors(&want);
        let messages: Vec<String> = errs.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                String::from(".name: string required, but have bool"),
                String::from("attribute \"size\" is required"),
                String::from("unsupported attribute \"extra\""),
            ]
        );
    }

    #[test]
    fn test_dynamic_accepts_anything() {
        assert!(Type::list(Type::String)
            .conformance_errors(&Type::Dynamic)
            .is_empty());
    }
}
