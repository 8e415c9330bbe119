//! Dynamic structured values.

use serde_json::Number;
use std::collections::BTreeMap;
use std::fmt;

use super::path::{IndexKey, Path, PathSet, PathStep};
use super::ty::{PathError, Type};

/// A dynamically typed value as exchanged with providers.
///
/// `PartialEq` is raw structural equality: two unknowns of the same type are
/// equal. Use [`Value::equals`] for semantic equality, which treats unknowns
/// as undecidable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value of the given type.
    Null(Type),
    /// Value that will only be known after apply.
    Unknown(Type),
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(Number),
    /// String.
    String(String),
    /// List with its element type.
    List(Type, Vec<Self>),
    /// Map with its element type.
    Map(Type, BTreeMap<String, Self>),
    /// Object.
    Object(BTreeMap<String, Self>),
}

impl Value {
    /// Null of the given type.
    #[must_use]
    pub const fn null(ty: Type) -> Self {
        Self::Null(ty)
    }

    /// Unknown of the given type.
    #[must_use]
    pub const fn unknown(ty: Type) -> Self {
        Self::Unknown(ty)
    }

    /// String value.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Number value.
    #[must_use]
    pub fn number(n: impl Into<Number>) -> Self {
        Self::Number(n.into())
    }

    /// Builds an object from `(name, value)` pairs.
    #[must_use]
    pub fn object<I, K>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a map of `elem` typed values from `(key, value)` pairs.
    #[must_use]
    pub fn map<I, K>(elem: Type, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Map(elem, entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a list of `elem` typed values.
    #[must_use]
    pub const fn list(elem: Type, items: Vec<Self>) -> Self {
        Self::List(elem, items)
    }

    /// The type of this value.
    #[must_use]
    pub fn ty(&self) -> Type {
        match self {
            Self::Null(ty) | Self::Unknown(ty) => ty.clone(),
            Self::Bool(_) => Type::Bool,
            Self::Number(_) => Type::Number,
            Self::String(_) => Type::String,
            Self::List(elem, _) => Type::list(elem.clone()),
            Self::Map(elem, _) => Type::map(elem.clone()),
            Self::Object(attrs) => {
                Type::Object(attrs.iter().map(|(k, v)| (k.clone(), v.ty())).collect())
            }
        }
    }

    /// Returns true if this value is null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Returns true unless this value itself is unknown. Nested values may
    /// still be unknown.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Returns true if no part of this value is unknown.
    #[must_use]
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Self::Unknown(_) => false,
            Self::List(_, items) => items.iter().all(Self::is_wholly_known),
            Self::Map(_, entries) => entries.values().all(Self::is_wholly_known),
            Self::Object(attrs) => attrs.values().all(Self::is_wholly_known),
            _ => true,
        }
    }

    /// Number of elements of a list or map; zero for null values.
    #[must_use]
    pub fn length(&self) -> usize {
        match self {
            Self::List(_, items) => items.len(),
            Self::Map(_, entries) => entries.len(),
            _ => 0,
        }
    }

    /// Semantic equality.
    ///
    /// Returns `None` when the answer depends on unknown values. A definite
    /// difference anywhere in the structure wins over undecidability.
    #[must_use]
    pub fn equals(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Self::Unknown(_), _) | (_, Self::Unknown(_)) => None,
            (Self::Null(_), Self::Null(_)) => Some(true),
            (Self::Null(_), _) | (_, Self::Null(_)) => Some(false),
            (Self::Bool(a), Self::Bool(b)) => Some(a == b),
            (Self::Number(a), Self::Number(b)) => Some(numbers_equal(a, b)),
            (Self::String(a), Self::String(b)) => Some(a == b),
            (Self::List(_, a), Self::List(_, b)) => {
                if a.len() != b.len() {
                    return Some(false);
                }
                combine_equality(a.iter().zip(b).map(|(x, y)| x.equals(y)))
            }
            (Self::Map(_, a), Self::Map(_, b)) | (Self::Object(a), Self::Object(b)) => {
                if a.len() != b.len() || a.keys().any(|k| !b.contains_key(k)) {
                    return Some(false);
                }
                combine_equality(a.iter().map(|(k, v)| b.get(k).and_then(|w| v.equals(w))))
            }
            _ => Some(false),
        }
    }

    /// Structural equality that compares numbers by value.
    ///
    /// Unlike [`Value::equals`], unknowns compare equal to unknowns of the
    /// same type, and null and unknown types must match exactly.
    #[must_use]
    pub fn raw_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => numbers_equal(a, b),
            (Self::List(ta, a), Self::List(tb, b)) => {
                ta == tb && a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.raw_equals(y))
            }
            (Self::Map(ta, a), Self::Map(tb, b)) => ta == tb && entries_raw_equal(a, b),
            (Self::Object(a), Self::Object(b)) => entries_raw_equal(a, b),
            _ => self == other,
        }
    }

    /// Returns true only when [`Value::equals`] is definitely true.
    #[must_use]
    pub fn definitely_equals(&self, other: &Self) -> bool {
        self.equals(other) == Some(true)
    }

    /// Returns an attribute of an object.
    ///
    /// Attributes of null or unknown objects are null or unknown of the
    /// attribute's type respectively.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<Self> {
        match self {
            Self::Object(attrs) => attrs.get(name).cloned(),
            Self::Null(Type::Object(types)) => types.get(name).cloned().map(Self::Null),
            Self::Unknown(Type::Object(types)) => types.get(name).cloned().map(Self::Unknown),
            Self::Null(Type::Dynamic) => Some(Self::Null(Type::Dynamic)),
            Self::Unknown(Type::Dynamic) => Some(Self::Unknown(Type::Dynamic)),
            _ => None,
        }
    }

    /// Resolves `path` against this value.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failing step when the path does not exist
    /// in this value, including steps through null values.
    pub fn get_path(&self, path: &Path) -> Result<Self, PathError> {
        let mut current = self.clone();
        let mut walked = Path::root();

        for step in path.steps() {
            current = current.apply_step(step).map_err(|message| {
                PathError::new(walked.clone(), message)
            })?;
            walked = walked.join(step.clone());
        }

        Ok(current)
    }

    fn apply_step(&self, step: &PathStep) -> Result<Self, String> {
        match (self, step) {
            (Self::Null(_), _) => Err(String::from("cannot traverse a null value")),
            (Self::Unknown(ty), _) => Ok(Self::Unknown(step_type(ty, step).unwrap_or(Type::Dynamic))),
            (Self::Object(attrs), PathStep::Attr(name)) => attrs
                .get(name)
                .cloned()
                .ok_or_else(|| format!("object has no attribute {name:?}")),
            (Self::List(_, items), PathStep::Index(IndexKey::Int(idx))) => usize::try_from(*idx)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| format!("index {idx} is out of range")),
            (Self::Map(_, entries), PathStep::Index(IndexKey::String(key))) => entries
                .get(key)
                .cloned()
                .ok_or_else(|| format!("map has no element for key {key:?}")),
            (value, PathStep::Attr(name)) => Err(format!(
                "cannot access attribute {name:?} on a value of type {}",
                value.ty().friendly_name()
            )),
            (value, PathStep::Index(_)) => Err(format!(
                "cannot index a value of type {}",
                value.ty().friendly_name()
            )),
        }
    }

    /// Collects the paths of every unknown value in this value.
    #[must_use]
    pub fn unknown_paths(&self) -> PathSet {
        let mut paths = PathSet::new();
        self.walk(&Path::root(), &mut |path, value| {
            if !value.is_known() {
                paths.insert(path.clone());
            }
        });
        paths
    }

    /// Returns a copy where every value at one of `paths` is replaced by an
    /// unknown of the same type. Paths that do not exist are ignored.
    #[must_use]
    pub fn with_unknowns(&self, paths: &PathSet) -> Self {
        self.map_paths(&Path::root(), &mut |path, value| {
            if paths.contains(path) {
                Some(Self::Unknown(value.ty()))
            } else {
                None
            }
        })
    }

    /// Visits every value in pre-order together with its path.
    pub fn walk(&self, path: &Path, visit: &mut impl FnMut(&Path, &Self)) {
        visit(path, self);
        match self {
            Self::List(_, items) => {
                for (i, item) in items.iter().enumerate() {
                    item.walk(&path.join_index(i), visit);
                }
            }
            Self::Map(_, entries) => {
                for (key, item) in entries {
                    item.walk(&path.join_key(key), visit);
                }
            }
            Self::Object(attrs) => {
                for (name, item) in attrs {
                    item.walk(&path.join_attr(name), visit);
                }
            }
            _ => {}
        }
    }

    /// Rebuilds this value top-down. When `replace` returns a value for a
    /// path, that value is used and its children are not visited.
    #[must_use]
    pub fn map_paths(
        &self,
        path: &Path,
        replace: &mut impl FnMut(&Path, &Self) -> Option<Self>,
    ) -> Self {
        if let Some(replacement) = replace(path, self) {
            return replacement;
        }
        match self {
            Self::List(elem, items) => Self::List(
                elem.clone(),
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.map_paths(&path.join_index(i), replace))
                    .collect(),
            ),
            Self::Map(elem, entries) => Self::Map(
                elem.clone(),
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), item.map_paths(&path.join_key(key), replace)))
                    .collect(),
            ),
            Self::Object(attrs) => Self::Object(
                attrs
                    .iter()
                    .map(|(name, item)| {
                        (name.clone(), item.map_paths(&path.join_attr(name), replace))
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Checks this value against `want`, reporting one error per offending
    /// location.
    #[must_use]
    pub fn conformance_errors(&self, want: &Type) -> Vec<PathError> {
        let mut errs = Vec::new();
        self.collect_conformance(want, &Path::root(), &mut errs);
        errs
    }

    fn collect_conformance(&self, want: &Type, path: &Path, errs: &mut Vec<PathError>) {
        match (self, want) {
            (_, Type::Dynamic) => {}
            (Self::Null(Type::Dynamic) | Self::Unknown(Type::Dynamic), _) => {}
            (Self::Null(ty) | Self::Unknown(ty), want) => {
                for mut err in ty.conformance_errors(want) {
                    err.path = Path::from_steps(
                        path.steps().iter().chain(err.path.steps()).cloned().collect(),
                    );
                    errs.push(err);
                }
            }
            (Self::List(_, items), Type::List(elem)) => {
                for (i, item) in items.iter().enumerate() {
                    item.collect_conformance(elem, &path.join_index(i), errs);
                }
            }
            (Self::Map(_, entries), Type::Map(elem)) => {
                for (key, item) in entries {
                    item.collect_conformance(elem, &path.join_key(key), errs);
                }
            }
            (Self::Object(attrs), Type::Object(types)) => {
                for (name, ty) in types {
                    match attrs.get(name) {
                        Some(attr) => attr.collect_conformance(ty, &path.join_attr(name), errs),
                        None => errs.push(PathError::new(
                            path.clone(),
                            format!("attribute {name:?} is required"),
                        )),
                    }
                }
                for name in attrs.keys().filter(|name| !types.contains_key(*name)) {
                    errs.push(PathError::new(
                        path.clone(),
                        format!("unsupported attribute {name:?}"),
                    ));
                }
            }
            (Self::Bool(_), Type::Bool)
            | (Self::Number(_), Type::Number)
            | (Self::String(_), Type::String) => {}
            (value, want) => errs.push(PathError::new(
                path.clone(),
                format!(
                    "{} required, but have {}",
                    want.friendly_name(),
                    value.ty().friendly_name()
                ),
            )),
        }
    }
}

fn step_type(ty: &Type, step: &PathStep) -> Option<Type> {
    match (ty, step) {
        (Type::Object(attrs), PathStep::Attr(name)) => attrs.get(name).cloned(),
        (Type::List(elem) | Type::Map(elem), PathStep::Index(_)) => Some((**elem).clone()),
        _ => None,
    }
}

fn entries_raw_equal(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|w| v.raw_equals(w)))
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => false,
    }
}

fn combine_equality(results: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    let mut undecided = false;
    for result in results {
        match result {
            Some(false) => return Some(false),
            None => undecided = true,
            Some(true) => {}
        }
    }
    if undecided { None } else { Some(true) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(_) => write!(f, "null"),
            Self::Unknown(_) => write!(f, "(known after apply)"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(_, items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(_, entries) | Self::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key} = {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(n: f64) -> Value {
        Value::Number(Number::from_f64(n).unwrap())
    }

    #[test]
    fn test_raw_equals_compares_numbers_by_value() {
        assert_ne!(Value::number(1), float(1.0));
        assert!(Value::number(1).raw_equals(&float(1.0)));
        assert!(!Value::number(1).raw_equals(&float(1.5)));

        let a = Value::object([("size", Value::number(1)), ("id", Value::unknown(Type::String))]);
        let b = Value::object([("size", float(1.0)), ("id", Value::unknown(Type::String))]);
        assert!(a.raw_equals(&b));
        assert!(!a.raw_equals(&Value::object([("size", float(1.0)), ("id", Value::string("x"))])));
        assert!(!Value::null(Type::String).raw_equals(&Value::unknown(Type::String)));
    }

    fn sample() -> Value {
        Value::object([
            ("name", Value::string("web")),
            (
                "tags",
                Value::map(Type::String, [("env", Value::string("prod"))]),
            ),
            (
                "ports",
                Value::list(Type::Number, vec![Value::number(80), Value::number(443)]),
            ),
        ])
    }

    #[test]
    fn test_equals_is_three_valued() {
        let a = sample();
        assert_eq!(a.equals(&sample()), Some(true));

        let unknown_name = Value::object([
            ("name", Value::unknown(Type::String)),
            ("tags", Value::map(Type::String, [("env", Value::string("prod"))])),
            ("ports", Value::list(Type::Number, vec![Value::number(80), Value::number(443)])),
        ]);
        assert_eq!(a.equals(&unknown_name), None);

        let unknown_and_different = Value::object([
            ("name", Value::unknown(Type::String)),
            ("tags", Value::map(Type::String, [("env", Value::string("dev"))])),
            ("ports", Value::list(Type::Number, vec![Value::number(80), Value::number(443)])),
        ]);
        assert_eq!(a.equals(&unknown_and_different), Some(false));
    }

    #[test]
    fn test_get_path() {
        let value = sample();
        let env: Path = r#"tags["env"]"#.parse().unwrap();
        assert_eq!(value.get_path(&env).unwrap(), Value::string("prod"));

        let port: Path = "ports[1]".parse().unwrap();
        assert_eq!(value.get_path(&port).unwrap(), Value::number(443));

        let missing: Path = "ports[5]".parse().unwrap();
        assert!(value.get_path(&missing).is_err());

        let missing_key: Path = r#"tags["team"]"#.parse().unwrap();
        assert!(value.get_path(&missing_key).is_err());
    }

    #[test]
    fn test_get_path_through_unknown() {
        let value = Value::object([(
            "tags",
            Value::unknown(Type::map(Type::String)),
        )]);
        let env: Path = r#"tags["env"]"#.parse().unwrap();
        assert_eq!(value.get_path(&env).unwrap(), Value::unknown(Type::String));
    }

    #[test]
    fn test_unknown_paths_round_trip() {
        let value = Value::object([
            ("id", Value::unknown(Type::String)),
            ("name", Value::string("web")),
        ]);
        let paths = value.unknown_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths.contains(&Path::attr("id")));

        let known = Value::object([
            ("id", Value::null(Type::String)),
            ("name", Value::string("web")),
        ]);
        assert_eq!(known.with_unknowns(&paths), value);
    }

    #[test]
    fn test_conformance() {
        let want = Type::object([
            ("name", Type::String),
            ("ports", Type::list(Type::Number)),
            ("tags", Type::map(Type::String)),
        ]);
        assert!(sample().conformance_errors(&want).is_empty());

        let bad = Value::object([
            ("name", Value::number(1)),
            ("ports", Value::list(Type::Number, vec![Value::string("x")])),
            ("tags", Value::null(Type::map(Type::String))),
        ]);
        let errs = bad.conformance_errors(&want);
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].path, Path::attr("name"));
        assert_eq!(errs[1].path.to_string(), "ports[0]");
    }
}
