//! Conversion between [`Value`] and JSON.
//!
//! JSON has no unknown values, so unknowns are written as `null` and their
//! locations are carried separately as a [`PathSet`].

use serde_json::Value as Json;
use std::collections::BTreeMap;

use super::path::{Path, PathSet};
use super::ty::{PathError, Type};
use super::value::Value;

impl Value {
    /// Decodes JSON against `ty`.
    ///
    /// Object attributes missing from the JSON decode as null. With
    /// [`Type::Dynamic`] the type is inferred from the JSON itself.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first location that does not fit `ty`.
    pub fn from_json(json: &Json, ty: &Type) -> Result<Self, PathError> {
        decode(json, ty, &Path::root())
    }

    /// Decodes JSON and then marks every path in `unknown` as unknown.
    ///
    /// # Errors
    ///
    /// Same as [`Value::from_json`].
    pub fn from_json_with_unknowns(
        json: &Json,
        ty: &Type,
        unknown: &PathSet,
    ) -> Result<Self, PathError> {
        let value = Self::from_json(json, ty)?;
        if unknown.contains(&Path::root()) {
            return Ok(Self::Unknown(value.ty()));
        }
        Ok(value.with_unknowns(unknown))
    }

    /// Encodes this value as JSON, writing unknowns as `null`.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null(_) | Self::Unknown(_) => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => Json::Number(n.clone()),
            Self::String(s) => Json::String(s.clone()),
            Self::List(_, items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(_, entries) | Self::Object(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn decode(json: &Json, ty: &Type, path: &Path) -> Result<Value, PathError> {
    let mismatch = |want: &Type| {
        PathError::new(
            path.clone(),
            format!("{} required, but have {}", want.friendly_name(), json_kind(json)),
        )
    };

    match (json, ty) {
        (Json::Null, ty) => Ok(Value::Null(ty.clone())),
        (json, Type::Dynamic) => Ok(infer(json)),
        (Json::Bool(b), Type::Bool) => Ok(Value::Bool(*b)),
        (Json::Number(n), Type::Number) => Ok(Value::Number(n.clone())),
        (Json::String(s), Type::String) => Ok(Value::String(s.clone())),
        (Json::Array(items), Type::List(elem)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| decode(item, elem, &path.join_index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(|items| Value::List((**elem).clone(), items)),
        (Json::Object(entries), Type::Map(elem)) => entries
            .iter()
            .map(|(k, v)| decode(v, elem, &path.join_key(k)).map(|v| (k.clone(), v)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(|entries| Value::Map((**elem).clone(), entries)),
        (Json::Object(entries), Type::Object(types)) => {
            if let Some(name) = entries.keys().find(|name| !types.contains_key(*name)) {
                return Err(PathError::new(
                    path.clone(),
                    format!("unsupported attribute {name:?}"),
                ));
            }
            let mut attrs = BTreeMap::new();
            for (name, attr_ty) in types {
                let attr = match entries.get(name) {
                    Some(json) => decode(json, attr_ty, &path.join_attr(name))?,
                    None => Value::Null(attr_ty.clone()),
                };
                attrs.insert(name.clone(), attr);
            }
            Ok(Value::Object(attrs))
        }
        (_, want) => Err(mismatch(want)),
    }
}

fn infer(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null(Type::Dynamic),
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.clone()),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(Type::Dynamic, items.iter().map(infer).collect()),
        Json::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), infer(v)))
                .collect(),
        ),
    }
}

const fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
