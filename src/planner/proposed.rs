//! Proposed new values.
//!
//! The proposed value is the engine's best guess at the planned value, handed
//! to the provider as a starting point. The provider is free to ignore it.

use std::collections::BTreeMap;

use crate::schema::{NestedBlock, NestingMode, Schema};
use crate::value::Value;

/// Merges `prior` and `config` according to `schema`.
///
/// Attributes the provider may decide keep their prior value unless the
/// configuration sets them; everything else takes the configuration value.
#[must_use]
pub fn proposed_new_object(schema: &Schema, prior: &Value, config: &Value) -> Value {
    if config.is_null() && prior.is_null() {
        return prior.clone();
    }
    if prior.is_null() {
        return merge_object(schema, &schema.all_attributes_null(), config);
    }
    merge_object(schema, prior, config)
}

fn merge_object(schema: &Schema, prior: &Value, config: &Value) -> Value {
    if config.is_null() || !config.is_known() {
        return prior.clone();
    }

    let mut attrs = BTreeMap::new();

    for (name, attr) in &schema.attributes {
        let prior_value = attr_or_null(prior, name, || Value::null(attr.ty.clone()));
        let config_value = attr_or_null(config, name, || Value::null(attr.ty.clone()));

        let value = match (attr.computed, attr.optional) {
            (true, true) if config_value.is_null() => prior_value,
            (true, true) => config_value,
            (true, false) => prior_value,
            _ => config_value,
        };
        attrs.insert(name.clone(), value);
    }

    for (name, block) in &schema.blocks {
        let prior_value = attr_or_null(prior, name, || block.empty_value());
        let config_value = attr_or_null(config, name, || block.empty_value());
        attrs.insert(name.clone(), merge_block(block, &prior_value, &config_value));
    }

    Value::Object(attrs)
}

fn merge_block(block: &NestedBlock, prior: &Value, config: &Value) -> Value {
    if !config.is_known() {
        return config.clone();
    }

    match block.nesting {
        NestingMode::Single if config.is_null() => config.clone(),
        NestingMode::Single => proposed_new_object(&block.block, prior, config),
        NestingMode::List => match config {
            Value::List(elem, items) => {
                let merged = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match prior {
                        Value::List(_, prior_items) => match prior_items.get(i) {
                            Some(prior_item) => proposed_new_object(&block.block, prior_item, item),
                            None => item.clone(),
                        },
                        Value::Unknown(ty) => proposed_new_object(
                            &block.block,
                            &Value::unknown(ty.element_type().cloned().unwrap_or_else(|| block.block.implied_type())),
                            item,
                        ),
                        _ => item.clone(),
                    })
                    .collect();
                Value::List(elem.clone(), merged)
            }
            _ => block.empty_value(),
        },
        NestingMode::Map => match config {
            Value::Map(elem, entries) => {
                let merged = entries
                    .iter()
                    .map(|(key, item)| {
                        let value = match prior {
                            Value::Map(_, prior_entries) => match prior_entries.get(key) {
                                Some(prior_item) => {
                                    proposed_new_object(&block.block, prior_item, item)
                                }
                                None => item.clone(),
                            },
                            _ => item.clone(),
                        };
                        (key.clone(), value)
                    })
                    .collect();
                Value::Map(elem.clone(), merged)
            }
            _ => block.empty_value(),
        },
    }
}

fn attr_or_null(object: &Value, name: &str, null: impl FnOnce() -> Value) -> Value {
    object.get_attr(name).unwrap_or_else(null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::value::Type;

    fn schema() -> Schema {
        Schema::new()
            .with_attribute("id", Attribute::computed(Type::String))
            .with_attribute("name", Attribute::required(Type::String))
            .with_attribute("zone", Attribute::optional_computed(Type::String))
            .with_attribute("note", Attribute::optional(Type::String))
            .with_block(
                "disk",
                NestingMode::List,
                Schema::new()
                    .with_attribute("size", Attribute::required(Type::Number))
                    .with_attribute("serial", Attribute::computed(Type::String)),
            )
    }

    fn disk(size: i64, serial: Option<&str>) -> Value {
        Value::object([
            ("size", Value::number(size)),
            (
                "serial",
                serial.map_or_else(|| Value::null(Type::String), Value::string),
            ),
        ])
    }

    fn disk_type() -> Type {
        Type::object([("serial", Type::String), ("size", Type::Number)])
    }

    fn instance(id: Value, name: &str, zone: Value, note: Value, disks: Vec<Value>) -> Value {
        Value::object([
            ("id", id),
            ("name", Value::string(name)),
            ("zone", zone),
            ("note", note),
            ("disk", Value::list(disk_type(), disks)),
        ])
    }

    #[test]
    fn test_both_null_returns_prior() {
        let prior = Value::null(schema().implied_type());
        let config = Value::null(schema().implied_type());
        assert_eq!(proposed_new_object(&schema(), &prior, &config), prior);
    }

    #[test]
    fn test_create_leaves_computed_null() {
        let prior = Value::null(schema().implied_type());
        let config = instance(
            Value::null(Type::String),
            "web",
            Value::null(Type::String),
            Value::string("hi"),
            vec![disk(10, None)],
        );
        let proposed = proposed_new_object(&schema(), &prior, &config);
        assert_eq!(proposed, config);
    }

    #[test]
    fn test_update_merges_computed_from_prior() {
        let prior = instance(
            Value::string("i-123"),
            "web",
            Value::string("zone-a"),
            Value::string("old"),
            vec![disk(10, Some("s-1"))],
        );
        let config = instance(
            Value::null(Type::String),
            "web2",
            Value::null(Type::String),
            Value::null(Type::String),
            vec![disk(20, None), disk(30, None)],
        );

        let proposed = proposed_new_object(&schema(), &prior, &config);
        assert_eq!(
            proposed,
            instance(
                Value::string("i-123"),
                "web2",
                Value::string("zone-a"),
                Value::null(Type::String),
                vec![disk(20, Some("s-1")), disk(30, None)],
            )
        );
    }

    #[test]
    fn test_configured_optional_computed_wins() {
        let prior = instance(
            Value::string("i-123"),
            "web",
            Value::string("zone-a"),
            Value::null(Type::String),
            Vec::new(),
        );
        let config = instance(
            Value::null(Type::String),
            "web",
            Value::string("zone-b"),
            Value::null(Type::String),
            Vec::new(),
        );
        let proposed = proposed_new_object(&schema(), &prior, &config);
        assert_eq!(proposed.get_attr("zone"), Some(Value::string("zone-b")));
    }
}
