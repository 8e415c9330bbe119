//! Consistency checks on provider output.
//!
//! [`assert_plan_valid`] checks a planned value against the configuration and
//! prior value it was planned from. [`assert_object_compatible`] checks that a
//! value planned during apply only refines the value planned earlier.
//!
//! Both report every problem found, one [`PathError`] per location.

use std::collections::BTreeMap;

use crate::schema::{Attribute, NestingMode, Schema};
use crate::value::{Marks, Path, PathError, Type, Value};

const SENSITIVE_MISMATCH: &str = "inconsistent values for sensitive attribute";

/// Checks that `planned` is a valid plan for `config` given `prior`.
#[must_use]
pub fn assert_plan_valid(
    schema: &Schema,
    prior: &Value,
    config: &Value,
    planned: &Value,
) -> Vec<PathError> {
    let mut errs = Vec::new();
    plan_valid(schema, prior, config, planned, &Path::root(), &mut errs);
    errs
}

fn plan_valid(
    schema: &Schema,
    prior: &Value,
    config: &Value,
    planned: &Value,
    path: &Path,
    errs: &mut Vec<PathError>,
) {
    if planned.is_null() && !config.is_null() {
        errs.push(PathError::new(
            path.clone(),
            "planned for absence but config wants existence",
        ));
        return;
    }
    if config.is_null() && !planned.is_null() {
        errs.push(PathError::new(
            path.clone(),
            "planned for existence but config wants absence",
        ));
        return;
    }
    if planned.is_null() {
        return;
    }

    for (name, attr) in &schema.attributes {
        let null = || Value::null(attr.ty.clone());
        let planned_value = planned.get_attr(name).unwrap_or_else(null);
        let config_value = config.get_attr(name).unwrap_or_else(null);
        let prior_value = if prior.is_null() {
            null()
        } else {
            prior.get_attr(name).unwrap_or_else(null)
        };

        if let Some(message) = planned_value_error(attr, &prior_value, &config_value, &planned_value) {
            errs.push(PathError::new(path.join_attr(name), message));
        }
    }

    for (name, block) in &schema.blocks {
        let path = path.join_attr(name);
        let null = || Value::null(block.implied_type());
        let planned_value = planned.get_attr(name).unwrap_or_else(null);
        let config_value = config.get_attr(name).unwrap_or_else(null);
        let prior_value = if prior.is_null() {
            null()
        } else {
            prior.get_attr(name).unwrap_or_else(null)
        };

        if planned_value.raw_equals(&config_value) {
            continue;
        }
        if !planned_value.is_known() {
            errs.push(PathError::new(
                path,
                "attribute representing nested block must not be unknown itself; \
                 set nested attribute values to unknown instead",
            ));
            continue;
        }

        match block.nesting {
            NestingMode::Single => plan_valid(
                &block.block,
                &prior_value,
                &config_value,
                &planned_value,
                &path,
                errs,
            ),
            NestingMode::List => {
                let Value::List(_, planned_items) = &planned_value else {
                    errs.push(PathError::new(
                        path,
                        "attribute representing a list of nested blocks must be empty \
                         to indicate no blocks, not null",
                    ));
                    continue;
                };
                let config_items = match &config_value {
                    Value::List(_, items) => items.as_slice(),
                    _ => &[],
                };
                if planned_items.len() != config_items.len() {
                    errs.push(PathError::new(
                        path,
                        format!(
                            "block count in plan ({}) disagrees with count in config ({})",
                            planned_items.len(),
                            config_items.len()
                        ),
                    ));
                    continue;
                }
                for (i, (planned_item, config_item)) in
                    planned_items.iter().zip(config_items).enumerate()
                {
                    let item_path = path.join_index(i);
                    if !planned_item.is_known() {
                        errs.push(PathError::new(
                            item_path,
                            "element representing nested block must not be unknown itself; \
                             set nested attribute values to unknown instead",
                        ));
                        continue;
                    }
                    let prior_item = match &prior_value {
                        Value::List(_, items) => items.get(i).cloned(),
                        _ => None,
                    }
                    .unwrap_or_else(|| Value::null(block.block.implied_type()));
                    plan_valid(&block.block, &prior_item, config_item, planned_item, &item_path, errs);
                }
            }
            NestingMode::Map => {
                let Value::Map(_, planned_entries) = &planned_value else {
                    errs.push(PathError::new(
                        path,
                        "attribute representing a map of nested blocks must be empty \
                         to indicate no blocks, not null",
                    ));
                    continue;
                };
                let empty = BTreeMap::new();
                let config_entries = match &config_value {
                    Value::Map(_, entries) => entries,
                    _ => &empty,
                };
                if planned_entries.len() != config_entries.len() {
                    errs.push(PathError::new(
                        path,
                        format!(
                            "block count in plan ({}) disagrees with count in config ({})",
                            planned_entries.len(),
                            config_entries.len()
                        ),
                    ));
                    continue;
                }
                for (key, planned_item) in planned_entries {
                    let item_path = path.join_key(key);
                    if !planned_item.is_known() {
                        errs.push(PathError::new(
                            item_path,
                            "element representing nested block must not be unknown itself; \
                             set nested attribute values to unknown instead",
                        ));
                        continue;
                    }
                    let Some(config_item) = config_entries.get(key) else {
                        errs.push(PathError::new(
                            path.clone(),
                            format!("block key {key:?} from plan is not present in config"),
                        ));
                        continue;
                    };
                    let prior_item = match &prior_value {
                        Value::Map(_, entries) => entries.get(key).cloned(),
                        _ => None,
                    }
                    .unwrap_or_else(|| Value::null(block.block.implied_type()));
                    plan_valid(&block.block, &prior_item, config_item, planned_item, &item_path, errs);
                }
                for key in config_entries.keys().filter(|k| !planned_entries.contains_key(*k)) {
                    errs.push(PathError::new(
                        path.clone(),
                        format!("block key {key:?} from config is not present in plan"),
                    ));
                }
            }
        }
    }
}

fn planned_value_error(
    attr: &Attribute,
    prior: &Value,
    config: &Value,
    planned: &Value,
) -> Option<String> {
    if planned.raw_equals(config) {
        return None;
    }
    // The provider kept the prior value as equivalent to the configured one.
    if planned.raw_equals(prior) && !prior.is_null() && !config.is_null() {
        return None;
    }
    if attr.computed && config.is_null() {
        return None;
    }

    let message = match (prior.is_null(), attr.sensitive) {
        (true, true) => String::from("sensitive planned value does not match config value"),
        (true, false) => format!("planned value {planned} does not match config value {config}"),
        (false, true) => String::from(
            "sensitive planned value does not match config value nor prior value",
        ),
        (false, false) => format!(
            "planned value {planned} does not match config value {config} nor prior value {prior}"
        ),
    };
    Some(message)
}

/// Checks that `actual` is compatible with the earlier `planned` value.
#[must_use]
pub fn assert_object_compatible(schema: &Schema, planned: &Value, actual: &Value) -> Vec<PathError> {
    let mut errs = Vec::new();
    object_compatible(schema, planned, actual, &Path::root(), &mut errs);
    errs
}

fn object_compatible(
    schema: &Schema,
    planned: &Value,
    actual: &Value,
    path: &Path,
    errs: &mut Vec<PathError>,
) {
    let at_root = if path.is_root() { "Root resource " } else { "" };
    if planned.is_null() && !actual.is_null() {
        errs.push(PathError::new(path.clone(), format!("{at_root}was absent, but now present")));
        return;
    }
    if actual.is_null() && !planned.is_null() {
        errs.push(PathError::new(path.clone(), format!("{at_root}was present, but now absent")));
        return;
    }
    if planned.is_null() {
        return;
    }

    for (name, attr) in &schema.attributes {
        let null = || Value::null(attr.ty.clone());
        let planned_value = planned.get_attr(name).unwrap_or_else(null);
        let actual_value = actual.get_attr(name).unwrap_or_else(null);
        let attr_path = path.join_attr(name);

        let mut found = Vec::new();
        value_compatible(&planned_value, &actual_value, &attr_path, &mut found);
        if attr.sensitive {
            if !found.is_empty() {
                errs.push(PathError::new(attr_path, SENSITIVE_MISMATCH));
            }
        } else {
            errs.extend(found);
        }
    }

    for (name, block) in &schema.blocks {
        let null = || Value::null(block.implied_type());
        let planned_value = planned.get_attr(name).unwrap_or_else(null);
        let actual_value = actual.get_attr(name).unwrap_or_else(null);
        let path = path.join_attr(name);

        match (block.nesting, &planned_value, &actual_value) {
            (NestingMode::Single, _, _) => {
                object_compatible(&block.block, &planned_value, &actual_value, &path, errs);
            }
            (NestingMode::List, Value::List(_, planned_items), Value::List(_, actual_items)) => {
                if planned_items.len() != actual_items.len() {
                    errs.push(PathError::new(
                        path,
                        format!(
                            "block count changed from {} to {}",
                            planned_items.len(),
                            actual_items.len()
                        ),
                    ));
                    continue;
                }
                for (i, (p, a)) in planned_items.iter().zip(actual_items).enumerate() {
                    object_compatible(&block.block, p, a, &path.join_index(i), errs);
                }
            }
            (NestingMode::Map, Value::Map(_, planned_entries), Value::Map(_, actual_entries)) => {
                if planned_entries.len() != actual_entries.len() {
                    errs.push(PathError::new(
                        path,
                        format!(
                            "block count changed from {} to {}",
                            planned_entries.len(),
                            actual_entries.len()
                        ),
                    ));
                    continue;
                }
                for (key, p) in planned_entries {
                    if let Some(a) = actual_entries.get(key) {
                        object_compatible(&block.block, p, a, &path.join_key(key), errs);
                    }
                }
            }
            // Unknown or null block collections cannot be compared.
            _ => {}
        }
    }
}

fn value_compatible(planned: &Value, actual: &Value, path: &Path, errs: &mut Vec<PathError>) {
    let planned_ty = planned.ty();
    if planned_ty == Type::Dynamic {
        return;
    }
    if let Some(problem) = actual.ty().conformance_errors(&planned_ty).into_iter().next() {
        errs.push(PathError::new(
            path.clone(),
            format!("wrong final value type: {problem}"),
        ));
        return;
    }
    if !planned.is_known() {
        return;
    }

    match (planned, actual) {
        (Value::Null(_), Value::Null(_)) => {}
        (planned, Value::Null(_)) => {
            errs.push(PathError::new(path.clone(), format!("was {planned}, but now null")));
        }
        (Value::Null(_), actual) => {
            errs.push(PathError::new(path.clone(), format!("was null, but now {actual}")));
        }
        (_, Value::Unknown(_)) => {
            errs.push(PathError::new(path.clone(), "was known, but now unknown"));
        }
        (Value::List(_, planned_items), Value::List(_, actual_items)) => {
            for (i, planned_item) in planned_items.iter().enumerate() {
                match actual_items.get(i) {
                    Some(actual_item) => {
                        value_compatible(planned_item, actual_item, &path.join_index(i), errs);
                    }
                    None => errs.push(PathError::new(
                        path.clone(),
                        format!("element {i} has vanished"),
                    )),
                }
            }
            for i in planned_items.len()..actual_items.len() {
                errs.push(PathError::new(
                    path.clone(),
                    format!("new element {i} has appeared"),
                ));
            }
        }
        (Value::Map(_, planned_entries), Value::Map(_, actual_entries)) => {
            for (key, planned_item) in planned_entries {
                match actual_entries.get(key) {
                    Some(actual_item) => {
                        value_compatible(planned_item, actual_item, &path.join_key(key), errs);
                    }
                    None => errs.push(PathError::new(
                        path.clone(),
                        format!("element {key:?} has vanished"),
                    )),
                }
            }
            for key in actual_entries.keys().filter(|k| !planned_entries.contains_key(*k)) {
                errs.push(PathError::new(
                    path.clone(),
                    format!("new element {key:?} has appeared"),
                ));
            }
        }
        (Value::Object(planned_attrs), Value::Object(actual_attrs)) => {
            for (name, planned_attr) in planned_attrs {
                if let Some(actual_attr) = actual_attrs.get(name) {
                    value_compatible(planned_attr, actual_attr, &path.join_attr(name), errs);
                }
            }
        }
        (planned, actual) => {
            if planned.equals(actual) != Some(true) {
                errs.push(PathError::new(
                    path.clone(),
                    format!("was {planned}, but now {actual}"),
                ));
            }
        }
    }
}

/// Replaces the message of every error at or beneath a sensitive location.
#[must_use]
pub fn redact_sensitive(errs: Vec<PathError>, marks: &Marks) -> Vec<PathError> {
    errs.into_iter()
        .map(|err| {
            if marks.covers_sensitive(&err.path) {
                PathError::new(err.path, SENSITIVE_MISMATCH)
            } else {
                err
            }
        })
        .collect()
}
