//! `ignore_changes` handling.
//!
//! Ignored locations of the configuration are reverted to their prior values
//! before the provider sees the configuration. A path ending in a textual map
//! key ignores only that key of the map: the key keeps its prior value, or
//! stays absent if the prior map did not have it.

use std::collections::BTreeMap;
use tracing::trace;

use crate::value::{Path, Type, Value};

/// Which parts of the configuration to ignore once an object exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreSpec {
    /// Ignore changes at these paths.
    Paths(Vec<Path>),
    /// Freeze the whole object.
    All,
}

impl Default for IgnoreSpec {
    fn default() -> Self {
        Self::Paths(Vec::new())
    }
}

impl IgnoreSpec {
    /// Returns true if nothing is ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Paths(paths) => paths.is_empty(),
            Self::All => false,
        }
    }
}

#[derive(Debug)]
struct Override {
    /// Path of the ignored value, without a trailing map key.
    path: Path,
    /// Prior value at `path`.
    prior: Value,
    /// Map key, when only one key of the map is ignored.
    key: Option<String>,
}

/// Reverts the ignored parts of `config` to `prior`.
///
/// Nothing is ignored while there is no prior object.
#[must_use]
pub fn filter_ignored(prior: &Value, config: &Value, spec: &IgnoreSpec) -> Value {
    if prior.is_null() || spec.is_empty() {
        return config.clone();
    }
    let paths = match spec {
        IgnoreSpec::All => return prior.clone(),
        IgnoreSpec::Paths(paths) => paths,
    };
    if config.is_null() {
        return config.clone();
    }

    let overrides = collect_overrides(prior, config, paths);
    if overrides.is_empty() {
        return config.clone();
    }

    config.map_paths(&Path::root(), &mut |path, value| {
        apply_overrides(&overrides, path, value)
    })
}

fn collect_overrides(prior: &Value, config: &Value, paths: &[Path]) -> Vec<Override> {
    let mut overrides = Vec::new();

    for ignored in paths {
        let (path, key) = match ignored.split_map_key() {
            Some((map_path, key)) => (map_path, Some(key)),
            None => (ignored.clone(), None),
        };

        // Paths that no longer resolve on either side have nothing to revert.
        let Ok(prior_value) = prior.get_path(&path) else {
            trace!("Ignored path {ignored} does not exist in prior value");
            continue;
        };
        let Ok(config_value) = config.get_path(&path) else {
            trace!("Ignored path {ignored} does not exist in configuration");
            continue;
        };

        // Maps are compared whole even when one key is ignored; applying the
        // override only touches that key.
        if prior_value.equals(&config_value) != Some(true) {
            overrides.push(Override {
                path,
                prior: prior_value,
                key,
            });
        }
    }

    overrides
}

fn apply_overrides(overrides: &[Override], path: &Path, value: &Value) -> Option<Value> {
    let Type::Map(elem) = value.ty() else {
        return overrides
            .iter()
            .find(|o| o.path == *path)
            .map(|o| o.prior.clone());
    };

    let matching: Vec<&Override> = overrides.iter().filter(|o| o.path == *path).collect();
    if matching.is_empty() {
        return None;
    }
    if !value.is_known() {
        return Some(value.clone());
    }

    let mut entries = match value {
        Value::Map(_, entries) => entries.clone(),
        _ => BTreeMap::new(),
    };

    for o in matching {
        let Some(key) = &o.key else {
            return Some(o.prior.clone());
        };
        match &o.prior {
            Value::Map(_, prior_entries) if prior_entries.contains_key(key) => {
                entries.insert(key.clone(), prior_entries[key].clone());
            }
            _ => {
                entries.remove(key);
            }
        }
    }

    Some(Value::Map(*elem, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Value {
        Value::map(
            Type::String,
            pairs.iter().map(|(k, v)| (*k, Value::string(*v))),
        )
    }

    fn object(name: &str, tag_pairs: &[(&str, &str)]) -> Value {
        Value::object([("name", Value::string(name)), ("tags", tags(tag_pairs))])
    }

    fn paths(input: &[&str]) -> IgnoreSpec {
        IgnoreSpec::Paths(input.iter().map(|p| p.parse().unwrap()).collect())
    }

    #[test]
    fn test_no_prior_returns_config() {
        let config = object("a", &[]);
        let prior = Value::null(config.ty());
        assert_eq!(filter_ignored(&prior, &config, &IgnoreSpec::All), config);
    }

    #[test]
    fn test_empty_spec_returns_config() {
        let prior = object("a", &[]);
        let config = object("b", &[]);
        assert_eq!(filter_ignored(&prior, &config, &IgnoreSpec::default()), config);
        assert_eq!(filter_ignored(&prior, &config, &paths(&[])), config);
    }

    #[test]
    fn test_ignore_all_returns_prior() {
        let prior = object("a", &[("x", "1")]);
        let config = object("b", &[]);
        assert_eq!(filter_ignored(&prior, &config, &IgnoreSpec::All), prior);
    }

    #[test]
    fn test_equal_path_is_noop() {
        let prior = object("a", &[("x", "1")]);
        let config = object("a", &[("x", "2")]);
        assert_eq!(filter_ignored(&prior, &config, &paths(&["name"])), config);
    }

    #[test]
    fn test_changed_path_takes_prior() {
        let prior = object("a", &[("x", "1")]);
        let config = object("b", &[("x", "2")]);
        let filtered = filter_ignored(&prior, &config, &paths(&["name"]));
        assert_eq!(filtered, object("a", &[("x", "2")]));
    }

    #[test]
    fn test_whole_map_takes_prior() {
        let prior = object("a", &[("a", "1")]);
        let config = object("a", &[("a", "2"), ("b", "3")]);
        let filtered = filter_ignored(&prior, &config, &paths(&["tags"]));
        assert_eq!(filtered, prior);
    }

    #[test]
    fn test_map_key_reverted_other_keys_kept() {
        let prior = object("a", &[("a", "1")]);
        let config = object("a", &[("a", "2"), ("b", "3")]);
        let filtered = filter_ignored(&prior, &config, &paths(&[r#"tags["a"]"#]));
        assert_eq!(filtered, object("a", &[("a", "1"), ("b", "3")]));
    }

    #[test]
    fn test_map_key_absent_from_prior_is_removed() {
        let prior = object("a", &[("a", "1")]);
        let config = object("a", &[("a", "1"), ("b", "3")]);
        let filtered = filter_ignored(&prior, &config, &paths(&[r#"tags["b"]"#]));
        assert_eq!(filtered, object("a", &[("a", "1")]));
    }

    #[test]
    fn test_map_key_restored_when_removed_from_config() {
        let prior = object("a", &[("a", "1"), ("keep", "me")]);
        let config = object("a", &[("a", "1")]);
        let filtered = filter_ignored(&prior, &config, &paths(&[r#"tags["keep"]"#]));
        assert_eq!(filtered, prior);
    }

    #[test]
    fn test_unknown_config_is_overridden() {
        let prior = object("a", &[]);
        let config = Value::object([
            ("name", Value::unknown(Type::String)),
            ("tags", tags(&[])),
        ]);
        let filtered = filter_ignored(&prior, &config, &paths(&["name"]));
        assert_eq!(filtered.get_attr("name"), Some(Value::string("a")));
    }

    #[test]
    fn test_unknown_map_left_as_is() {
        let prior = object("a", &[("a", "1")]);
        let config = Value::object([
            ("name", Value::string("a")),
            ("tags", Value::unknown(Type::map(Type::String))),
        ]);
        let filtered = filter_ignored(&prior, &config, &paths(&[r#"tags["a"]"#]));
        assert_eq!(filtered, config);
    }

    #[test]
    fn test_unresolvable_path_is_skipped() {
        let prior = Value::object([(
            "disks",
            Value::list(Type::Number, vec![Value::number(1)]),
        )]);
        let config = Value::object([(
            "disks",
            Value::list(Type::Number, vec![Value::number(1), Value::number(2)]),
        )]);
        let filtered = filter_ignored(&prior, &config, &paths(&["disks[1]"]));
        assert_eq!(filtered, config);
    }
}
