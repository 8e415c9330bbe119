//! Addresses of resource instances, providers and object generations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Key distinguishing instances of a repeated resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstanceKey {
    /// `count` style index.
    Int(u64),
    /// `for_each` style key.
    String(String),
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "[{i}]"),
            Self::String(s) => write!(f, "[{s:?}]"),
        }
    }
}

/// Absolute address of one resource instance.
///
/// Rendered as `module.net.acme_instance.web["blue"]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceInstanceAddr {
    /// Module path from the root module.
    pub module: Vec<String>,
    /// Resource type name.
    pub resource_type: String,
    /// Resource name.
    pub name: String,
    /// Instance key, if the resource is repeated.
    pub key: Option<InstanceKey>,
}

impl ResourceInstanceAddr {
    /// Creates an address in the root module without an instance key.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: Vec::new(),
            resource_type: resource_type.into(),
            name: name.into(),
            key: None,
        }
    }

    /// Sets the instance key.
    #[must_use]
    pub fn with_key(mut self, key: InstanceKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Places the instance inside a module.
    #[must_use]
    pub fn in_module(mut self, module: Vec<String>) -> Self {
        self.module = module;
        self
    }
}

impl fmt::Display for ResourceInstanceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for module in &self.module {
            write!(f, "module.{module}.")?;
        }
        write!(f, "{}.{}", self.resource_type, self.name)?;
        if let Some(key) = &self.key {
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourceInstanceAddr {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            ConfigError::validation(format!("invalid resource address {input:?}: {reason}"), "addr")
        };

        let (body, key) = match input.find('[') {
            Some(open) => {
                let raw = input[open..]
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(|| invalid("unterminated instance key"))?;
                let key = if let Some(quoted) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
                    InstanceKey::String(quoted.to_string())
                } else {
                    InstanceKey::Int(raw.parse().map_err(|_| invalid("instance key must be a number or a quoted string"))?)
                };
                (&input[..open], Some(key))
            }
            None => (input, None),
        };

        let parts: Vec<&str> = body.split('.').collect();
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("expected TYPE.NAME"));
        }

        let (module_parts, resource_parts) = parts.split_at(parts.len() - 2);
        if module_parts.len() % 2 != 0 {
            return Err(invalid("module path must be a sequence of module.NAME"));
        }
        let mut module = Vec::new();
        for pair in module_parts.chunks(2) {
            if pair[0] != "module" {
                return Err(invalid("module path must be a sequence of module.NAME"));
            }
            module.push(pair[1].to_string());
        }

        Ok(Self {
            module,
            resource_type: resource_parts[0].to_string(),
            name: resource_parts[1].to_string(),
            key,
        })
    }
}

impl TryFrom<String> for ResourceInstanceAddr {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceInstanceAddr> for String {
    fn from(addr: ResourceInstanceAddr) -> Self {
        addr.to_string()
    }
}

/// Address of the provider configuration managing an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderAddr {
    /// Source address, for example `registry.example.com/acme/cloud`.
    pub source: String,
    /// Alias of a non-default provider configuration.
    #[serde(default)]
    pub alias: Option<String>,
}

impl ProviderAddr {
    /// Creates a default (unaliased) provider address.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: None,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The provider type: the last segment of the source address.
    #[must_use]
    pub fn provider_type(&self) -> &str {
        self.source.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for ProviderAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider[{:?}]", self.source)?;
        if let Some(alias) = &self.alias {
            write!(f, ".{alias}")?;
        }
        Ok(())
    }
}

/// Key of a deposed object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeposedKey(String);

impl DeposedKey {
    /// Wraps an existing key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generates a fresh random key of eight hex characters.
    #[must_use]
    pub fn generate() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self(id[..8].to_string())
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeposedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which object of an instance a change or hook call concerns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// The current object.
    Current,
    /// A deposed object awaiting destruction.
    Deposed(DeposedKey),
}

impl Generation {
    /// The generation for an optional deposed key.
    #[must_use]
    pub fn from_deposed(key: Option<&DeposedKey>) -> Self {
        key.map_or(Self::Current, |k| Self::Deposed(k.clone()))
    }

    /// The deposed key, if any.
    #[must_use]
    pub const fn deposed_key(&self) -> Option<&DeposedKey> {
        match self {
            Self::Current => None,
            Self::Deposed(key) => Some(key),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Deposed(key) => write!(f, "deposed object {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_round_trip() {
        for input in [
            "acme_instance.web",
            "acme_instance.web[0]",
            r#"module.net.module.edge.acme_instance.web["blue"]"#,
        ] {
            let addr: ResourceInstanceAddr = input.parse().unwrap();
            assert_eq!(addr.to_string(), input);
        }
    }

    #[test]
    fn test_addr_parts() {
        let addr: ResourceInstanceAddr = r#"module.net.acme_instance.web["blue"]"#.parse().unwrap();
        assert_eq!(addr.module, vec![String::from("net")]);
        assert_eq!(addr.resource_type, "acme_instance");
        assert_eq!(addr.name, "web");
        assert_eq!(addr.key, Some(InstanceKey::String(String::from("blue"))));
    }

    #[test]
    fn test_addr_rejects_malformed() {
        assert!("web".parse::<ResourceInstanceAddr>().is_err());
        assert!("mod.net.acme_instance.web".parse::<ResourceInstanceAddr>().is_err());
        assert!("acme_instance.web[x]".parse::<ResourceInstanceAddr>().is_err());
    }

    #[test]
    fn test_provider_type() {
        let addr = ProviderAddr::new("registry.example.com/acme/cloud").with_alias("west");
        assert_eq!(addr.provider_type(), "cloud");
        assert_eq!(addr.to_string(), "provider[\"registry.example.com/acme/cloud\"].west");
        assert_eq!(ProviderAddr::new("").provider_type(), "");
    }

    #[test]
    fn test_deposed_key_generation() {
        let key = DeposedKey::generate();
        assert_eq!(key.as_str().len(), 8);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, DeposedKey::generate());
    }

    #[test]
    fn test_generation() {
        let key = DeposedKey::new("00ab12cd");
        assert_eq!(Generation::from_deposed(None), Generation::Current);
        assert_eq!(
            Generation::from_deposed(Some(&key)).deposed_key(),
            Some(&key)
        );
    }
}
