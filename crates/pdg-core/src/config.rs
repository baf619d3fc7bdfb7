use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type ConfigCallback = Box<dyn FnMut(&ConfigNode) + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    pub value: String,
    pub default: String,
    pub desc: String,
}

/// Host key-value configuration store.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value and fire the key's change callbacks.
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;

    fn describe(&mut self, key: &str, desc: &str) -> Result<(), ConfigError>;

    fn description(&self, key: &str) -> Option<String>;

    fn on_change(&mut self, key: &str, callback: ConfigCallback) -> Result<(), ConfigError>;

    /// While locked, keys that were never registered cannot be created.
    fn lock(&mut self, locked: bool);

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_int(key).map(|v| v != 0)
    }

    fn get_int(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| parse_int(&v))
    }
}

/// Integer view of a config value: boolean words map to 0/1, numbers may be hex.
pub fn parse_int(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => return Some(1),
        "false" | "off" | "no" | "" => return Some(0),
        _ => {}
    }
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[derive(Default)]
pub struct MemoryConfig {
    nodes: IndexMap<String, ConfigNode>,
    callbacks: HashMap<String, Vec<ConfigCallback>>,
    locked: bool,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ConfigNode> {
        self.nodes.values()
    }

    pub fn node(&self, key: &str) -> Option<&ConfigNode> {
        self.nodes.get(key)
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("nodes", &self.nodes)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .field("locked", &self.locked)
            .finish()
    }
}

impl ConfigStore for MemoryConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.nodes.get(key).map(|node| node.value.clone())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if !self.nodes.contains_key(key) {
            if self.locked {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
            self.nodes.insert(
                key.to_string(),
                ConfigNode {
                    name: key.to_string(),
                    value: String::new(),
                    default: value.to_string(),
                    desc: String::new(),
                },
            );
        }

        let node = self
            .nodes
            .get_mut(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        // Numeric and boolean nodes only take values of their own kind.
        if !node.default.is_empty() && parse_int(&node.default).is_some() && parse_int(value).is_none()
        {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        node.value = value.to_string();
        debug!(key, value, "config value set");

        if let Some(callbacks) = self.callbacks.get_mut(key) {
            for callback in callbacks.iter_mut() {
                callback(node);
            }
        }
        Ok(())
    }

    fn describe(&mut self, key: &str, desc: &str) -> Result<(), ConfigError> {
        let node = self
            .nodes
            .get_mut(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        node.desc = desc.to_string();
        Ok(())
    }

    fn description(&self, key: &str) -> Option<String> {
        self.nodes.get(key).map(|node| node.desc.clone())
    }

    fn on_change(&mut self, key: &str, callback: ConfigCallback) -> Result<(), ConfigError> {
        if !self.nodes.contains_key(key) {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }
        self.callbacks
            .entry(key.to_string())
            .or_default()
            .push(callback);
        Ok(())
    }

    fn lock(&mut self, locked: bool) {
        self.locked = locked;
    }
}
