//! Programmatic overrides, typically fed from command-line flags.
//!
//! Each `("log.level", Value)` pair expands into the nested maps needed to
//! merge with the other layers.

use crate::error::ConfigError;
use crate::path;
use crate::provider::Provider;
use crate::value::{Map, Value};

#[derive(Debug, Clone)]
pub struct OverrideProvider {
    delim: String,
    entries: Vec<(String, Value)>,
}

impl Default for OverrideProvider {
    fn default() -> Self {
        OverrideProvider::new()
    }
}

impl OverrideProvider {
    pub fn new() -> Self {
        OverrideProvider {
            delim: ".".into(),
            entries: Vec::new(),
        }
    }

    /// Split keys on `delim` instead of `"."`.
    pub fn with_delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    /// Add an override. Later entries for the same key win.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Add an override only when `value` is present, as with optional flags.
    pub fn set_opt<V: Into<Value>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Provider for OverrideProvider {
    fn read(&self) -> Result<Map, ConfigError> {
        Ok(overrides_to_map(&self.entries, &self.delim))
    }
}

/// `("database.url", "pg://")` becomes `{database: {url: "pg://"}}`.
pub fn overrides_to_map(entries: &[(String, Value)], delim: &str) -> Map {
    let mut tree = Map::new();
    for (key, value) in entries {
        path::insert(&mut tree, key, delim, value.clone());
    }
    tree
}
