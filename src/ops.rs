//! Read-only config operations: key lookup, listing, and result types.
//!
//! Provides the logic behind `config list` and `config get`, and the
//! `ConfigResult` enum that callers use to display results.

use std::fmt;

use crate::config::Config;
use crate::error::ConfigError;
use crate::flatten::flatten;
use crate::path;
use crate::types::ConfigAction;
use crate::value::{Map, Value};

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A key's resolved value.
    KeyValue { key: String, value: String },
    /// Every resolved leaf as key-value pairs.
    Listing { entries: Vec<(String, String)> },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::KeyValue { key, value } => write!(f, "{key} = {value}"),
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
        }
    }
}

impl Config {
    /// Run a framework-agnostic [`ConfigAction`] against this configuration.
    pub fn handle(&self, action: &ConfigAction) -> Result<ConfigResult, ConfigError> {
        self.with_state(|tree, delim| match action {
            ConfigAction::List => Ok(list_values(tree, delim)),
            ConfigAction::Get { key } => get_value(tree, key, delim),
        })
    }
}

/// Look up `key` in `tree`. A map-valued key is shown as JSON.
pub fn get_value(tree: &Map, key: &str, delim: &str) -> Result<ConfigResult, ConfigError> {
    let value = path::find(tree, key, delim).ok_or_else(|| ConfigError::KeyNotFound(key.into()))?;
    Ok(ConfigResult::KeyValue {
        key: key.into(),
        value: format_value(value),
    })
}

/// List every leaf of `tree` as delimited key-value pairs.
pub fn list_values(tree: &Map, delim: &str) -> ConfigResult {
    let entries = flatten(tree, delim)
        .into_iter()
        .map(|(key, value)| (key, format_value(value)))
        .collect();
    ConfigResult::Listing { entries }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "<not set>".to_string(),
        other => other.to_string(),
    }
}
