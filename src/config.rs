//! The configuration state and its accessors.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;

use crate::cast::{self, CastError};
use crate::decode;
use crate::error::ConfigError;
use crate::file::FileProvider;
use crate::flatten::flatten;
use crate::merge::merge;
use crate::path;
use crate::plugin::Plugin;
use crate::provider::{Provider, WatchGuard};
use crate::value::{Map, Value};

pub const DEFAULT_KEY_DELIM: &str = ".";

#[derive(Debug)]
struct State {
    tree: Map,
    key_delim: String,
}

impl State {
    fn find(&self, key: &str) -> Option<&Value> {
        path::find(&self.tree, key, &self.key_delim)
    }

    /// The subtree at `key`; the whole tree for an empty key.
    fn subtree(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            Some(Value::Map(self.tree.clone()))
        } else {
            self.find(key).cloned()
        }
    }
}

/// A merged configuration tree.
///
/// Sources are merged in load order, later ones overriding earlier ones key
/// by key. Reads and merges may happen from any thread; share a `Config`
/// through an `Arc` when it is also being watched.
///
/// Two families of accessors exist. `get_*` never fails and yields the
/// type's zero value when the key is absent or does not convert; `try_get_*`
/// reports [`ConfigError::KeyNotFound`] or [`ConfigError::InvalidValue`]
/// instead. Use `get` when absence has to be told apart from a zero value.
#[derive(Debug)]
pub struct Config {
    state: RwLock<State>,
    plugins: RwLock<Vec<Arc<Plugin>>>,
    // Also serializes loads, so the duplicate check and merge are atomic.
    loaded: Mutex<HashSet<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Config::from_tree(Map::new())
    }

    /// A configuration seeded with `tree`.
    pub fn from_tree(tree: Map) -> Self {
        Config {
            state: RwLock::new(State {
                tree,
                key_delim: DEFAULT_KEY_DELIM.to_string(),
            }),
            plugins: RwLock::new(Vec::new()),
            loaded: Mutex::new(HashSet::new()),
        }
    }

    // -- mutation ---------------------------------------------------------

    /// Read `provider` and merge its tree over the current one.
    ///
    /// A provider whose [`source_id`](Provider::source_id) was already loaded
    /// successfully is skipped. On error the tree is left untouched and the
    /// source is not recorded, so a later retry goes through.
    pub fn load(&self, provider: &dyn Provider) -> Result<(), ConfigError> {
        let mut loaded = self.loaded.lock();
        let id = provider.source_id();
        if let Some(id) = &id
            && loaded.contains(id)
        {
            tracing::debug!(source = %id, "config source already loaded, skipping");
            return Ok(());
        }

        let tree = provider.read()?;
        let due = self.merge_tree(tree);
        if let Some(id) = id {
            tracing::debug!(source = %id, "config source loaded");
            loaded.insert(id);
        }
        drop(loaded);

        fire(&due);
        Ok(())
    }

    /// Load a TOML, YAML or JSON file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.load(&FileProvider::new(path.as_ref()))
    }

    /// Re-merge `provider`'s tree every time it reports a change.
    ///
    /// Reloads stop when the returned guard or the last `Arc` to this config
    /// is dropped. Returns `Ok(None)` for providers that cannot be watched.
    pub fn watch(
        self: &Arc<Self>,
        provider: &dyn Provider,
    ) -> Result<Option<WatchGuard>, ConfigError> {
        let config: Weak<Config> = Arc::downgrade(self);
        provider.watch(Box::new(move |tree: Map| {
            if let Some(config) = config.upgrade() {
                config.reload(tree);
            }
        }))
    }

    /// Load a file, then keep re-merging it as it changes.
    pub fn load_and_watch_file(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
    ) -> Result<Option<WatchGuard>, ConfigError> {
        let provider = FileProvider::new(path.as_ref());
        self.load(&provider)?;
        self.watch(&provider)
    }

    fn reload(&self, tree: Map) {
        let guard = self.loaded.lock();
        let due = self.merge_tree(tree);
        drop(guard);
        fire(&due);
    }

    /// Merge under the write lock and return the plugins that should fire.
    fn merge_tree(&self, tree: Map) -> Vec<Arc<Plugin>> {
        let plugins: Vec<Arc<Plugin>> = self.plugins.read().clone();
        let mut state = self.state.write();

        let before: Vec<Option<Vec<Option<Value>>>> = plugins
            .iter()
            .map(|plugin| {
                (!plugin.watches_all()).then(|| {
                    plugin
                        .keys()
                        .iter()
                        .map(|k| state.find(k).cloned())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        merge(&mut state.tree, tree);

        plugins
            .into_iter()
            .zip(before)
            .filter(|(plugin, before)| match before {
                None => true,
                Some(values) => plugin
                    .keys()
                    .iter()
                    .zip(values)
                    .any(|(key, old)| state.find(key) != old.as_ref()),
            })
            .map(|(plugin, _)| plugin)
            .collect()
    }

    /// Register a plugin to run after future changes.
    pub fn register_plugin(&self, plugin: Plugin) {
        self.plugins.write().push(Arc::new(plugin));
    }

    /// Change the path delimiter used by every accessor.
    ///
    /// An empty delimiter turns off splitting; each key is looked up at the
    /// top level as written.
    pub fn set_key_delim(&self, delim: impl Into<String>) {
        self.state.write().key_delim = delim.into();
    }

    pub fn key_delim(&self) -> String {
        self.state.read().key_delim.clone()
    }

    /// Return to a freshly constructed state: empty tree, default delimiter,
    /// no plugins, no loaded sources.
    pub fn reset(&self) {
        let mut loaded = self.loaded.lock();
        {
            let mut state = self.state.write();
            state.tree.clear();
            state.key_delim = DEFAULT_KEY_DELIM.to_string();
        }
        self.plugins.write().clear();
        loaded.clear();
    }

    /// A detached configuration holding a copy of the subtree at `key`.
    ///
    /// Later changes to either side are not visible in the other. A missing
    /// or non-map key gives an empty configuration.
    pub fn sub(&self, key: &str) -> Config {
        let state = self.state.read();
        let tree = state.find(key).and_then(Value::as_map).cloned().unwrap_or_default();
        let sub = Config::from_tree(tree);
        sub.state.write().key_delim = state.key_delim.clone();
        sub
    }

    // -- inspection -------------------------------------------------------

    /// The raw value at `key`, or `None` when absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().find(key).cloned()
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.state.read().find(key).is_some()
    }

    /// Every leaf key, joined with the current delimiter, in sorted order.
    pub fn all_keys(&self) -> Vec<String> {
        let state = self.state.read();
        flatten(&state.tree, &state.key_delim)
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    /// A copy of the whole tree.
    pub fn snapshot(&self) -> Map {
        self.state.read().tree.clone()
    }

    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&Map, &str) -> T) -> T {
        let state = self.state.read();
        f(&state.tree, &state.key_delim)
    }

    // -- strict accessors -------------------------------------------------

    fn cast_at<T>(
        &self,
        key: &str,
        cast: impl FnOnce(&Value) -> Result<T, CastError>,
    ) -> Result<T, ConfigError> {
        let state = self.state.read();
        let value = state
            .find(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        cast(value).map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn try_get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.cast_at(key, cast::to_string)
    }

    pub fn try_get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        self.cast_at(key, cast::to_bool)
    }

    pub fn try_get_int(&self, key: &str) -> Result<i32, ConfigError> {
        self.cast_at(key, cast::to_i32)
    }

    pub fn try_get_int64(&self, key: &str) -> Result<i64, ConfigError> {
        self.cast_at(key, cast::to_i64)
    }

    pub fn try_get_float64(&self, key: &str) -> Result<f64, ConfigError> {
        self.cast_at(key, cast::to_f64)
    }

    pub fn try_get_time(&self, key: &str) -> Result<DateTime<FixedOffset>, ConfigError> {
        self.cast_at(key, cast::to_time)
    }

    pub fn try_get_duration(&self, key: &str) -> Result<Duration, ConfigError> {
        self.cast_at(key, cast::to_duration)
    }

    pub fn try_get_string_slice(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        self.cast_at(key, cast::to_string_vec)
    }

    pub fn try_get_slice(&self, key: &str) -> Result<Vec<Value>, ConfigError> {
        self.cast_at(key, cast::to_vec)
    }

    pub fn try_get_string_map(&self, key: &str) -> Result<Map, ConfigError> {
        self.cast_at(key, cast::to_map)
    }

    pub fn try_get_string_map_string(
        &self,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ConfigError> {
        self.cast_at(key, cast::to_string_map)
    }

    pub fn try_get_string_map_string_slice(
        &self,
        key: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
        self.cast_at(key, cast::to_string_vec_map)
    }

    // -- lenient accessors ------------------------------------------------

    pub fn get_string(&self, key: &str) -> String {
        self.try_get_string(key).unwrap_or_default()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.try_get_bool(key).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i32 {
        self.try_get_int(key).unwrap_or_default()
    }

    pub fn get_int64(&self, key: &str) -> i64 {
        self.try_get_int64(key).unwrap_or_default()
    }

    pub fn get_float64(&self, key: &str) -> f64 {
        self.try_get_float64(key).unwrap_or_default()
    }

    /// Falls back to the Unix epoch.
    pub fn get_time(&self, key: &str) -> DateTime<FixedOffset> {
        self.try_get_time(key).unwrap_or_default()
    }

    pub fn get_duration(&self, key: &str) -> Duration {
        self.try_get_duration(key).unwrap_or_default()
    }

    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.try_get_string_slice(key).unwrap_or_default()
    }

    pub fn get_slice(&self, key: &str) -> Vec<Value> {
        self.try_get_slice(key).unwrap_or_default()
    }

    pub fn get_string_map(&self, key: &str) -> Map {
        self.try_get_string_map(key).unwrap_or_default()
    }

    pub fn get_string_map_string(&self, key: &str) -> BTreeMap<String, String> {
        self.try_get_string_map_string(key).unwrap_or_default()
    }

    pub fn get_string_map_string_slice(&self, key: &str) -> BTreeMap<String, Vec<String>> {
        self.try_get_string_map_string_slice(key).unwrap_or_default()
    }

    // -- structured decoding ----------------------------------------------

    /// Bind the subtree at `key` (the whole tree for `""`) into `T`.
    ///
    /// Struct fields match keys case-insensitively and `Duration` fields
    /// accept strings like `"2s"`. An absent subtree decodes as an empty map.
    /// Keys the target does not consume are ignored.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let (out, ignored) = self.decode_at::<T>(key)?;
        if !ignored.is_empty() {
            tracing::debug!(key, ignored = ?ignored, "keys not consumed by unmarshal target");
        }
        Ok(out)
    }

    /// Like [`unmarshal_key`](Self::unmarshal_key), but keys the target does
    /// not consume are an error.
    pub fn unmarshal_key_strict<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let (out, ignored) = self.decode_at::<T>(key)?;
        if !ignored.is_empty() {
            return Err(ConfigError::UnknownKeys {
                key: key.to_string(),
                unknown: ignored,
            });
        }
        Ok(out)
    }

    /// Bind the subtree at `key` into a confique config, letting confique
    /// fill `#[config(default)]` values and reject missing required fields.
    pub fn unmarshal_config<C>(&self, key: &str) -> Result<C, ConfigError>
    where
        C: confique::Config,
        C::Layer: DeserializeOwned,
    {
        let layer: C::Layer = self.unmarshal_key(key)?;
        Ok(C::builder().preloaded(layer).load()?)
    }

    fn decode_at<T: DeserializeOwned>(&self, key: &str) -> Result<(T, Vec<String>), ConfigError> {
        let subtree = self.state.read().subtree(key);
        decode::from_optional_tracking_ignored(subtree.as_ref()).map_err(|source| {
            ConfigError::Decode {
                key: key.to_string(),
                source,
            }
        })
    }
}

fn fire(plugins: &[Arc<Plugin>]) {
    for plugin in plugins {
        plugin.fire();
    }
}
