//! Layered runtime configuration with path lookup, lenient typed access, and
//! live reload.
//!
//! Treefig keeps one merged tree of configuration values. Sources (files,
//! environment variables, programmatic overrides, anything implementing
//! [`Provider`]) are read into trees and deep-merged over it in load order.
//! Values are then reached by delimited paths and converted on the way out.
//!
//! ```ignore
//! let config = Arc::new(Config::new());
//! config.load_file("/etc/myapp/app.toml")?;
//! config.load(&EnvProvider::new("MYAPP"))?;
//!
//! let port = config.get_int("server.http.port");
//! let timeout = config.get_duration("app.registry.etcd.timeout");
//! let log: LogConfig = config.unmarshal_key("log")?;
//! ```
//!
//! # The tree
//!
//! Every source decodes into the same [`Value`] model: null, bool, 64-bit
//! integer, float, string, sequence, and string-keyed map. TOML, YAML and
//! JSON files therefore merge freely with each other and with environment
//! variables.
//!
//! # Merging
//!
//! A later source wins key by key. Where both sides hold a map the maps are
//! merged recursively; anywhere else the later value replaces the earlier
//! one outright, sequences included. Every layer is sparse: a file only
//! needs the keys it changes.
//!
//! ```text
//! Config files          loaded first, in search-path order
//!        ↑ overridden by
//! Environment vars      PREFIX__KEY
//!        ↑ overridden by
//! Overrides             OverrideProvider
//! ```
//!
//! The order is whatever order you call [`Config::load`] in; the diagram
//! is the usual arrangement.
//!
//! # Paths
//!
//! `"server.http.port"` is split on the key delimiter (`.` by default, see
//! [`Config::set_key_delim`]) and walked one map at a time. A missing
//! segment, or a segment that lands on a non-map value, resolves to nothing.
//!
//! # Two ways to read
//!
//! - **Lenient**: `get_string`, `get_int`, `get_duration` and friends never
//!   fail. A missing key or a value that does not convert yields the type's
//!   zero value (`""`, `0`, `false`, empty collections, the Unix epoch).
//!   Conversions are forgiving: `"8080"` is an integer, `1` is `true`,
//!   `"1h30m"` is a duration.
//! - **Strict**: `try_get_*` returns [`ConfigError::KeyNotFound`] or
//!   [`ConfigError::InvalidValue`] instead, and [`Config::unmarshal_key`]
//!   binds a whole subtree into any `Deserialize` type, reporting mismatches
//!   with the path of the offending key. Struct fields match keys
//!   case-insensitively and `Duration` fields accept strings like `"2s"`.
//!
//! [`Config::unmarshal_key_strict`] also rejects keys the target does not
//! consume, and [`Config::unmarshal_config`] hands the subtree to a
//! [confique](https://docs.rs/confique) struct so `#[config(default)]`
//! values fill in whatever the tree leaves out.
//!
//! # Sources
//!
//! - [`FileProvider`]: one file, format taken from the extension
//!   (`.toml`, `.yaml`/`.yml`, `.json`). [`FileProvider::search`] looks for
//!   `{stem}.{ext}` across [`SearchPath`]s.
//! - [`EnvProvider`]: `MYAPP__LOG__DIR=/var/log` becomes `log.dir`. `__`
//!   separates levels, segments are lowercased, and values are typed
//!   heuristically (bool, integer, float, string).
//! - [`OverrideProvider`]: explicit `(key, value)` pairs, e.g. from CLI flags.
//! - [`StaticProvider`]: a fixed tree, for defaults and tests.
//!
//! A source with an identity (files use their canonical path) is merged at
//! most once; loading it again is a logged no-op until [`Config::reset`].
//!
//! # Watching and plugins
//!
//! With the `watch` feature (on by default), [`Config::watch`] re-reads a
//! provider whenever it changes and merges the new tree in. [`Plugin`]s
//! registered with [`Config::register_plugin`] run after a change: wildcard
//! plugins after every load, keyed plugins only when a value they watch
//! differs. Plugin failures are logged, never propagated.
//!
//! # Sub-configurations
//!
//! [`Config::sub`] copies a subtree into a new, independent [`Config`].
//! Handing a component only its own section keeps it from reaching into the
//! rest; changes on either side stay on that side.
//!
//! # Clap adapter
//!
//! Behind the `clap` feature (on by default), [`ConfigArgs`] gives an
//! application `config list|get` subcommands. It converts into a
//! framework-agnostic [`ConfigAction`] that [`Config::handle`] runs.
//!
//! # Logging
//!
//! Treefig emits `tracing` events (loads, skipped duplicates, reloads,
//! plugin failures) and installs no subscriber; that is the application's
//! call.

pub mod cast;
pub mod decode;
pub mod error;
pub mod types;
pub mod value;

#[cfg(feature = "clap")]
mod cli;
mod config;
mod env;
mod file;
mod flatten;
mod merge;
mod ops;
mod overrides;
mod path;
mod plugin;
mod provider;

#[cfg(test)]
mod fixtures;

use std::sync::{Arc, OnceLock};

#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
pub use config::{Config, DEFAULT_KEY_DELIM};
pub use decode::DecodeError;
pub use env::EnvProvider;
pub use error::ConfigError;
pub use file::{FileProvider, Format};
pub use merge::merge;
pub use ops::ConfigResult;
pub use overrides::OverrideProvider;
pub use plugin::{Plugin, PluginError};
pub use provider::{OnChange, Provider, StaticProvider, WatchGuard};
pub use types::{ConfigAction, SearchPath};
pub use value::{Map, Value};

/// A process-wide configuration, created empty on first use.
///
/// Meant for an application's entry point. Nothing inside this crate reads
/// it; libraries should take a `&Config` or `Arc<Config>` instead.
pub fn global() -> Arc<Config> {
    static GLOBAL: OnceLock<Arc<Config>> = OnceLock::new();
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(Config::new())))
}
