//! The seam between a [`Config`](crate::Config) and wherever trees come from.

use std::fmt;

use crate::error::ConfigError;
use crate::value::Map;

/// Callback handed to [`Provider::watch`]; receives the freshly read tree.
pub type OnChange = Box<dyn Fn(Map) + Send + Sync + 'static>;

/// Keeps a watch alive. Dropping the guard stops change notifications.
pub struct WatchGuard {
    _handle: Box<dyn Send>,
}

impl WatchGuard {
    pub fn new(handle: impl Send + 'static) -> Self {
        WatchGuard {
            _handle: Box::new(handle),
        }
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard").finish_non_exhaustive()
    }
}

/// A source of configuration trees.
///
/// `read` is a one-shot load of a complete tree. Errors are handed back to
/// the caller of [`Config::load`](crate::Config::load) unchanged; nothing
/// retries.
pub trait Provider: Send + Sync {
    fn read(&self) -> Result<Map, ConfigError>;

    /// Identity used to suppress loading the same source twice. Sources
    /// returning `None` are merged on every load.
    fn source_id(&self) -> Option<String> {
        None
    }

    /// Start delivering new trees to `on_change` whenever the source changes.
    /// Sources that cannot be watched return `Ok(None)`.
    fn watch(&self, on_change: OnChange) -> Result<Option<WatchGuard>, ConfigError> {
        drop(on_change);
        Ok(None)
    }
}

/// A fixed, already-decoded tree. Handy for defaults and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    tree: Map,
    id: Option<String>,
}

impl StaticProvider {
    pub fn new(tree: Map) -> Self {
        StaticProvider { tree, id: None }
    }

    /// Give the tree an identity so loading it a second time is a no-op.
    pub fn named(id: impl Into<String>, tree: Map) -> Self {
        StaticProvider {
            tree,
            id: Some(id.into()),
        }
    }
}

impl Provider for StaticProvider {
    fn read(&self) -> Result<Map, ConfigError> {
        Ok(self.tree.clone())
    }

    fn source_id(&self) -> Option<String> {
        self.id.clone()
    }
}
