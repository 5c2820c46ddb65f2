use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Error type plugin handlers may return.
pub type PluginError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Box<dyn Fn() -> Result<(), PluginError> + Send + Sync>;

const WILDCARD: &str = "*";

/// A callback run after the configuration changes.
///
/// A plugin watches a set of delimited keys, or every key via `"*"`. Keyed
/// plugins only run when the value under one of their keys differs after a
/// load; wildcard plugins run after every load. Handler errors and panics are
/// logged and never reach the code that triggered the load.
pub struct Plugin {
    keys: Vec<String>,
    handler: Handler,
}

impl Plugin {
    pub fn new<K, F>(keys: impl IntoIterator<Item = K>, handler: F) -> Self
    where
        K: Into<String>,
        F: Fn() -> Result<(), PluginError> + Send + Sync + 'static,
    {
        Plugin {
            keys: keys.into_iter().map(Into::into).collect(),
            handler: Box::new(handler),
        }
    }

    /// A plugin fired after every load.
    pub fn wildcard<F>(handler: F) -> Self
    where
        F: Fn() -> Result<(), PluginError> + Send + Sync + 'static,
    {
        Plugin::new([WILDCARD], handler)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn watches_all(&self) -> bool {
        self.keys.iter().any(|k| k == WILDCARD)
    }

    pub(crate) fn fire(&self) {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.handler)())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(keys = ?self.keys, error = %err, "config plugin failed");
            }
            Err(payload) => {
                tracing::warn!(
                    keys = ?self.keys,
                    panic = panic_message(payload.as_ref()),
                    "config plugin panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
