//! File-backed configuration sources.
//!
//! A [`FileProvider`] reads one file whose format is taken from its
//! extension: `.toml`, `.yaml`/`.yml` or `.json`. Every format decodes into
//! the same [`Value`] tree, so files of different formats merge freely.
//!
//! # Discovery
//!
//! [`FileProvider::search`] resolves each [`SearchPath`] to a directory and
//! collects every `{dir}/{stem}.{ext}` that exists, in search-path order and
//! then extension order. Loading the results in sequence gives later
//! directories priority over earlier ones.
//!
//! # Watching
//!
//! With the `watch` feature, a file provider watches its parent directory
//! through `notify` and re-reads the file on every create or modify event
//! touching it. A re-read that fails is logged and skipped; the last good
//! tree stays in place.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::provider::{OnChange, Provider, WatchGuard};
use crate::types::SearchPath;
use crate::value::{Map, Value, map_from_toml};

const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Format::Toml),
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    /// Decode `content` into a tree. `path` only labels errors.
    pub fn parse(self, content: &str, path: &Path) -> Result<Map, ConfigError> {
        let parse_error = |reason: String| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        };
        let root = match self {
            Format::Toml => {
                let table: toml::Table =
                    toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
                return Ok(map_from_toml(table));
            }
            Format::Yaml => serde_saphyr::from_str::<Value>(content)
                .map_err(|e| parse_error(e.to_string()))?,
            Format::Json => serde_json::from_str::<Value>(content)
                .map_err(|e| parse_error(e.to_string()))?,
        };
        match root {
            Value::Map(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(parse_error(format!(
                "top level must be a mapping, found {}",
                other.type_name()
            ))),
        }
    }
}

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to build the platform config
/// directory (e.g. `~/.config/{app_name}/` on Linux). Returns `None` when the
/// directory cannot be determined, e.g. no home directory.
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileProvider { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Option<Format> {
        Format::from_path(&self.path)
    }

    /// Find `{stem}.{toml,yaml,yml,json}` in each search directory.
    pub fn search(search_paths: &[SearchPath], stem: &str, app_name: &str) -> Vec<FileProvider> {
        let mut found = Vec::new();
        for sp in search_paths {
            let Some(dir) = resolve_search_path(sp, app_name) else {
                tracing::debug!(search_path = ?sp, "search path did not resolve");
                continue;
            };
            for ext in EXTENSIONS {
                let candidate = dir.join(format!("{stem}.{ext}"));
                if candidate.is_file() {
                    found.push(FileProvider::new(candidate));
                }
            }
        }
        found
    }

    fn canonical_path(&self) -> PathBuf {
        fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
    }
}

impl Provider for FileProvider {
    fn read(&self) -> Result<Map, ConfigError> {
        let format = self.format().ok_or_else(|| ConfigError::UnsupportedFormat {
            path: self.path.clone(),
        })?;
        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        format.parse(&content, &self.path)
    }

    fn source_id(&self) -> Option<String> {
        Some(self.canonical_path().display().to_string())
    }

    #[cfg(feature = "watch")]
    fn watch(&self, on_change: OnChange) -> Result<Option<WatchGuard>, ConfigError> {
        use notify::{RecursiveMode, Watcher};

        let target = self.canonical_path();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = target.file_name().map(|n| n.to_os_string());
        let provider = self.clone();

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let touches_target = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_target {
                        return;
                    }
                    match provider.read() {
                        Ok(tree) => {
                            tracing::info!(
                                path = %provider.path.display(),
                                "config file changed, reloading"
                            );
                            on_change(tree);
                        }
                        Err(err) => {
                            tracing::warn!(
                                path = %provider.path.display(),
                                error = %err,
                                "config reload failed"
                            );
                        }
                    }
                }
                Err(err) => tracing::warn!(error = %err, "config watch error"),
            })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %target.display(), "watching config file");
        Ok(Some(WatchGuard::new(watcher)))
    }

    #[cfg(not(feature = "watch"))]
    fn watch(&self, on_change: OnChange) -> Result<Option<WatchGuard>, ConfigError> {
        drop(on_change);
        Ok(None)
    }
}
