use std::path::PathBuf;

/// Where to look for config files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit path.
    Path(PathBuf),
}

/// A read-only query against a loaded [`Config`](crate::Config), independent
/// of any CLI framework. The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    List,
    Get { key: String },
}
