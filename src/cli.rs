//! Clap adapter for treefig.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`ConfigArgs`] and [`ConfigSubcommand`] embed into an application's clap
//! derive to give it `config list|get` subcommands. The only bridge to the
//! core is [`ConfigArgs::into_action()`]; everything after that goes through
//! the clap-free [`Config::handle()`](crate::Config::handle).

use clap::{Args, Subcommand};

use crate::types::ConfigAction;

/// Clap-derived args for the `config` subcommand group.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(ConfigArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show all resolved configuration key-value pairs.
    List,
    /// Show the resolved value of a config key.
    Get {
        /// Delimited key path (e.g. "server.http.port").
        key: String,
    },
}

impl ConfigArgs {
    /// Bare `config` and `config list` both map to `ConfigAction::List`.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
        }
    }
}
