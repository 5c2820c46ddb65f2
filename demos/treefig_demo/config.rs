//! Typed views over parts of the demo's configuration tree.
//!
//! [`ServerConfig`] is bound through confique so its defaults apply when the
//! tree leaves keys out. [`EtcdConfig`] is bound with plain serde and shows
//! the duration hook: `timeout = "2s"` lands in a `Duration`.

use std::time::Duration;

use confique::Config;
use serde::Deserialize;

#[derive(Config, Debug)]
pub struct ServerConfig {
    /// Hostname to bind to.
    #[config(default = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[config(default = 8080)]
    pub port: u16,
}

#[derive(Deserialize, Debug)]
pub struct EtcdConfig {
    pub endpoints: Vec<String>,
    pub timeout: Duration,
}
