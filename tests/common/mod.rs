#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

pub const SAMPLE_TOML: &str = r#"
debug = true
date = 2015-01-01T20:17:05Z

[server.http]
port = 51020

[coordinate]
longitude = 64.09

[app.registry.etcd]
timeout = "2s"
endpoints = ["127.0.0.1:2379", "127.0.0.1:2479"]

[log]
dir = "./log"
level = "Info | Warn | Error | Panic | Fatal"

[province]
Hubei = ["Wuhan", "Tianmen"]
Guangdong = ["Guangzhou"]
"#;

pub const SAMPLE_YAML: &str = "\
a:
  b:
    c: brown
log:
  level: Debug
";

pub const SAMPLE_JSON: &str = r#"{"a": {"b": {"c": "brown"}}, "server": {"http": {"port": 8080}}}"#;

pub fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}
