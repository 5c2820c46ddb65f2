mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tempfile::TempDir;

use treefig::{Config, ConfigError, EnvProvider, FileProvider, OverrideProvider, SearchPath};

use common::{SAMPLE_JSON, SAMPLE_TOML, SAMPLE_YAML, write};

#[derive(Deserialize, Debug)]
struct Log {
    dir: String,
    level: String,
}

#[test]
fn toml_file_accessors() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.toml", SAMPLE_TOML);

    let config = Config::new();
    config.load_file(&path).unwrap();

    assert!(config.get_bool("debug"));
    assert_eq!(config.get_int("server.http.port"), 51020);
    assert_eq!(config.get_int("server.http.missing"), 0);
    assert_eq!(config.get_float64("coordinate.longitude"), 64.09);
    assert_eq!(
        config.get_time("date"),
        Utc.with_ymd_and_hms(2015, 1, 1, 20, 17, 5).unwrap()
    );
    assert_eq!(
        config.get_duration("app.registry.etcd.timeout"),
        Duration::from_secs(2)
    );
    assert_eq!(
        config.get_string_slice("app.registry.etcd.endpoints"),
        ["127.0.0.1:2379", "127.0.0.1:2479"]
    );
    assert_eq!(
        config.get_string_map_string_slice("province")["Hubei"],
        ["Wuhan", "Tianmen"]
    );

    let log_map = config.get_string_map("log");
    assert_eq!(log_map.len(), 2);
    let log: Log = config.unmarshal_key("log").unwrap();
    assert_eq!(log.dir, "./log");
    assert_eq!(log.level, "Info | Warn | Error | Panic | Fatal");
}

#[test]
fn yaml_and_json_merge_over_toml() {
    let dir = TempDir::new().unwrap();
    let toml = write(&dir, "app.toml", SAMPLE_TOML);
    let yaml = write(&dir, "app.yaml", SAMPLE_YAML);
    let json = write(&dir, "app.json", SAMPLE_JSON);

    let config = Config::new();
    config.load_file(&toml).unwrap();
    config.load_file(&yaml).unwrap();
    config.load_file(&json).unwrap();

    assert_eq!(config.get_string("a.b.c"), "brown");
    // yaml replaced one leaf, the sibling survives
    assert_eq!(config.get_string("log.level"), "Debug");
    assert_eq!(config.get_string("log.dir"), "./log");
    // json wins over toml
    assert_eq!(config.get_int("server.http.port"), 8080);
}

#[test]
fn same_file_loads_once() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.toml", "port = 1\n");

    let config = Config::new();
    config.load_file(&path).unwrap();
    write(&dir, "app.toml", "port = 2\n");
    config.load_file(&path).unwrap();
    assert_eq!(config.get_int("port"), 1);

    config.reset();
    config.load_file(&path).unwrap();
    assert_eq!(config.get_int("port"), 2);
}

#[test]
fn broken_file_leaves_config_alone() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.toml", "port = 1\n");
    let bad = write(&dir, "bad.yaml", "port: [1, 2\n");

    let config = Config::new();
    config.load_file(&good).unwrap();
    let err = config.load_file(&bad).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(config.get_int("port"), 1);

    let err = config.load_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn layered_sources() {
    let low = TempDir::new().unwrap();
    let high = TempDir::new().unwrap();
    write(&low, "app.toml", SAMPLE_TOML);
    write(&high, "app.yaml", "server:\n  http:\n    port: 9000\n");

    let config = Config::new();
    let files = FileProvider::search(
        &[
            SearchPath::Path(low.path().to_path_buf()),
            SearchPath::Path(high.path().to_path_buf()),
        ],
        "app",
        "test",
    );
    assert_eq!(files.len(), 2);
    for file in &files {
        config.load(file).unwrap();
    }
    assert_eq!(config.get_int("server.http.port"), 9000);

    config
        .load(&EnvProvider::with_vars(
            "APP",
            [("APP__LOG__DIR".to_string(), "/var/log/app".to_string())],
        ))
        .unwrap();
    config
        .load(&OverrideProvider::new().set("server.http.port", 7000))
        .unwrap();

    assert_eq!(config.get_string("log.dir"), "/var/log/app");
    assert_eq!(config.get_string("log.level"), "Info | Warn | Error | Panic | Fatal");
    assert_eq!(config.get_int("server.http.port"), 7000);
}
