#![cfg(feature = "watch")]

mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use treefig::{Config, Plugin};

use common::write;

const TIMEOUT: Duration = Duration::from_secs(10);

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
fn edited_file_is_merged_and_plugin_fires() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.toml", "[log]\nlevel = \"info\"\ndir = \"./log\"\n");

    let config = Arc::new(Config::new());
    let (tx, rx) = mpsc::channel();
    config.register_plugin(Plugin::new(["log.level"], move || {
        let _ = tx.send(());
        Ok(())
    }));

    let guard = config.load_and_watch_file(&path).unwrap();
    assert!(guard.is_some());
    // the initial load changed log.level from absent to "info"
    rx.recv_timeout(TIMEOUT).unwrap();

    write(&dir, "app.toml", "[log]\nlevel = \"debug\"\ndir = \"./log\"\n");
    rx.recv_timeout(TIMEOUT).unwrap();
    assert!(wait_for(|| config.get_string("log.level") == "debug"));
    assert_eq!(config.get_string("log.dir"), "./log");
}

#[test]
fn broken_edit_keeps_last_good_tree() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.json", r#"{"port": 1}"#);

    let config = Arc::new(Config::new());
    let _guard = config.load_and_watch_file(&path).unwrap();

    write(&dir, "app.json", r#"{"port": "#);
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(config.get_int("port"), 1);

    write(&dir, "app.json", r#"{"port": 2}"#);
    assert!(wait_for(|| config.get_int("port") == 2));
}

#[test]
fn dropping_config_ends_reloads() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.toml", "port = 1\n");

    let config = Arc::new(Config::new());
    let guard = config.load_and_watch_file(&path).unwrap();
    drop(config);

    // the watcher outlives the config; notifications must be harmless
    write(&dir, "app.toml", "port = 2\n");
    std::thread::sleep(Duration::from_millis(300));
    drop(guard);
}
