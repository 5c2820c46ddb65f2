//! # treefig demo application
//!
//! A sample CLI tool wiring [treefig](https://docs.rs/treefig) into an
//! application. It exists to demonstrate and manually verify treefig's
//! features, nothing more.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example treefig_demo -- echo
//! cargo run --example treefig_demo -- config list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                 | How to exercise it                                                        |
//! |-------------------------|---------------------------------------------------------------------------|
//! | Bundled sample file     | `cargo run --example treefig_demo -- echo`                                |
//! | Config file discovery   | Drop `treefig-demo.{toml,yaml,json}` in cwd or `~/.treefig-demo/`         |
//! | Explicit file           | `cargo run --example treefig_demo -- --file other.yaml echo`              |
//! | Env var override        | `TREEFIG_DEMO__SERVER__PORT=9999 cargo run --example treefig_demo -- echo` |
//! | CLI override            | `cargo run --example treefig_demo -- --port 7000 echo`                    |
//! | Single key, lenient     | `cargo run --example treefig_demo -- echo --key log.level`                |
//! | `config get` / `list`   | `cargo run --example treefig_demo -- config get server.port`              |
//! | Live reload + plugin    | `cargo run --example treefig_demo -- watch`, then edit the file           |
//! | Logging                 | `RUST_LOG=treefig=debug cargo run --example treefig_demo -- echo`         |

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use treefig::{
    Config, ConfigArgs, ConfigError, EnvProvider, FileProvider, OverrideProvider, Plugin,
    SearchPath,
};

use config::{EtcdConfig, ServerConfig};

const APP_NAME: &str = "treefig-demo";

/// treefig demo: a sample CLI app showcasing treefig integration.
#[derive(Parser, Debug)]
#[command(name = "treefig-demo")]
struct Cli {
    /// Load this file instead of searching for one.
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Override the server port.
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a summary of the resolved configuration.
    Echo {
        /// Print only this key, as a string.
        #[arg(long)]
        key: Option<String>,
    },
    /// Watch the config file and report changes to server.port.
    Watch {
        /// Stop after this many seconds.
        #[arg(long, default_value_t = 60)]
        seconds: u64,
    },
    /// Inspect the configuration (list, get).
    Config(ConfigArgs),
}

fn config_files(cli: &Cli) -> Vec<FileProvider> {
    if let Some(path) = &cli.file {
        return vec![FileProvider::new(path)];
    }
    let bundled = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/treefig_demo");
    FileProvider::search(
        &[
            SearchPath::Path(bundled),
            SearchPath::Platform,
            SearchPath::Home(".treefig-demo"),
            SearchPath::Cwd,
        ],
        APP_NAME,
        APP_NAME,
    )
}

/// Files in search order, then `TREEFIG_DEMO__*` env vars, then CLI flags.
fn load(cli: &Cli, files: &[FileProvider]) -> Result<Arc<Config>, ConfigError> {
    let config = treefig::global();
    for file in files {
        config.load(file)?;
    }
    config.load(&EnvProvider::new("TREEFIG_DEMO"))?;
    config.load(&OverrideProvider::new().set_opt("server.port", cli.port.map(i64::from)))?;
    Ok(config)
}

fn echo_all(config: &Config) -> Result<(), ConfigError> {
    let server: ServerConfig = config.unmarshal_config("server")?;
    println!("server      {}:{}", server.host, server.port);
    println!("debug       {}", config.get_bool("debug"));
    println!("log.dir     {}", config.get_string("log.dir"));
    println!("date        {}", config.get_time("date").to_rfc3339());

    let etcd: EtcdConfig = config.unmarshal_key("app.registry.etcd")?;
    println!("etcd        {} (timeout {:?})", etcd.endpoints.join(", "), etcd.timeout);

    for (province, cities) in config.get_string_map_string_slice("province") {
        println!("province    {province}: {}", cities.join(", "));
    }
    Ok(())
}

fn watch(config: &Arc<Config>, files: &[FileProvider], seconds: u64) -> Result<(), ConfigError> {
    let Some(file) = files.last() else {
        eprintln!("No config file to watch");
        std::process::exit(1);
    };

    let observed = Arc::downgrade(config);
    config.register_plugin(Plugin::new(["server.port"], move || {
        if let Some(config) = observed.upgrade() {
            println!("server.port is now {}", config.get_int("server.port"));
        }
        Ok(())
    }));

    let _guard = config.watch(file)?;
    println!(
        "Watching {} for {seconds}s (server.port = {})",
        file.path().display(),
        config.get_int("server.port")
    );
    std::thread::sleep(Duration::from_secs(seconds));
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let files = config_files(&cli);
    let config = load(&cli, &files).unwrap_or_else(|e| {
        eprintln!("Failed to load config:\n{e}");
        std::process::exit(1);
    });

    let result = match cli.command {
        Commands::Echo { key: Some(key) } => {
            println!("{key}  {}", config.get_string(&key));
            Ok(())
        }
        Commands::Echo { key: None } => echo_all(&config),
        Commands::Watch { seconds } => watch(&config, &files, seconds),
        Commands::Config(args) => config
            .handle(&args.into_action())
            .map(|result| println!("{result}")),
    };

    if let Err(e) = result {
        eprintln!("Config error:\n{e}");
        std::process::exit(1);
    }
}
