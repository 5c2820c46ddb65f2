#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};

    use crate::value::{Map, Value};

    /// Build a tree from a JSON object literal.
    pub fn map(json: &str) -> Map {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Map(map)) => map,
            other => panic!("fixture is not a JSON object: {other:?}"),
        }
    }

    /// The tree most accessor tests run against.
    pub const SAMPLE: &str = r#"{
        "debug": true,
        "server": {"http": {"port": 51020}},
        "coordinate": {"longitude": 64.09},
        "date": "2015-01-01T20:17:05Z",
        "app": {"registry": {"etcd": {
            "timeout": "2s",
            "endpoints": ["127.0.0.1:2379", "127.0.0.1:2479"]
        }}},
        "log": {"dir": "./log", "level": "Info | Warn | Error | Panic | Fatal"},
        "province": {"Hubei": ["Wuhan", "Tianmen"], "Guangdong": ["Guangzhou"]}
    }"#;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    pub struct LogConfig {
        pub dir: String,
        pub level: String,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct HttpConfig {
        /// The listen host.
        #[config(default = "localhost")]
        pub host: String,

        /// The listen port.
        #[config(default = 8080)]
        pub port: u16,

        /// Registry settings.
        #[config(nested)]
        pub registry: RegistryConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct RegistryConfig {
        pub endpoint: Option<String>,

        #[config(default = 3)]
        pub retries: u32,
    }

    #[test]
    fn http_config_loads_defaults() {
        let config = HttpConfig::builder().load().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.registry.endpoint, None);
        assert_eq!(config.registry.retries, 3);
    }

    #[test]
    fn sample_is_a_tree() {
        let tree = map(SAMPLE);
        assert_eq!(tree.len(), 7);
    }
}
