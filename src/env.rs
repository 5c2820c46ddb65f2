use crate::error::ConfigError;
use crate::path;
use crate::provider::Provider;
use crate::value::{Map, Value};

/// Reads `{PREFIX}__*` environment variables into a tree.
///
/// Double underscore `__` separates nesting levels; a single `_` stays part
/// of the key. Segments are lowercased, so `APP__LOG__DIR` lands at
/// `log.dir`. Values are typed heuristically: bool, then integer, then
/// float, then string.
#[derive(Debug, Clone)]
pub struct EnvProvider {
    prefix: String,
    vars: Option<Vec<(String, String)>>,
}

impl EnvProvider {
    /// Read from the process environment at load time.
    pub fn new(prefix: impl Into<String>) -> Self {
        EnvProvider {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Read from a fixed set of variables instead of the process environment.
    pub fn with_vars(
        prefix: impl Into<String>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        EnvProvider {
            prefix: prefix.into(),
            vars: Some(vars.into_iter().collect()),
        }
    }
}

impl Provider for EnvProvider {
    fn read(&self) -> Result<Map, ConfigError> {
        Ok(match &self.vars {
            Some(vars) => env_to_map(&self.prefix, vars.iter().cloned()),
            None => env_to_map(&self.prefix, std::env::vars()),
        })
    }
}

/// Build a tree from the variables starting with `{prefix}__`.
pub fn env_to_map(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Map {
    let needle = format!("{prefix}__");
    let mut tree = Map::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() || rest.split("__").any(str::is_empty) {
            continue;
        }
        let dotted = rest.to_lowercase().replace("__", ".");
        path::insert(&mut tree, &dotted, ".", parse_env_value(&value));
    }

    tree
}

fn parse_env_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    // "NaN" and "inf" parse as floats; only accept a literal with a dot
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lookup<'a>(tree: &'a Map, key: &str) -> &'a Value {
        path::find(tree, key, ".").unwrap()
    }

    #[test]
    fn simple_key() {
        let tree = env_to_map("MYAPP", vars(&[("MYAPP__HOST", "0.0.0.0")]));
        assert_eq!(tree["host"], Value::from("0.0.0.0"));
    }

    #[test]
    fn nested_key() {
        let tree = env_to_map("MYAPP", vars(&[("MYAPP__LOG__DIR", "/var/log")]));
        assert_eq!(lookup(&tree, "log.dir"), &Value::from("/var/log"));
    }

    #[test]
    fn single_underscore_preserved() {
        let tree = env_to_map("MYAPP", vars(&[("MYAPP__POOL_SIZE", "10")]));
        assert_eq!(tree["pool_size"], Value::Int(10));
    }

    #[test]
    fn typed_values() {
        let tree = env_to_map(
            "APP",
            vars(&[
                ("APP__DEBUG", "TRUE"),
                ("APP__QUIET", "false"),
                ("APP__OFFSET", "-5"),
                ("APP__RATE", "1.5"),
                ("APP__NAME", "hello world"),
                ("APP__WEIRD", "NaN"),
            ]),
        );
        assert_eq!(tree["debug"], Value::Bool(true));
        assert_eq!(tree["quiet"], Value::Bool(false));
        assert_eq!(tree["offset"], Value::Int(-5));
        assert_eq!(tree["rate"], Value::Float(1.5));
        assert_eq!(tree["name"], Value::from("hello world"));
        assert_eq!(tree["weird"], Value::from("NaN"));
    }

    #[test]
    fn unrelated_and_malformed_names_ignored() {
        let tree = env_to_map(
            "MYAPP",
            vars(&[
                ("OTHER__HOST", "x"),
                ("MYAPP", "x"),
                ("MYAPP_HOST", "x"),
                ("MYAPP__", "x"),
                ("MYAPP__A____B", "x"),
            ]),
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn provider_reads_fixed_vars() {
        let provider = EnvProvider::with_vars("APP", vars(&[("APP__SERVER__HTTP__PORT", "51020")]));
        let tree = provider.read().unwrap();
        assert_eq!(lookup(&tree, "server.http.port"), &Value::Int(51020));
        assert_eq!(provider.source_id(), None);
    }
}
