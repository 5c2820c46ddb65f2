//! Flatten a configuration tree into delimited key/value pairs.

use crate::value::{Map, Value};

/// Flatten `tree` into `(key, leaf)` pairs in key order.
///
/// Maps are recursed into, joining segments with `delim`:
/// `{log: {dir: "./log"}}` becomes `[("log.dir", "./log")]`. Sequences are
/// leaves. An empty map is kept as a leaf so that the key stays visible.
pub fn flatten<'a>(tree: &'a Map, delim: &str) -> Vec<(String, &'a Value)> {
    let mut out = Vec::new();
    walk(tree, "", delim, &mut out);
    out
}

fn walk<'a>(tree: &'a Map, prefix: &str, delim: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in tree {
        let joined = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{delim}{key}")
        };
        match value {
            Value::Map(inner) if !inner.is_empty() => walk(inner, &joined, delim, out),
            leaf => out.push((joined, leaf)),
        }
    }
}
