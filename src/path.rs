//! Delimited-path resolution over a configuration tree.
//!
//! A path like `"app.registry.etcd.endpoints"` is split on the key delimiter.
//! Every segment but the last names a map to descend into; the last names the
//! leaf. Missing segments and non-map intermediates resolve to nothing rather
//! than an error.

use crate::value::{Map, Value};

/// Split `key` on `delim`. An empty delimiter never splits.
pub fn segments<'a>(key: &'a str, delim: &str) -> Vec<&'a str> {
    if delim.is_empty() {
        return vec![key];
    }
    key.split(delim).collect()
}

/// Walk `tree` along `segments`, returning the map found at the end of the
/// chain. `None` when a segment is missing or names a non-map value.
pub fn descend<'a>(tree: &'a Map, segments: &[&str]) -> Option<&'a Map> {
    let mut current = tree;
    for segment in segments {
        current = current.get(*segment)?.as_map()?;
    }
    Some(current)
}

/// Navigate `tree` by delimited `key` (e.g. `"server.http.port"`).
pub fn find<'a>(tree: &'a Map, key: &str, delim: &str) -> Option<&'a Value> {
    let segments = segments(key, delim);
    let (leaf, parents) = segments.split_last()?;
    descend(tree, parents)?.get(*leaf)
}

/// Place `value` at delimited `key`, creating intermediate maps as needed.
/// An intermediate scalar in the way is replaced by a map, the same outcome
/// a merge of the equivalent nested tree would produce.
pub fn insert(tree: &mut Map, key: &str, delim: &str, value: Value) {
    let segments = segments(key, delim);
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Map(Map::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(Map::new());
        }
        let Value::Map(next) = slot else {
            return;
        };
        current = next;
    }

    current.insert((*leaf).to_string(), value);
}
