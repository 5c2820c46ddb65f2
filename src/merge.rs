use crate::value::{Map, Value};

/// Deep-merge `overlay` into `base` in place.
/// If both sides hold a map for the same key, recurse.
/// Otherwise `overlay`'s value wins, including a scalar replacing a map
/// and a map replacing a scalar.
///
/// `overlay` is consumed, so the merged tree never shares nodes with a tree
/// the caller still holds.
pub fn merge(base: &mut Map, overlay: Map) {
    for (key, overlay_val) in overlay {
        match overlay_val {
            Value::Map(overlay_map) => {
                if let Some(Value::Map(base_map)) = base.get_mut(&key) {
                    merge(base_map, overlay_map);
                } else {
                    base.insert(key, Value::Map(overlay_map));
                }
            }
            scalar => {
                base.insert(key, scalar);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::map;

    #[test]
    fn disjoint_keys_merge() {
        let mut base = map(r#"{"host": "localhost"}"#);
        merge(&mut base, map(r#"{"port": 3000}"#));
        assert_eq!(base["host"], Value::from("localhost"));
        assert_eq!(base["port"], Value::Int(3000));
    }

    #[test]
    fn same_scalar_key_overlay_wins() {
        let mut base = map(r#"{"port": 8080}"#);
        merge(&mut base, map(r#"{"port": 3000}"#));
        assert_eq!(base["port"], Value::Int(3000));
    }

    #[test]
    fn nested_maps_deepen() {
        let mut base = map(r#"{"a": {"x": 1}}"#);
        merge(&mut base, map(r#"{"a": {"y": 2}}"#));
        assert_eq!(base, map(r#"{"a": {"x": 1, "y": 2}}"#));
    }

    #[test]
    fn overlay_scalar_replaces_map() {
        let mut base = map(r#"{"a": {"x": 1}}"#);
        merge(&mut base, map(r#"{"a": 5}"#));
        assert_eq!(base, map(r#"{"a": 5}"#));
    }

    #[test]
    fn overlay_map_replaces_scalar() {
        let mut base = map(r#"{"a": 5}"#);
        merge(&mut base, map(r#"{"a": {"x": 1}}"#));
        assert_eq!(base, map(r#"{"a": {"x": 1}}"#));
    }

    #[test]
    fn sequences_are_replaced_not_concatenated() {
        let mut base = map(r#"{"hosts": ["a", "b"]}"#);
        merge(&mut base, map(r#"{"hosts": ["c"]}"#));
        assert_eq!(base["hosts"], Value::from(vec!["c"]));
    }

    #[test]
    fn empty_overlay_keeps_base() {
        let mut base = map(r#"{"port": 8080}"#);
        let expected = base.clone();
        merge(&mut base, Map::new());
        assert_eq!(base, expected);
    }

    #[test]
    fn empty_base_takes_overlay() {
        let overlay = map(r#"{"a": {"b": {"c": 1}}}"#);
        let mut base = Map::new();
        merge(&mut base, overlay.clone());
        assert_eq!(base, overlay);
    }

    #[test]
    fn deeply_nested_three_levels() {
        let mut base = map(r#"{"a": {"b": {"c": {"val": 1, "other": "keep"}}}}"#);
        merge(&mut base, map(r#"{"a": {"b": {"c": {"val": 99}}}}"#));
        assert_eq!(
            base,
            map(r#"{"a": {"b": {"c": {"val": 99, "other": "keep"}}}}"#)
        );
    }

    #[test]
    fn merging_same_tree_twice_is_stable() {
        let overlay = map(r#"{"a": {"x": 1}, "b": [1, 2], "c": "s"}"#);
        let mut once = Map::new();
        merge(&mut once, overlay.clone());
        let mut twice = once.clone();
        merge(&mut twice, overlay);
        assert_eq!(once, twice);
    }

    #[test]
    fn repeated_mismatched_merges_are_stable() {
        let mut base = map(r#"{"a": {"x": 1}}"#);
        merge(&mut base, map(r#"{"a": 5}"#));
        let after_first = base.clone();
        merge(&mut base, map(r#"{"a": 5}"#));
        assert_eq!(base, after_first);
    }

    #[test]
    fn multiple_sequential_merges() {
        let mut base = map(r#"{"host": "a"}"#);
        merge(&mut base, map(r#"{"port": 1000}"#));
        merge(&mut base, map(r#"{"host": "c"}"#));
        assert_eq!(base["host"], Value::from("c"));
        assert_eq!(base["port"], Value::Int(1000));
    }
}
