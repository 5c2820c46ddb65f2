//! A serde `Deserializer` over a borrowed [`Value`] tree.
//!
//! Used by [`Config::unmarshal_key`](crate::Config::unmarshal_key) to bind a
//! subtree into any `Deserialize` type. Differs from a plain self-describing
//! deserializer in two ways:
//!
//! - struct fields match map keys case-insensitively (`Dir` fills `dir`), an
//!   exact match winning over a folded one;
//! - a `std::time::Duration` target accepts duration strings (`"2s"`) and
//!   integer or float nanoseconds.
//!
//! Anything else that does not fit the target type is an error; nothing is
//! silently zeroed here.

use std::collections::btree_map;
use std::fmt;
use std::iter::Enumerate;
use std::slice;

use serde::de::value::{BorrowedStrDeserializer, SeqDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess,
    SeqAccess, Unexpected, VariantAccess, Visitor,
};

use crate::cast;
use crate::value::{Map, Value};

static NULL: Value = Value::Null;

/// Bind `value` into `T`.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, DecodeError> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Bind `value` into `T`, reporting every key the target did not consume.
pub fn from_value_tracking_ignored<T: DeserializeOwned>(
    value: &Value,
) -> Result<(T, Vec<String>), DecodeError> {
    let mut ignored = Vec::new();
    let out = serde_ignored::deserialize(ValueDeserializer::new(value), |path| {
        ignored.push(path.to_string());
    })?;
    Ok((out, ignored))
}

/// Decode failure with the path of keys leading to the offending value.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    message: String,
    // innermost segment first
    path: Vec<String>,
}

impl DecodeError {
    fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }

    /// Dotted location of the failure relative to the decoded subtree.
    pub fn location(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        let segments: Vec<&str> = self.path.iter().rev().map(String::as_str).collect();
        Some(segments.join("."))
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "at '{location}': {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DecodeError {}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodeError {
            message: msg.to_string(),
            path: Vec::new(),
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Int(i) => Unexpected::Signed(*i),
        Value::Float(f) => Unexpected::Float(*f),
        Value::String(s) => Unexpected::Str(s),
        Value::Seq(_) => Unexpected::Seq,
        Value::Map(_) => Unexpected::Map,
    }
}

pub struct ValueDeserializer<'de> {
    value: &'de Value,
}

impl<'de> ValueDeserializer<'de> {
    pub fn new(value: &'de Value) -> Self {
        ValueDeserializer { value }
    }

    fn invalid<V: Visitor<'de>>(&self, visitor: &V) -> DecodeError {
        de::Error::invalid_type(unexpected(self.value), visitor)
    }
}

fn is_duration(name: &str, fields: &[&str]) -> bool {
    name == "Duration" && fields == ["secs", "nanos"]
}

impl<'de> Deserializer<'de> for ValueDeserializer<'de> {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Int(i) => visitor.visit_i64(*i),
            Value::Float(f) => visitor.visit_f64(*f),
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Seq(items) => visitor.visit_seq(ValueSeqAccess::new(items)),
            Value::Map(map) => visitor.visit_map(ValueMapAccess::new(map, None)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => Err(self.invalid(&visitor)),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Seq(items) => visitor.visit_seq(ValueSeqAccess::new(items)),
            Value::Null => visitor.visit_seq(ValueSeqAccess::new(&[])),
            _ => Err(self.invalid(&visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::Map(map) => visitor.visit_map(ValueMapAccess::new(map, None)),
            Value::Null => visitor.visit_map(ValueMapAccess::empty(None)),
            _ => Err(self.invalid(&visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        if is_duration(name, fields)
            && matches!(self.value, Value::String(_) | Value::Int(_) | Value::Float(_))
        {
            let duration = cast::to_duration(self.value)
                .map_err(|e| <DecodeError as de::Error>::custom(e.to_string()))?;
            let parts = [duration.as_secs(), u64::from(duration.subsec_nanos())];
            return visitor.visit_seq(SeqDeserializer::new(parts.into_iter()));
        }

        match self.value {
            Value::Map(map) => visitor.visit_map(ValueMapAccess::new(map, Some(fields))),
            Value::Null => visitor.visit_map(ValueMapAccess::empty(Some(fields))),
            Value::Seq(items) => visitor.visit_seq(ValueSeqAccess::new(items)),
            _ => Err(self.invalid(&visitor)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            Value::Map(map) if map.len() == 1 => {
                let (variant, value) = map.iter().next().ok_or_else(|| self.invalid(&visitor))?;
                visitor.visit_enum(ValueEnumAccess {
                    variant: variant.as_str(),
                    value,
                })
            }
            _ => Err(self.invalid(&visitor)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf identifier
    }
}

// --- SeqAccess ---

struct ValueSeqAccess<'de> {
    iter: Enumerate<slice::Iter<'de, Value>>,
    len: usize,
}

impl<'de> ValueSeqAccess<'de> {
    fn new(items: &'de [Value]) -> Self {
        ValueSeqAccess {
            iter: items.iter().enumerate(),
            len: items.len(),
        }
    }
}

impl<'de> SeqAccess<'de> for ValueSeqAccess<'de> {
    type Error = DecodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DecodeError> {
        match self.iter.next() {
            Some((index, value)) => seed
                .deserialize(ValueDeserializer::new(value))
                .map(Some)
                .map_err(|e| e.within(index.to_string())),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len)
    }
}

// --- MapAccess ---

struct ValueMapAccess<'de> {
    map: Option<&'de Map>,
    iter: Option<btree_map::Iter<'de, String, Value>>,
    fields: Option<&'static [&'static str]>,
    // fields already filled through a case-folded key
    claimed: Vec<&'static str>,
    pending: Option<(&'de str, &'de Value)>,
    remaining: usize,
}

impl<'de> ValueMapAccess<'de> {
    fn new(map: &'de Map, fields: Option<&'static [&'static str]>) -> Self {
        ValueMapAccess {
            map: Some(map),
            iter: Some(map.iter()),
            fields,
            claimed: Vec::new(),
            pending: None,
            remaining: map.len(),
        }
    }

    fn empty(fields: Option<&'static [&'static str]>) -> Self {
        ValueMapAccess {
            map: None,
            iter: None,
            fields,
            claimed: Vec::new(),
            pending: None,
            remaining: 0,
        }
    }

    /// Map a tree key onto the struct field it names, if any.
    ///
    /// Each field is filled once: by its exact key when the map has one,
    /// otherwise by the first key that folds to it. Keys losing out keep
    /// their own name and so surface as unknown.
    fn field_for(&mut self, key: &'de str) -> &'de str {
        let Some(fields) = self.fields else {
            return key;
        };
        if fields.contains(&key) {
            return key;
        }
        let folded = key.to_lowercase();
        let Some(field) = fields.iter().find(|f| f.to_lowercase() == folded).copied() else {
            return key;
        };
        let exact_present = self.map.is_some_and(|map| map.contains_key(field));
        if exact_present || self.claimed.contains(&field) {
            return key;
        }
        self.claimed.push(field);
        field
    }
}

impl<'de> MapAccess<'de> for ValueMapAccess<'de> {
    type Error = DecodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DecodeError> {
        let Some((key, value)) = self.iter.as_mut().and_then(Iterator::next) else {
            return Ok(None);
        };
        self.remaining -= 1;
        self.pending = Some((key.as_str(), value));
        let field = self.field_for(key.as_str());
        seed.deserialize(BorrowedStrDeserializer::new(field)).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, DecodeError> {
        let (key, value) = self
            .pending
            .take()
            .ok_or_else(|| <DecodeError as de::Error>::custom("value requested before key"))?;
        seed.deserialize(ValueDeserializer::new(value))
            .map_err(|e| e.within(key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

// --- EnumAccess ---

struct ValueEnumAccess<'de> {
    variant: &'de str,
    value: &'de Value,
}

impl<'de> EnumAccess<'de> for ValueEnumAccess<'de> {
    type Error = DecodeError;
    type Variant = ValueVariantAccess<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), DecodeError> {
        let variant = seed.deserialize(BorrowedStrDeserializer::new(self.variant))?;
        Ok((
            variant,
            ValueVariantAccess {
                name: self.variant,
                value: self.value,
            },
        ))
    }
}

struct ValueVariantAccess<'de> {
    name: &'de str,
    value: &'de Value,
}

impl<'de> VariantAccess<'de> for ValueVariantAccess<'de> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(de::Error::invalid_type(unexpected(other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, DecodeError> {
        seed.deserialize(ValueDeserializer::new(self.value))
            .map_err(|e| e.within(self.name))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        ValueDeserializer::new(self.value)
            .deserialize_seq(visitor)
            .map_err(|e| e.within(self.name))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        ValueDeserializer::new(self.value)
            .deserialize_struct("", fields, visitor)
            .map_err(|e| e.within(self.name))
    }
}

/// Decode the value at an optional location, treating absence as null.
pub(crate) fn from_optional_tracking_ignored<T: DeserializeOwned>(
    value: Option<&Value>,
) -> Result<(T, Vec<String>), DecodeError> {
    from_value_tracking_ignored(value.unwrap_or(&NULL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{LogConfig, map};
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::time::Duration;

    fn tree(json: &str) -> Value {
        Value::Map(map(json))
    }

    #[test]
    fn struct_fields_match_case_insensitively() {
        #[derive(Deserialize, Debug, PartialEq)]
        #[allow(non_snake_case)]
        struct Log {
            Dir: String,
            Level: String,
        }
        let log: Log = from_value(&tree(r#"{"dir": "./log", "level": "Info"}"#)).unwrap();
        assert_eq!(
            log,
            Log {
                Dir: "./log".into(),
                Level: "Info".into()
            }
        );
    }

    #[test]
    fn upper_case_keys_fill_snake_case_fields() {
        let log: LogConfig = from_value(&tree(r#"{"DIR": "/var/log", "Level": "warn"}"#)).unwrap();
        assert_eq!(log.dir, "/var/log");
        assert_eq!(log.level, "warn");
    }

    #[test]
    fn exact_key_preferred_over_folded() {
        #[derive(Deserialize)]
        struct Pair {
            a: i64,
            #[serde(rename = "A")]
            upper: i64,
        }
        let pair: Pair = from_value(&tree(r#"{"a": 1, "A": 2}"#)).unwrap();
        assert_eq!(pair.a, 1);
        assert_eq!(pair.upper, 2);
    }

    #[test]
    fn exact_key_wins_over_differently_cased_duplicate() {
        let (log, ignored) = from_value_tracking_ignored::<LogConfig>(&tree(
            r#"{"dir": "a", "Dir": "b", "level": "x"}"#,
        ))
        .unwrap();
        assert_eq!(log.dir, "a");
        assert_eq!(log.level, "x");
        assert_eq!(ignored, vec!["Dir".to_string()]);
    }

    #[test]
    fn first_folded_key_wins_without_exact_match() {
        let log: LogConfig =
            from_value(&tree(r#"{"DIR": "upper", "Dir": "title", "level": "x"}"#)).unwrap();
        assert_eq!(log.dir, "upper");
    }

    #[test]
    fn duration_from_float_nanos() {
        #[derive(Deserialize)]
        struct App {
            timeout: Duration,
        }
        let app: App = from_value(&tree(r#"{"timeout": 2000000000.0}"#)).unwrap();
        assert_eq!(app.timeout, Duration::from_secs(2));
    }

    #[test]
    fn duration_from_string_and_nanos() {
        #[derive(Deserialize)]
        struct Timeouts {
            read: Duration,
            write: Duration,
            idle: Option<Duration>,
        }
        let t: Timeouts =
            from_value(&tree(r#"{"read": "2s", "write": 1500000000, "idle": "1m"}"#)).unwrap();
        assert_eq!(t.read, Duration::from_secs(2));
        assert_eq!(t.write, Duration::from_millis(1500));
        assert_eq!(t.idle, Some(Duration::from_secs(60)));
    }

    #[test]
    fn bad_duration_string_is_an_error() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Timeouts {
            read: Duration,
        }
        let err = from_value::<Timeouts>(&tree(r#"{"read": "soon"}"#)).unwrap_err();
        assert_eq!(err.location().as_deref(), Some("read"));
    }

    #[test]
    fn type_mismatch_reports_nested_location() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Http {
            port: u16,
        }
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Server {
            http: Http,
        }
        let err = from_value::<Server>(&tree(r#"{"http": {"port": "eighty"}}"#)).unwrap_err();
        assert_eq!(err.location().as_deref(), Some("http.port"));
    }

    #[test]
    fn scalar_into_struct_is_an_error() {
        assert!(from_value::<LogConfig>(&Value::from("flat")).is_err());
    }

    #[test]
    fn integer_out_of_range_is_an_error() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Port {
            port: u16,
        }
        assert!(from_value::<Port>(&tree(r#"{"port": 70000}"#)).is_err());
    }

    #[test]
    fn null_decodes_as_empty_struct_with_defaults() {
        #[derive(Deserialize, Default, Debug, PartialEq)]
        #[serde(default)]
        struct Opt {
            name: String,
            retries: u32,
        }
        let (out, _) = from_optional_tracking_ignored::<Opt>(None).unwrap();
        assert_eq!(out, Opt::default());
    }

    #[test]
    fn null_into_required_fields_reports_missing_field() {
        let err = from_optional_tracking_ignored::<LogConfig>(None).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn sequences_and_maps() {
        let endpoints: Vec<String> =
            from_value(&Value::from(vec!["127.0.0.1:2379", "127.0.0.1:2479"])).unwrap();
        assert_eq!(endpoints.len(), 2);

        let provinces: HashMap<String, Vec<String>> =
            from_value(&tree(r#"{"Hubei": ["Wuhan", "Tianmen"], "Guangdong": ["Guangzhou"]}"#))
                .unwrap();
        assert_eq!(provinces["Hubei"], vec!["Wuhan", "Tianmen"]);
    }

    #[test]
    fn sequence_element_error_reports_index() {
        let err = from_value::<Vec<u8>>(&Value::from(vec![1i64, 2, 300])).unwrap_err();
        assert_eq!(err.location().as_deref(), Some("2"));
    }

    #[test]
    fn enums_from_strings_and_single_key_maps() {
        #[derive(Deserialize, Debug, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum Mode {
            Fast,
            Limited(u32),
        }
        assert_eq!(from_value::<Mode>(&Value::from("fast")).unwrap(), Mode::Fast);
        assert_eq!(
            from_value::<Mode>(&tree(r#"{"limited": 5}"#)).unwrap(),
            Mode::Limited(5)
        );
    }

    #[test]
    fn tracking_reports_ignored_keys() {
        let (log, ignored) = from_value_tracking_ignored::<LogConfig>(&tree(
            r#"{"dir": "./log", "level": "Info", "colour": "red"}"#,
        ))
        .unwrap();
        assert_eq!(log.dir, "./log");
        assert_eq!(ignored, vec!["colour".to_string()]);
    }

    #[test]
    fn floats_accept_integers() {
        #[derive(Deserialize)]
        struct Coord {
            longitude: f64,
        }
        let c: Coord = from_value(&tree(r#"{"longitude": 64}"#)).unwrap();
        assert_eq!(c.longitude, 64.0);
    }
}
