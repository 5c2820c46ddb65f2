//! Best-effort coercions from an untyped [`Value`] into concrete types.
//!
//! Every function here is strict: it returns a [`CastError`] when the value
//! cannot be represented as the target. The lenient `get_*` accessors on
//! [`Config`](crate::Config) turn those errors into zero values; the
//! `try_get_*` accessors surface them.
//!
//! Collection coercions work element-wise and drop elements that do not
//! convert instead of failing the whole call.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::value::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct CastError {
    pub from: &'static str,
    pub to: &'static str,
    pub detail: Option<String>,
}

impl CastError {
    fn new(value: &Value, to: &'static str) -> Self {
        CastError {
            from: value.type_name(),
            to,
            detail: None,
        }
    }

    fn with_detail(value: &Value, to: &'static str, detail: impl Into<String>) -> Self {
        CastError {
            from: value.type_name(),
            to,
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot convert {} to {}", self.from, self.to)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CastError {}

pub fn to_string(value: &Value) -> Result<String, CastError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Seq(_) | Value::Map(_) => Err(CastError::new(value, "string")),
    }
}

pub fn to_bool(value: &Value) -> Result<bool, CastError> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Float(f) => Ok(*f != 0.0),
        Value::String(s) => match s.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            other => Err(CastError::with_detail(
                value,
                "bool",
                format!("invalid syntax {other:?}"),
            )),
        },
        Value::Seq(_) | Value::Map(_) => Err(CastError::new(value, "bool")),
    }
}

pub fn to_i64(value: &Value) -> Result<i64, CastError> {
    match value {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(*i),
        Value::Float(f) => {
            if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                Ok(f.trunc() as i64)
            } else {
                Err(CastError::with_detail(value, "integer", "out of range"))
            }
        }
        Value::String(s) => parse_int(s).ok_or_else(|| {
            CastError::with_detail(value, "integer", format!("invalid syntax {s:?}"))
        }),
        Value::Seq(_) | Value::Map(_) => Err(CastError::new(value, "integer")),
    }
}

pub fn to_i32(value: &Value) -> Result<i32, CastError> {
    let wide = to_i64(value)?;
    i32::try_from(wide).map_err(|_| CastError::with_detail(value, "int", "out of range"))
}

pub fn to_f64(value: &Value) -> Result<f64, CastError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CastError::with_detail(value, "float", e.to_string())),
        Value::Seq(_) | Value::Map(_) => Err(CastError::new(value, "float")),
    }
}

/// Strings are tried against RFC 3339 and a set of common layouts; integers
/// are Unix seconds. Layouts without an offset are read as UTC.
pub fn to_time(value: &Value) -> Result<DateTime<FixedOffset>, CastError> {
    match value {
        Value::String(s) => parse_time(s).ok_or_else(|| {
            CastError::with_detail(value, "time", format!("unrecognised layout {s:?}"))
        }),
        Value::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| CastError::with_detail(value, "time", "out of range")),
        _ => Err(CastError::new(value, "time")),
    }
}

/// Integers and floats are nanoseconds. Strings carrying a unit are parsed as
/// durations (`"2s"`, `"1h30m"`, `"1.5ms"`); bare numeric strings are
/// nanoseconds.
pub fn to_duration(value: &Value) -> Result<Duration, CastError> {
    match value {
        Value::Int(nanos) => u64::try_from(*nanos)
            .map(Duration::from_nanos)
            .map_err(|_| CastError::with_detail(value, "duration", "negative duration")),
        Value::Float(nanos) => {
            if nanos.is_finite() && *nanos >= 0.0 && *nanos < u64::MAX as f64 {
                Ok(Duration::from_nanos(nanos.trunc() as u64))
            } else {
                Err(CastError::with_detail(value, "duration", "out of range"))
            }
        }
        Value::String(s) => {
            let text = s.trim();
            let parsed = if text.contains(['n', 's', 'u', 'µ', 'μ', 'm', 'h']) {
                parse_duration(text)
            } else {
                parse_duration(&format!("{text}ns"))
            };
            parsed.map_err(|reason| CastError::with_detail(value, "duration", reason))
        }
        _ => Err(CastError::new(value, "duration")),
    }
}

/// Sequences convert element-wise; a string splits on whitespace.
pub fn to_string_vec(value: &Value) -> Result<Vec<String>, CastError> {
    match value {
        Value::Seq(items) => Ok(items.iter().filter_map(|v| to_string(v).ok()).collect()),
        Value::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
        _ => Err(CastError::new(value, "string sequence")),
    }
}

pub fn to_vec(value: &Value) -> Result<Vec<Value>, CastError> {
    match value {
        Value::Seq(items) => Ok(items.clone()),
        _ => Err(CastError::new(value, "sequence")),
    }
}

/// Maps are copied out; a string holding a JSON object is parsed.
pub fn to_map(value: &Value) -> Result<Map, CastError> {
    match value {
        Value::Map(map) => Ok(map.clone()),
        Value::String(s) => json_object(value, s),
        _ => Err(CastError::new(value, "map")),
    }
}

pub fn to_string_map(value: &Value) -> Result<BTreeMap<String, String>, CastError> {
    let map = to_map(value)?;
    Ok(map
        .iter()
        .filter_map(|(k, v)| to_string(v).ok().map(|s| (k.clone(), s)))
        .collect())
}

pub fn to_string_vec_map(value: &Value) -> Result<BTreeMap<String, Vec<String>>, CastError> {
    let map = to_map(value)?;
    Ok(map
        .iter()
        .filter_map(|(k, v)| {
            let items = match v {
                Value::Seq(_) => to_string_vec(v).ok()?,
                Value::String(s) => vec![s.clone()],
                other => vec![to_string(other).ok()?],
            };
            Some((k.clone(), items))
        })
        .collect())
}

fn json_object(value: &Value, text: &str) -> Result<Map, CastError> {
    let parsed: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| CastError::with_detail(value, "map", e.to_string()))?;
    match Value::from_json(parsed) {
        Value::Map(map) => Ok(map),
        other => Err(CastError::with_detail(
            value,
            "map",
            format!("JSON text holds a {}", other.type_name()),
        )),
    }
}

/// Parse an integer with optional sign and `0x`/`0o`/`0b` radix prefix.
fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d)
    } else {
        (10, lower.as_str())
    };

    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).ok()
}

fn parse_time(text: &str) -> Option<DateTime<FixedOffset>> {
    const OFFSET_LAYOUTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f %z",
        "%Y-%m-%d %H:%M:%S%.f %:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%a %b %e %H:%M:%S %z %Y",
    ];
    const NAIVE_LAYOUTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%a %b %e %H:%M:%S %Y",
    ];
    const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%Y/%m/%d"];

    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt);
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc().fixed_offset());
        }
    }
    None
}

/// Parse a duration string made of decimal numbers with unit suffixes,
/// e.g. `"300ms"`, `"1.5h"`, `"2h45m"`. A bare `"0"` is accepted.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let original = text;
    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration {original:?}"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_frac) = match after_int.strip_prefix('.') {
            Some(r) => {
                let frac_len = r.bytes().take_while(u8::is_ascii_digit).count();
                r.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("invalid duration {original:?}"));
        }

        let unit_len = after_frac
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map_or(after_frac.len(), |(i, _)| i);
        let (unit, tail) = after_frac.split_at(unit_len);
        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => return Err(format!("missing unit in duration {original:?}")),
            other => return Err(format!("unknown unit {other:?} in duration {original:?}")),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| format!("invalid duration {original:?}"))?
        };
        let mut component = whole
            .checked_mul(scale)
            .ok_or_else(|| format!("duration {original:?} overflows"))?;

        // Digits past 18 places cannot affect a nanosecond result.
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        if !frac_digits.is_empty() {
            let frac: u128 = frac_digits
                .parse()
                .map_err(|_| format!("invalid duration {original:?}"))?;
            let denom = 10u128.pow(frac_digits.len() as u32);
            component += frac * scale / denom;
        }

        total = total
            .checked_add(component)
            .ok_or_else(|| format!("duration {original:?} overflows"))?;
        rest = tail;
    }

    if negative && total > 0 {
        return Err(format!("negative duration {original:?}"));
    }

    let secs = u64::try_from(total / 1_000_000_000)
        .map_err(|_| format!("duration {original:?} overflows"))?;
    let nanos = (total % 1_000_000_000) as u32;
    Ok(Duration::new(secs, nanos))
}
