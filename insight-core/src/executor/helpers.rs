//! Evaluation helper functions shared by the executor stages.
//!
//! This module contains:
//! - get_field: Resolve a query field name against a record
//! - compare_values: Ordering used by ORDER
//! - value_key: Hashable identity of a scalar value
//! - number_from_f64 / round_to_cents: numeric output helpers

use std::cmp::Ordering;

use serde_json::Value;

use crate::schema::strip_prefix;

/// Resolve a field name against a record.
///
/// The name exactly as written is tried first (prefix-tagged records and
/// synthetic apply fields), then the stripped attribute name (`avg` for
/// `sections_avg`) for records stored without their dataset prefix.
#[inline]
pub fn get_field<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    let obj = record.as_object()?;
    obj.get(field).or_else(|| obj.get(strip_prefix(field)))
}

/// Numeric value of a field, if present and numeric.
#[inline]
pub fn get_number(record: &Value, field: &str) -> Option<f64> {
    get_field(record, field).and_then(Value::as_f64)
}

/// String value of a field, if present and a string.
#[inline]
pub fn get_str<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    get_field(record, field).and_then(Value::as_str)
}

/// Compare two optional scalar values for sorting.
///
/// Ordering rules:
/// - missing < number < string < anything else
/// - numbers compare numerically, strings lexicographically by byte
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Type-tagged identity of a value, usable as a hash key.
///
/// Numbers are keyed by their f64 value so `85` and `85.0` are the same
/// value; a string `"85"` stays distinct from the number.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("n:{}", n.as_f64().unwrap_or(0.0)),
        Value::String(s) => format!("s:{}", s),
        other => format!("j:{}", other),
    }
}

/// Create a serde_json::Number from an f64 value.
#[inline]
pub fn number_from_f64(n: f64) -> serde_json::Number {
    serde_json::Number::from_f64(n).unwrap_or_else(|| serde_json::Number::from(0))
}

/// Round to two decimal places, halves away from zero.
///
/// Values at or above 2^52 in magnitude are already integral and are
/// returned unchanged, as are non-finite values.
#[inline]
pub fn round_to_cents(n: f64) -> f64 {
    const INTEGRAL_FROM: f64 = 4_503_599_627_370_496.0;
    if !n.is_finite() || n.abs() >= INTEGRAL_FROM {
        return n;
    }
    (n * 100.0).round() / 100.0
}
