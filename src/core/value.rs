use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Raw field mapping of one record as it sits in the store.
pub type Fields = Map<String, Value>;

/// Read an integer rank from a JSON value.
///
/// Floats are accepted when finite and within `i64` range (the store keeps
/// numbers as doubles); anything else is treated as absent.
pub fn as_rank(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Some(f as i64)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Ranks compare numerically; an absent rank is greater than any number (absent last).
pub fn compare_ranks(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

pub fn text_field<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}
