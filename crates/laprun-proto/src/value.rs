//! Permissive accessors over loosely-typed JSON payloads.
//!
//! Exported sessions are produced by an external simulation and are not
//! schema-checked. Every accessor here accepts a list of alias keys and
//! tolerates numbers encoded as strings, booleans encoded as numbers, and
//! missing fields. Nothing in this module panics or errors.

use serde_json::Value;

/// Returns the first present, non-null field among `keys`.
pub fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|field| !field.is_null())
}

/// Coerces a JSON scalar into a finite `f64`.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Coerces a JSON scalar into an `i64`, truncating fractional values.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|v| v as i64)),
        other => as_f64(other).map(|v| v as i64),
    }
}

/// Coerces a JSON scalar into a string. Numbers are rendered, null is absent.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerces a JSON scalar into a boolean (`"true"`, `"yes"`, non-zero numbers).
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn f64_field(value: &Value, keys: &[&str]) -> Option<f64> {
    field(value, keys).and_then(as_f64)
}

pub fn i64_field(value: &Value, keys: &[&str]) -> Option<i64> {
    field(value, keys).and_then(as_i64)
}

pub fn bool_field(value: &Value, keys: &[&str]) -> Option<bool> {
    field(value, keys).and_then(as_bool)
}

pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys).and_then(as_string)
}

/// Reads a string field, falling back to the empty string.
pub fn text_field(value: &Value, keys: &[&str]) -> String {
    string_field(value, keys).unwrap_or_default()
}

/// Reads a list of strings. A single scalar is treated as a one-element list.
pub fn string_list(value: &Value, keys: &[&str]) -> Vec<String> {
    match field(value, keys) {
        Some(Value::Array(items)) => items.iter().filter_map(as_string).collect(),
        Some(other) => as_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Reads an array field, falling back to an empty slice.
pub fn array_field<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    field(value, keys)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Reads a signed unit direction.
///
/// Accepts `+1`/`-1`, `"forward"`/`"backward"`, `"cw"`/`"ccw"` and
/// `"clockwise"`/`"counterclockwise"`. Zero and unknown text are absent.
pub fn sign_field(value: &Value, keys: &[&str]) -> Option<i8> {
    match field(value, keys)? {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" | "cw" | "clockwise" | "+1" | "1" => Some(1),
            "backward" | "back" | "reverse" | "ccw" | "counterclockwise" | "-1" => Some(-1),
            _ => None,
        },
        other => as_f64(other).and_then(|v| {
            if v > 0.0 {
                Some(1)
            } else if v < 0.0 {
                Some(-1)
            } else {
                None
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_skips_null_aliases() {
        let value = json!({"a": null, "b": 4});
        assert_eq!(f64_field(&value, &["a", "b"]), Some(4.0));
    }

    #[test]
    fn test_numbers_encoded_as_strings() {
        let value = json!({"hp": " 5 ", "pos": "7.5"});
        assert_eq!(i64_field(&value, &["hp"]), Some(5));
        assert_eq!(f64_field(&value, &["pos"]), Some(7.5));
    }

    #[test]
    fn test_wrong_types_are_absent() {
        let value = json!({"hp": [1, 2], "name": {"x": 1}});
        assert_eq!(i64_field(&value, &["hp"]), None);
        assert_eq!(text_field(&value, &["name"]), "");
    }

    #[test]
    fn test_string_list_accepts_scalar() {
        let value = json!({"targets": "bob", "many": ["a", 2, null]});
        assert_eq!(string_list(&value, &["targets"]), vec!["bob".to_string()]);
        assert_eq!(string_list(&value, &["many"]), vec!["a".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_sign_field_variants() {
        let value = json!({"a": "backward", "b": -3, "c": 0, "d": "CW", "e": "sideways"});
        assert_eq!(sign_field(&value, &["a"]), Some(-1));
        assert_eq!(sign_field(&value, &["b"]), Some(-1));
        assert_eq!(sign_field(&value, &["c"]), None);
        assert_eq!(sign_field(&value, &["d"]), Some(1));
        assert_eq!(sign_field(&value, &["e"]), None);
    }

    #[test]
    fn test_bool_coercion() {
        let value = json!({"a": "yes", "b": 0, "c": "maybe"});
        assert_eq!(bool_field(&value, &["a"]), Some(true));
        assert_eq!(bool_field(&value, &["b"]), Some(false));
        assert_eq!(bool_field(&value, &["c"]), None);
    }
}
