// Response normalization
//
// The webhook gives no guarantee about its output shape. These helpers turn
// whatever value we pulled out of the body into a plain string.

use serde_json::Value;

/// Convert a raw webhook value into the refined text
///
/// Non-string values use their JSON text (`123` -> `"123"`). A string wrapped
/// in one layer of double quotes is decoded as a JSON string literal, which
/// undoes providers that double-encode their output. Never fails: anything
/// that does not decode is returned unchanged.
pub fn normalize_output(raw: &Value) -> String {
    match raw {
        Value::String(s) => normalize_str(s),
        other => other.to_string(),
    }
}

fn normalize_str(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        if let Ok(decoded) = serde_json::from_str::<String>(value) {
            return decoded;
        }
    }
    value.to_string()
}

/// Depth-first search for the first string with non-whitespace content
///
/// Arrays are walked in order and objects in key order as they appeared in
/// the source document. Returns the string untrimmed.
pub fn find_first_non_empty_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.as_str()),
        Value::Array(items) => items.iter().find_map(find_first_non_empty_string),
        Value::Object(map) => map.values().find_map(find_first_non_empty_string),
        _ => None,
    }
}

/// True for `None`, the empty string, or whitespace only
pub fn is_empty(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub fn safe_trim(value: Option<&str>) -> &str {
    value.map_or("", str::trim)
}
