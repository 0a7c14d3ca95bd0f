// Webhook response interpretation

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::{ErrorKind, RefinerError, Result};
use crate::utils::{find_first_non_empty_string, normalize_output};

/// Fields checked for the refined text, highest priority first
pub const OUTPUT_FIELDS: [&str; 4] = ["output", "refined", "text", "content"];

static RATE_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rate limit").expect("valid rate limit regex"));

/// HTTP 429, or a body that mentions a rate limit
pub fn is_rate_limited(status: u16, body: &str) -> bool {
    status == 429 || RATE_LIMIT.is_match(body)
}

/// Pull the refined prompt out of a raw response body
///
/// Accepts an object or an array whose first element is the object. Known
/// fields win; otherwise the first non-blank string anywhere in the document
/// is used.
pub fn extract_refined_prompt(body: &str) -> Result<String> {
    // An empty body is EmptyResponse, not a parse failure
    if body.is_empty() {
        return Err(RefinerError::new(
            ErrorKind::EmptyResponse,
            "Empty response from webhook",
        ));
    }

    let data: Value = serde_json::from_str(body).map_err(|e| {
        RefinerError::with_source(
            ErrorKind::InvalidResponse,
            "Invalid JSON response from webhook",
            e,
        )
    })?;

    let response = match &data {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
    .filter(|value| !is_falsy(value))
    .ok_or_else(|| RefinerError::invalid_response("Invalid response structure from webhook"))?;

    let known = OUTPUT_FIELDS
        .iter()
        .find_map(|field| response.get(*field).filter(|value| !value.is_null()));

    let raw = match known {
        Some(value) if !is_falsy(value) => value.clone(),
        _ => find_first_non_empty_string(response)
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| RefinerError::invalid_response("No usable output field in response"))?,
    };

    let refined = normalize_output(&raw);
    if refined.trim().is_empty() {
        return Err(RefinerError::new(
            ErrorKind::EmptyResponse,
            "Refined prompt is empty",
        ));
    }

    Ok(refined)
}

/// null, false, 0 and "" carry nothing usable
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
