// Input validation and message sanitizing

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{RefinerError, Result};

/// Longest prompt accepted, in characters
pub const MAX_PROMPT_LENGTH: usize = 100_000;

const MAX_MESSAGE_LENGTH: usize = 500;

static URL_CREDENTIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://[^:/\s]+:[^@\s]+@").expect("valid credentials regex"));

/// Trim a prompt and reject it if empty or oversized
pub fn validate_prompt(prompt: &str) -> Result<String> {
    let trimmed = prompt.trim();

    if trimmed.is_empty() {
        return Err(RefinerError::empty_prompt("Prompt cannot be empty"));
    }

    if trimmed.chars().count() > MAX_PROMPT_LENGTH {
        return Err(RefinerError::empty_prompt(format!(
            "Prompt exceeds maximum length of {} characters",
            MAX_PROMPT_LENGTH
        )));
    }

    Ok(trimmed.to_string())
}

/// True if `url` parses and uses http or https
pub fn validate_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Redact URL credentials and cap the length of a message meant for display
pub fn sanitize_error_message(message: &str) -> String {
    let redacted = URL_CREDENTIALS.replace_all(message, "https://***:***@");

    if redacted.chars().count() > MAX_MESSAGE_LENGTH {
        let truncated: String = redacted.chars().take(MAX_MESSAGE_LENGTH).collect();
        format!("{}...", truncated)
    } else {
        redacted.into_owned()
    }
}
