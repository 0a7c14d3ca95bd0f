// Shared helpers: response normalization, retry/backoff, input validation

pub mod normalize;
pub mod retry;
pub mod validation;

pub use normalize::{find_first_non_empty_string, is_empty, normalize_output, safe_trim};
pub use retry::{
    backoff_delay_from_sample, calculate_backoff_delay, with_retry, with_retry_if, RetryOptions,
    DEFAULT_MAX_JITTER_MS,
};
pub use validation::{sanitize_error_message, validate_prompt, validate_url, MAX_PROMPT_LENGTH};
