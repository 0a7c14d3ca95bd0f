// Retry with exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Upper bound on the random jitter added to each backoff delay
pub const DEFAULT_MAX_JITTER_MS: u64 = 300;

/// Backoff delay in milliseconds: `base * 2^attempt + round(rand * max_jitter)`
pub fn calculate_backoff_delay(attempt: u32, base_delay_ms: u64, max_jitter_ms: u64) -> u64 {
    let sample: f64 = rand::thread_rng().gen();
    backoff_delay_from_sample(attempt, base_delay_ms, max_jitter_ms, sample)
}

/// Same as [`calculate_backoff_delay`] with the random draw supplied by the caller
///
/// `sample` is expected in `[0, 1)`; values outside are clamped.
pub fn backoff_delay_from_sample(
    attempt: u32,
    base_delay_ms: u64,
    max_jitter_ms: u64,
    sample: f64,
) -> u64 {
    let exponential = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    let jitter = (sample.clamp(0.0, 1.0) * max_jitter_ms as f64).round() as u64;
    exponential.saturating_add(jitter)
}

/// Retry loop parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
        }
    }
}

/// Run `op` until it succeeds or the retry budget is spent
///
/// The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(options: &RetryOptions, op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(options, |_, _| true, op).await
}

/// Like [`with_retry`], but stops early when `should_retry(&err, attempt)` is false
///
/// `op` receives the zero-based attempt number. Backoff sleeps hold no locks
/// and are not interrupted.
pub async fn with_retry_if<T, E, F, Fut, P>(
    options: &RetryOptions,
    mut should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E, u32) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= options.max_retries || !should_retry(&e, attempt) {
                    return Err(e);
                }

                let delay_ms =
                    calculate_backoff_delay(attempt, options.base_delay_ms, options.max_jitter_ms);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = options.max_retries.saturating_add(1),
                    delay_ms,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}
