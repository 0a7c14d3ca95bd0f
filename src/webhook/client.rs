// HTTP client for the refinement webhook

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::response::{extract_refined_prompt, is_rate_limited};
use crate::config::RefinerConfig;
use crate::errors::{ErrorKind, RefinerError, Result};
use crate::utils::{with_retry_if, RetryOptions, DEFAULT_MAX_JITTER_MS};

const POOL_IDLE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    prompt: &'a str,
}

/// Sends prompts to the webhook with timeout, retry and rate-limit handling
///
/// Holds a pooled reqwest client so repeated calls reuse connections. The
/// config is passed per call.
#[derive(Clone)]
pub struct WebhookClient {
    http: Client,
    max_jitter_ms: u64,
}

impl WebhookClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                RefinerError::with_source(
                    ErrorKind::NetworkError,
                    format!("Failed to create HTTP client: {}", e),
                    e,
                )
            })?;

        Ok(Self {
            http,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
        })
    }

    /// Override the random jitter added to each backoff delay
    pub fn with_max_jitter_ms(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    /// Refine `prompt` through the webhook described by `config`
    pub async fn send(&self, prompt: &str, config: &RefinerConfig) -> Result<String> {
        self.send_with_cancel(prompt, config, &CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), aborting the in-flight attempt when `cancel` fires
    ///
    /// Cancellation and the per-attempt timer end the call the same way, with
    /// a `Timeout` error. Neither is retried.
    pub async fn send_with_cancel(
        &self,
        prompt: &str,
        config: &RefinerConfig,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let started = Instant::now();
        let options = RetryOptions {
            max_jitter_ms: self.max_jitter_ms,
            ..config.retry_options()
        };

        let result = with_retry_if(
            &options,
            |e: &RefinerError, _| e.kind().is_retryable(),
            move |attempt| self.send_once(prompt, config, attempt, cancel),
        )
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(elapsed_ms, "Webhook refinement completed"),
            Err(e) if e.kind() == ErrorKind::Timeout => error!(
                elapsed_ms,
                timeout_ms = config.timeout_ms,
                "Webhook request timed out"
            ),
            Err(e) => error!(elapsed_ms, code = e.code(), error = %e, "Webhook refinement failed"),
        }

        result
    }

    async fn send_once(
        &self,
        prompt: &str,
        config: &RefinerConfig,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(RefinerError::timeout("Request cancelled"));
        }

        debug!(
            url = %config.webhook_url,
            attempt = attempt + 1,
            timeout_ms = config.timeout_ms,
            "POST to webhook"
        );

        let (status, body) = self.post(prompt, config, cancel).await?;

        if is_rate_limited(status.as_u16(), &body) {
            let detail = if body.is_empty() {
                status.as_u16().to_string()
            } else {
                body
            };
            return Err(RefinerError::new(
                ErrorKind::RateLimited,
                format!("Rate limited: {}", detail),
            ));
        }

        if !status.is_success() {
            return Err(RefinerError::new(
                ErrorKind::WebhookError,
                format!("Webhook error: {} {}", status.as_u16(), body),
            ));
        }

        extract_refined_prompt(&body)
    }

    /// One POST, bounded by the configured timeout and the cancel token
    async fn post(
        &self,
        prompt: &str,
        config: &RefinerConfig,
        cancel: &CancellationToken,
    ) -> Result<(StatusCode, String)> {
        let request = async {
            let response = self
                .http
                .post(&config.webhook_url)
                .header(CONTENT_TYPE, "application/json")
                .json(&WebhookRequest { prompt })
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(RefinerError::timeout("Request cancelled")),
            outcome = tokio::time::timeout(config.timeout(), request) => match outcome {
                Err(_) => Err(RefinerError::timeout("Request timed out")),
                Ok(Err(e)) if e.is_timeout() => Err(RefinerError::with_source(
                    ErrorKind::Timeout,
                    "Request timed out",
                    e,
                )),
                Ok(Err(e)) => Err(RefinerError::with_source(
                    ErrorKind::NetworkError,
                    format!("Network error: {}", e),
                    e,
                )),
                Ok(Ok(pair)) => Ok(pair),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config_for(url: String, max_retries: u32) -> RefinerConfig {
        RefinerConfig {
            webhook_url: url,
            timeout_ms: 2_000,
            max_retries,
            base_delay_ms: 1,
        }
    }

    fn client() -> WebhookClient {
        WebhookClient::new().unwrap().with_max_jitter_ms(0)
    }

    #[tokio::test]
    async fn test_posts_prompt_as_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/refine")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"prompt": "make it better"})))
            .with_status(200)
            .with_body(r#"{"output":"Make it better, please."}"#)
            .expect(1)
            .create_async()
            .await;

        let config = config_for(format!("{}/refine", server.url()), 3);
        let refined = client().send("make it better", &config).await.unwrap();

        assert_eq!(refined, "Make it better, please.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_after_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/refine")
            .with_status(429)
            .with_body("Too Many Requests")
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/refine")
            .with_status(200)
            .with_body(r#"{"output":"ok"}"#)
            .expect(1)
            .create_async()
            .await;

        let config = config_for(format!("{}/refine", server.url()), 3);
        let refined = client().send("prompt", &config).await.unwrap();

        assert_eq!(refined, "ok");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_on_last_attempt_fails() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/refine")
            .with_status(200)
            .with_body("rate limit exceeded, try later")
            .expect(2)
            .create_async()
            .await;

        let config = config_for(format!("{}/refine", server.url()), 1);
        let err = client().send("prompt", &config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.message().contains("rate limit exceeded"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/refine")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let config = config_for(format!("{}/refine", server.url()), 3);
        let err = client().send("prompt", &config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::WebhookError);
        assert_eq!(err.message(), "Webhook error: 500 boom");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_body_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/refine")
            .with_status(200)
            .with_body("<html>oops</html>")
            .expect(1)
            .create_async()
            .await;

        let config = config_for(format!("{}/refine", server.url()), 3);
        let err = client().send("prompt", &config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_becomes_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let config = config_for(format!("http://127.0.0.1:{}/refine", port), 2);
        let err = client().send("prompt", &config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert!(err.message().starts_with("Network error:"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_dropped_connections_are_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = accepts.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                drop(socket);
            }
        });

        let config = config_for(format!("http://{}/refine", addr), 2);
        let err = client().send("prompt", &config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkError);
        assert_eq!(accepts.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = accepts.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                held.push(socket);
            }
        });

        let config = RefinerConfig {
            timeout_ms: 200,
            ..config_for(format!("http://{}/refine", addr), 3)
        };
        let started = Instant::now();
        let err = client().send("prompt", &config).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "Request timed out");
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(accepts.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts_like_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = RefinerConfig {
            timeout_ms: 10_000,
            ..config_for(format!("http://{}/refine", addr), 3)
        };
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client()
            .send_with_cancel("prompt", &config, &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_already_cancelled_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/refine")
            .with_status(200)
            .with_body(r#"{"output":"ok"}"#)
            .expect(0)
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let config = config_for(format!("{}/refine", server.url()), 3);
        let err = client()
            .send_with_cancel("prompt", &config, &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        mock.assert_async().await;
    }
}
