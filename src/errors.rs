// Typed refinement errors
//
// Every failure in the webhook client, the daemon client and the service is a
// RefinerError tagged with one ErrorKind. Presentation helpers at the bottom
// are for the outermost caller (the CLI) only.

use std::error::Error as StdError;
use std::fmt;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, RefinerError>;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The fixed set of failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Prompt was empty, whitespace-only or otherwise rejected before sending
    EmptyPrompt,
    /// A request timer expired or the call was cancelled
    Timeout,
    /// The webhook kept answering with 429 / "rate limit"
    RateLimited,
    /// The webhook answered with a non-2xx status
    WebhookError,
    /// The body could not be parsed or carried no usable field
    InvalidResponse,
    /// The extracted result was empty
    EmptyResponse,
    /// Transport failure after the retry budget was spent
    NetworkError,
    /// The daemon reported an error or could not be reached
    DaemonError,
}

impl ErrorKind {
    /// Stable upper-snake code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::EmptyPrompt => "EMPTY_PROMPT",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::WebhookError => "WEBHOOK_ERROR",
            ErrorKind::InvalidResponse => "INVALID_RESPONSE",
            ErrorKind::EmptyResponse => "EMPTY_RESPONSE",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::DaemonError => "DAEMON_ERROR",
        }
    }

    /// Whether the webhook retry loop may try again after this kind
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::NetworkError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by every refinement operation
///
/// Immutable once built: the kind, the human-readable message and the
/// optional underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RefinerError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl RefinerError {
    /// Create an error with no underlying cause
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error wrapping an underlying cause
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn empty_prompt(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyPrompt, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    pub fn daemon(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DaemonError, message)
    }
}

/// Attach a suggestion to an error for terminal output
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33mSuggestion:\x1b[0m {}",
        error, suggestion
    )
}

/// Hint shown by the CLI for a failed refinement, if one applies
pub fn suggestion_for(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::Timeout => Some("Raise REFINER_TIMEOUT_MS or pass --timeout-ms"),
        ErrorKind::RateLimited => Some("Wait a moment, or raise REFINER_MAX_RETRIES"),
        ErrorKind::NetworkError => Some("Check that REFINER_WEBHOOK_URL points at a reachable webhook"),
        ErrorKind::DaemonError => Some(
            "Start the daemon with `prompt-refiner daemon`, or run without --daemon",
        ),
        _ => None,
    }
}
