//! Text generation error types and retry classification.

/// Specific error conditions raised by a text generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// API key not found in environment
    #[display("QUILL_API_KEY environment variable not set")]
    MissingApiKey,
    /// Failed to construct the HTTP client
    #[display("Failed to create generation client: {}", _0)]
    ClientCreation(String),
    /// Request could not be delivered
    #[display("Generation request failed: {}", _0)]
    Transport(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    HttpError {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Request exceeded its deadline
    #[display("Generation timed out after {}s", _0)]
    Timeout(u64),
    /// Backend answered without any text
    #[display("Generation returned no content")]
    EmptyResponse,
    /// Backend refused the request for a non-transient reason
    #[display("Generation rejected: {}", _0)]
    Rejected(String),
}

impl GenerationErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationErrorKind::HttpError { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            GenerationErrorKind::Transport(_) => true,
            GenerationErrorKind::Timeout(_) => true,
            GenerationErrorKind::EmptyResponse => true,
            _ => false,
        }
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use quill_error::{GenerationError, GenerationErrorKind, RetryableError};
///
/// let err = GenerationError::new(GenerationErrorKind::HttpError {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(err.is_retryable());
///
/// let err = GenerationError::new(GenerationErrorKind::MissingApiKey);
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Transient failures (rate limits, overloaded servers, dropped connections)
/// return true. Permanent failures (bad credentials, malformed requests)
/// return false and go straight to the caller's fallback.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
