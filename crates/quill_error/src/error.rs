//! Top-level error wrapper types.

use crate::{
    ConfigError, GenerationError, IoError, JsonError, ParseError, RetryableError, StoreError,
    WorkflowError,
};

/// All error domains of the Quill workspace.
///
/// # Examples
///
/// ```
/// use quill_error::{ConfigError, QuillError};
///
/// let err: QuillError = ConfigError::new("bad threshold").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum QuillErrorKind {
    /// Text generation backend error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Structured response parse error
    #[from(ParseError)]
    Parse(ParseError),
    /// Story state error
    #[from(StoreError)]
    Store(StoreError),
    /// Workflow orchestration error
    #[from(WorkflowError)]
    Workflow(WorkflowError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Filesystem error
    #[from(IoError)]
    Io(IoError),
}

/// Quill error with kind discrimination.
///
/// # Examples
///
/// ```
/// use quill_error::{QuillResult, StoreError, StoreErrorKind};
///
/// fn might_fail() -> QuillResult<()> {
///     Err(StoreError::new(StoreErrorKind::StoryNotFound("tale".into())))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Quill Error: {}", _0)]
pub struct QuillError(Box<QuillErrorKind>);

impl QuillError {
    /// Create a new error from a kind.
    pub fn new(kind: QuillErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &QuillErrorKind {
        &self.0
    }
}

impl RetryableError for QuillError {
    fn is_retryable(&self) -> bool {
        match self.kind() {
            QuillErrorKind::Generation(e) => e.is_retryable(),
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to QuillErrorKind
impl<T> From<T> for QuillError
where
    T: Into<QuillErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Quill operations.
pub type QuillResult<T> = std::result::Result<T, QuillError>;
