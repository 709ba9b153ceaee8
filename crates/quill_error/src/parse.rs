//! Structured response parsing errors.

/// Specific reasons a generated text could not be read as structured data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ParseErrorKind {
    /// No JSON object or array could be located in the text
    #[display("No structured content found")]
    NoStructuredContent,
    /// A candidate was found but is not valid JSON
    #[display("Malformed JSON: {}", _0)]
    Malformed(String),
    /// Valid JSON that does not match the expected shape
    #[display("Schema mismatch: {}", _0)]
    SchemaMismatch(String),
}

/// Parse error carrying a preview of the offending text for diagnostics.
///
/// # Examples
///
/// ```
/// use quill_error::{ParseError, ParseErrorKind};
///
/// let err = ParseError::new(ParseErrorKind::NoStructuredContent, "just prose");
/// assert_eq!(err.raw, "just prose");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Parse Error: {} at line {} in {}", kind, line, file)]
pub struct ParseError {
    /// The specific error condition
    pub kind: ParseErrorKind,
    /// Raw text that failed to parse (truncated)
    pub raw: String,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ParseError {
    /// Longest raw preview kept on the error.
    pub const RAW_PREVIEW_CHARS: usize = 500;

    /// Create a new ParseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ParseErrorKind, raw: &str) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            raw: raw.chars().take(Self::RAW_PREVIEW_CHARS).collect(),
            line: location.line(),
            file: location.file(),
        }
    }
}
