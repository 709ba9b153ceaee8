//! Story state store error types.

/// Specific error conditions for story and chapter mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// A story with this id already exists
    #[display("Story already exists: {}", _0)]
    StoryExists(String),
    /// No story with this id
    #[display("Story not found: {}", _0)]
    StoryNotFound(String),
    /// No chapter with this id
    #[display("Chapter not found: {}", _0)]
    ChapterNotFound(String),
    /// Requested status change is not part of the chapter lifecycle
    #[display("Invalid chapter transition from {} to {}", from, to)]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },
    /// Chapter has used up its revision rounds
    #[display("Chapter {} exhausted {} revision rounds", chapter_id, max_rounds)]
    RevisionLimit {
        /// Chapter id
        chapter_id: String,
        /// Configured maximum
        max_rounds: u32,
    },
}

/// Error type for story state operations.
///
/// # Examples
///
/// ```
/// use quill_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::ChapterNotFound("tale_chapter_9".into()));
/// assert!(format!("{}", err).contains("tale_chapter_9"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The specific error condition
    pub kind: StoreErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StoreError {
    /// Create a new StoreError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
