//! Workflow orchestration error types.

/// Specific error conditions that stop a workflow phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum WorkflowErrorKind {
    /// No text generator is registered for any role
    #[display("No text generator configured")]
    NoGenerator,
    /// A role the phase cannot run without has no handler
    #[display("Required role handler missing: {}", _0)]
    MissingHandler(String),
    /// Writer kept failing after all retries
    #[display("Writer failed at step {}: {}", step, message)]
    WriterExhausted {
        /// Creation step that failed
        step: u32,
        /// Last error message
        message: String,
    },
    /// Pause controller could not deliver a decision
    #[display("Pause controller failed: {}", _0)]
    PauseFailed(String),
    /// Operation requires a story that has not been created
    #[display("No story has been started")]
    NoStory,
}

/// Error type for workflow orchestration.
///
/// # Examples
///
/// ```
/// use quill_error::{WorkflowError, WorkflowErrorKind};
///
/// let err = WorkflowError::new(WorkflowErrorKind::MissingHandler("writer".into()));
/// assert!(format!("{}", err).contains("writer"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Workflow Error: {} at line {} in {}", kind, line, file)]
pub struct WorkflowError {
    /// The specific error condition
    pub kind: WorkflowErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl WorkflowError {
    /// Create a new WorkflowError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WorkflowErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
