//! Types exchanged with collaborators.

use serde::{Deserialize, Serialize};

/// Phases of the story workflow.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// Idea analysis and planning
    Research,
    /// Dynamic chapter generation
    Creation,
    /// Multi-reviewer scoring and revision
    Review,
    /// Consistency and structure checks, finalization
    FinalCheck,
    /// Completed successfully
    Done,
    /// Stopped by the user or a fatal error
    Aborted,
}

impl Phase {
    /// The phase that follows this one on the success path.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_interface::Phase;
    ///
    /// assert_eq!(Phase::Research.next(), Some(Phase::Creation));
    /// assert_eq!(Phase::FinalCheck.next(), Some(Phase::Done));
    /// assert_eq!(Phase::Done.next(), None);
    /// ```
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Research => Some(Phase::Creation),
            Phase::Creation => Some(Phase::Review),
            Phase::Review => Some(Phase::FinalCheck),
            Phase::FinalCheck => Some(Phase::Done),
            Phase::Done | Phase::Aborted => None,
        }
    }

    /// Whether the workflow stops in this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Aborted)
    }
}

/// Answer given at a pause point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum PauseDecision {
    /// Proceed to the next phase
    #[display("continue")]
    Continue,
    /// Run the phase that just finished again
    #[display("regenerate")]
    Regenerate,
    /// Stop and return partial results
    #[display("exit")]
    Exit,
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Phase emitting the event
    pub phase: Phase,
    /// Step within the phase
    pub step: String,
    /// Human-readable message
    pub message: String,
    /// Fraction complete in `[0, 1]`, when known
    pub progress: Option<f64>,
}

impl ProgressEvent {
    /// Create an event, clamping `progress` into `[0, 1]`.
    pub fn new(
        phase: Phase,
        step: impl Into<String>,
        message: impl Into<String>,
        progress: Option<f64>,
    ) -> Self {
        Self {
            phase,
            step: step.into(),
            message: message.into(),
            progress: progress.map(|p| p.clamp(0.0, 1.0)),
        }
    }
}
