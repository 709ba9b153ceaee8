//! Per-run session log.

use chrono::{DateTime, Utc};
use quill_core::ChapterDecision;
use quill_interface::{PauseDecision, Phase};
use serde::{Deserialize, Serialize};

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A phase started
    PhaseStarted {
        /// Phase entered
        phase: Phase,
    },
    /// A pause point was answered
    Paused {
        /// Phase that just finished
        phase: Phase,
        /// Answer given
        decision: PauseDecision,
    },
    /// One iteration of the creation loop
    CreationStep {
        /// 1-based iteration
        step: u32,
        /// Length of the accumulated content after this step
        content_length: usize,
        /// Chapter created from this step
        chapter_id: String,
        /// Decision taken on the chapter
        decision: ChapterDecision,
        /// Whether the decision came from the heuristic
        decision_fallback: bool,
        /// Continuity issues found in the new chapter
        continuity_issues: usize,
    },
    /// Advisory output from a supporting role
    Advisory {
        /// 1-based iteration, 0 outside the creation loop
        step: u32,
        /// Role that produced it
        role: quill_core::Role,
        /// What it said, possibly truncated
        note: String,
    },
    /// A chapter finished review
    Reviewed {
        /// Chapter id
        chapter_id: String,
        /// Rounds run
        rounds: usize,
        /// Last average score
        score: f64,
    },
}

/// A timestamped [`SessionEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// When it was recorded
    pub at: DateTime<Utc>,
    /// What happened
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Ordered log of a run's events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    entries: Vec<SessionEntry>,
}

impl SessionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current time.
    pub fn record(&mut self, event: SessionEvent) {
        self.entries.push(SessionEntry {
            at: Utc::now(),
            event,
        });
    }

    /// Entries in recording order.
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// Creation steps recorded so far.
    pub fn creation_steps(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.event, SessionEvent::CreationStep { .. }))
            .count()
    }
}
