//! Review records.

use crate::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One reviewer's result for one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerFeedback {
    /// Reviewer role
    pub role: Role,
    /// Normalized score in `[0, 100]`, `None` when the feedback had no usable score
    pub score: Option<f64>,
    /// Error message when the reviewer call failed
    pub error: Option<String>,
    /// Feedback as returned (parsed JSON, or the raw text as a string)
    pub raw: serde_json::Value,
}

/// What the aggregator decided after a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Average met the threshold
    Accepted,
    /// Below threshold with budget left; a revision pass follows
    Revise,
    /// Below threshold but no further revision is allowed
    AcceptedAsIs {
        /// Why revision stopped
        reason: String,
    },
}

/// Aggregated result of one review round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Chapter under review, `None` for whole-story reviews
    pub chapter_id: Option<String>,
    /// 1-based round number
    pub round: u32,
    /// Normalized score per reviewer that produced one
    pub per_reviewer_scores: BTreeMap<Role, f64>,
    /// Mean of valid scores, 0 when none
    pub average_score: f64,
    /// Number of scores that went into the mean
    pub valid_score_count: usize,
    /// Feedback as returned, per reviewer
    pub raw_feedback: BTreeMap<Role, serde_json::Value>,
    /// Error messages of failed reviewers
    pub errors: BTreeMap<Role, String>,
    /// Decision taken after this round
    pub outcome: ReviewOutcome,
    /// When the round completed
    pub created_at: DateTime<Utc>,
}
