//! Chapter decision and planning records.

use serde::{Deserialize, Serialize};

/// Whether to close the current chapter, and what to call it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDecision {
    /// Close the current chapter
    pub should_end: bool,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Why
    pub reasoning: String,
    /// Title for the chapter just produced
    pub suggested_title: String,
    /// Direction for the next chapter
    pub next_hint: String,
}

/// One entry of a chapter outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedChapter {
    /// 1-based chapter number
    #[serde(default)]
    pub number: u32,
    /// Working title
    #[serde(default)]
    pub title: String,
    /// What happens
    #[serde(default)]
    pub summary: String,
    /// Key beats
    #[serde(default)]
    pub key_events: Vec<String>,
}

/// Holistic judgment about whether the story should keep going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressAssessment {
    /// Estimated fraction of the story completed, in `[0, 1]`
    pub progress_ratio: f64,
    /// Chapters still expected
    pub estimated_remaining: u32,
    /// Keep generating
    pub is_continuing: bool,
    /// Human-readable summary
    pub summary: String,
}
