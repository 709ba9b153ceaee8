//! Research output consumed by later phases.

use crate::PlannedChapter;
use serde::{Deserialize, Serialize};

/// Planning data produced by the research phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningData {
    /// The story idea as given
    pub idea: String,
    /// Planner analysis, opaque to the engine
    pub analysis: serde_json::Value,
    /// Writer's free-text outline
    pub outline: String,
    /// Planned chapters, variable length
    pub planned_chapters: Vec<PlannedChapter>,
    /// Target story length for the creation phase
    pub target_length: usize,
}

impl PlanningData {
    /// Serialized planning data cut to at most `max_chars` characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::PlanningData;
    ///
    /// let data = PlanningData { idea: "a lighthouse keeper".into(), ..Default::default() };
    /// assert!(data.preview(10).chars().count() <= 10);
    /// ```
    pub fn preview(&self, max_chars: usize) -> String {
        serde_json::to_string(self)
            .unwrap_or_default()
            .chars()
            .take(max_chars)
            .collect()
    }
}
