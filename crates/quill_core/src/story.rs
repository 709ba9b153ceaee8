//! Story records and derived story status.

use crate::{Chapter, ChapterStatus};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Aggregate status of a story, derived from its chapters.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    /// No chapters yet
    #[default]
    #[display("init")]
    Init,
    /// Chapters are being written or reviewed
    #[display("writing")]
    Writing,
    /// At least one chapter is being revised
    #[display("revising")]
    Revising,
    /// Every chapter is approved or final
    #[display("completed")]
    Completed,
}

impl StoryStatus {
    /// Derive the story status from the multiset of chapter statuses.
    ///
    /// The result depends only on which statuses are present, never on order.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::{ChapterStatus, StoryStatus};
    ///
    /// use ChapterStatus::*;
    /// assert_eq!(StoryStatus::derive([Approved, Final]), StoryStatus::Completed);
    /// assert_eq!(StoryStatus::derive([Draft, Revising]), StoryStatus::Revising);
    /// assert_eq!(StoryStatus::derive([Draft, Approved]), StoryStatus::Writing);
    /// assert_eq!(StoryStatus::derive([]), StoryStatus::Init);
    /// ```
    pub fn derive(statuses: impl IntoIterator<Item = ChapterStatus>) -> Self {
        let statuses: Vec<ChapterStatus> = statuses.into_iter().collect();
        if statuses.is_empty() {
            StoryStatus::Init
        } else if statuses.iter().all(ChapterStatus::is_settled) {
            StoryStatus::Completed
        } else if statuses.contains(&ChapterStatus::Revising) {
            StoryStatus::Revising
        } else {
            StoryStatus::Writing
        }
    }
}

/// A story: the ordered set of its chapters plus derived aggregates.
///
/// Derived fields (`total_chapters`, `current_chapter`, `word_count`,
/// `overall_status`) change only through [`Story::recompute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Story {
    /// Unique id
    story_id: String,
    /// Display title
    title: String,
    /// Derived status
    overall_status: StoryStatus,
    /// Number of chapters
    total_chapters: usize,
    /// 1-based position of the latest chapter, 0 when empty
    current_chapter: usize,
    /// Sum of chapter word counts
    word_count: usize,
    /// Chapter ids in reading order
    chapter_ids: Vec<String>,
    /// Creation time
    created_at: DateTime<Utc>,
    /// Last mutation time
    updated_at: DateTime<Utc>,
    /// Free-form metadata
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl Story {
    /// Create an empty story in the `init` state.
    pub fn new(story_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            story_id: story_id.into(),
            title: title.into(),
            overall_status: StoryStatus::Init,
            total_chapters: 0,
            current_chapter: 0,
            word_count: 0,
            chapter_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    /// Append a chapter id to the reading order.
    pub fn push_chapter_id(&mut self, chapter_id: impl Into<String>) {
        self.chapter_ids.push(chapter_id.into());
    }

    /// Drop a chapter id from the reading order.
    pub fn remove_chapter_id(&mut self, chapter_id: &str) -> bool {
        let before = self.chapter_ids.len();
        self.chapter_ids.retain(|id| id != chapter_id);
        self.chapter_ids.len() != before
    }

    /// Replace the reading order. Callers must pass a permutation of the
    /// current ids.
    pub fn set_chapter_order(&mut self, order: Vec<String>) {
        self.chapter_ids = order;
        self.updated_at = Utc::now();
    }

    /// Recompute every derived field from the story's chapters.
    pub fn recompute<'a>(&mut self, chapters: impl IntoIterator<Item = &'a Chapter>) {
        let chapters: Vec<&Chapter> = chapters.into_iter().collect();
        self.total_chapters = chapters.len();
        self.current_chapter = chapters.len();
        self.word_count = chapters.iter().map(|c| *c.word_count()).sum();
        self.overall_status = StoryStatus::derive(chapters.iter().map(|c| *c.status()));
        self.updated_at = Utc::now();
    }
}
