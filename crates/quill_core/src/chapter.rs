//! Chapter records and the chapter lifecycle.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use quill_error::{StoreError, StoreErrorKind};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single chapter.
///
/// The lifecycle only moves forward, except for the revision loop:
///
/// ```text
/// draft -> reviewing -> approved -> final
///              ^  |
///              |  v
///            revising -> final
/// ```
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
    derive_more::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    /// Freshly generated, not yet reviewed
    #[display("draft")]
    Draft,
    /// Under review
    #[display("reviewing")]
    Reviewing,
    /// Passed review
    #[display("approved")]
    Approved,
    /// Sent back for a revision pass
    #[display("revising")]
    Revising,
    /// Locked in the finished story
    #[display("final")]
    Final,
}

impl ChapterStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::ChapterStatus;
    ///
    /// assert!(ChapterStatus::Draft.can_transition_to(ChapterStatus::Reviewing));
    /// assert!(ChapterStatus::Revising.can_transition_to(ChapterStatus::Reviewing));
    /// assert!(!ChapterStatus::Final.can_transition_to(ChapterStatus::Draft));
    /// assert!(!ChapterStatus::Draft.can_transition_to(ChapterStatus::Approved));
    /// ```
    pub fn can_transition_to(&self, next: ChapterStatus) -> bool {
        use ChapterStatus::*;
        matches!(
            (*self, next),
            (Draft, Reviewing)
                | (Reviewing, Approved)
                | (Reviewing, Revising)
                | (Revising, Reviewing)
                | (Revising, Final)
                | (Approved, Final)
        )
    }

    /// Whether the chapter counts as done for story completion.
    pub fn is_settled(&self) -> bool {
        matches!(self, ChapterStatus::Approved | ChapterStatus::Final)
    }
}

/// One entry of a chapter's append-only content history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterVersion {
    /// 1-based version number
    pub version: u32,
    /// Content at this version
    pub content: String,
    /// Length of `content` in characters
    pub word_count: usize,
    /// When this version was recorded
    pub created_at: DateTime<Utc>,
    /// Why this version exists (created, revision, manual edit)
    pub note: String,
}

/// A generated chapter.
///
/// A chapter does not know which story owns it; ownership is resolved from
/// the chapter id through the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Chapter {
    /// Unique id, `{story_id}_chapter_{seq}`
    chapter_id: String,
    /// Display title
    title: String,
    /// Current content
    content: String,
    /// Length of `content` in characters
    word_count: usize,
    /// Lifecycle state
    status: ChapterStatus,
    /// Number of `revising -> reviewing` loop-backs taken so far
    revision_rounds: u32,
    /// Append-only content history
    versions: Vec<ChapterVersion>,
    /// Creation time
    created_at: DateTime<Utc>,
    /// Last mutation time
    updated_at: DateTime<Utc>,
    /// Free-form metadata
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl Chapter {
    /// Create a draft chapter holding `content` as version 1.
    pub fn new(
        chapter_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let now = Utc::now();
        let word_count = content.chars().count();
        Self {
            chapter_id: chapter_id.into(),
            title: title.into(),
            versions: vec![ChapterVersion {
                version: 1,
                content: content.clone(),
                word_count,
                created_at: now,
                note: "created".to_string(),
            }],
            content,
            word_count,
            status: ChapterStatus::Draft,
            revision_rounds: 0,
            created_at: now,
            updated_at: now,
            metadata: serde_json::Map::new(),
        }
    }

    /// Replace the content, appending a new version.
    ///
    /// Returns the signed change in word count.
    pub fn replace_content(&mut self, content: impl Into<String>, note: impl Into<String>) -> i64 {
        let content = content.into();
        let word_count = content.chars().count();
        let delta = word_count as i64 - self.word_count as i64;
        let now = Utc::now();
        self.versions.push(ChapterVersion {
            version: self.versions.len() as u32 + 1,
            content: content.clone(),
            word_count,
            created_at: now,
            note: note.into(),
        });
        self.content = content;
        self.word_count = word_count;
        self.updated_at = now;
        delta
    }

    /// Move to `next`, enforcing the lifecycle and the revision budget.
    ///
    /// Moving to the current status is a no-op. Each `revising -> reviewing`
    /// loop-back consumes one of `max_revision_rounds`.
    pub fn transition(
        &mut self,
        next: ChapterStatus,
        max_revision_rounds: u32,
    ) -> Result<(), StoreError> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(StoreError::new(StoreErrorKind::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            }));
        }
        if self.status == ChapterStatus::Revising && next == ChapterStatus::Reviewing {
            if self.revision_rounds >= max_revision_rounds {
                return Err(StoreError::new(StoreErrorKind::RevisionLimit {
                    chapter_id: self.chapter_id.clone(),
                    max_rounds: max_revision_rounds,
                }));
            }
            self.revision_rounds += 1;
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Rename the chapter.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    /// Attach a metadata entry.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }
}
