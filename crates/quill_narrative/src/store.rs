//! Story and chapter state machine.
//!
//! Stories and chapters live in two flat maps. A chapter never points back at
//! its story; the owning story is resolved from the chapter id prefix against
//! the story registry. Every mutation recomputes the story's derived fields.

use quill_core::{Chapter, ChapterStatus, Story, StoryStatus};
use quill_error::{StoreError, StoreErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// A story with its chapters in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryExport {
    /// Story record
    pub story: Story,
    /// Chapters in reading order
    pub chapters: Vec<Chapter>,
}

impl StoryExport {
    /// Plain-text rendering: each chapter as a markdown heading plus content.
    pub fn to_text(&self) -> String {
        self.chapters
            .iter()
            .map(|c| format!("# {}\n\n{}", c.title(), c.content()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Arena-style store of stories and chapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryStateStore {
    stories: BTreeMap<String, Story>,
    chapters: BTreeMap<String, Chapter>,
    next_sequence: BTreeMap<String, u32>,
    max_revision_rounds: u32,
}

impl StoryStateStore {
    /// Create an empty store allowing `max_revision_rounds` loop-backs per chapter.
    pub fn new(max_revision_rounds: u32) -> Self {
        Self {
            stories: BTreeMap::new(),
            chapters: BTreeMap::new(),
            next_sequence: BTreeMap::new(),
            max_revision_rounds,
        }
    }

    /// Register a new story.
    #[instrument(skip(self, title))]
    pub fn create_story(&mut self, story_id: &str, title: &str) -> Result<&Story, StoreError> {
        if self.stories.contains_key(story_id) {
            return Err(StoreError::new(StoreErrorKind::StoryExists(story_id.to_string())));
        }
        info!(title, "Story created");
        self.next_sequence.insert(story_id.to_string(), 1);
        Ok(self
            .stories
            .entry(story_id.to_string())
            .or_insert_with(|| Story::new(story_id, title)))
    }

    /// Append a draft chapter to a story.
    #[instrument(skip(self, title, content), fields(content_len = content.len()))]
    pub fn create_chapter(
        &mut self,
        story_id: &str,
        title: &str,
        content: &str,
    ) -> Result<&Chapter, StoreError> {
        if !self.stories.contains_key(story_id) {
            return Err(StoreError::new(StoreErrorKind::StoryNotFound(story_id.to_string())));
        }
        let sequence = self.next_sequence.entry(story_id.to_string()).or_insert(1);
        let chapter_id = format!("{}_chapter_{}", story_id, sequence);
        *sequence += 1;

        self.chapters
            .insert(chapter_id.clone(), Chapter::new(&chapter_id, title, content));
        if let Some(story) = self.stories.get_mut(story_id) {
            story.push_chapter_id(&chapter_id);
        }
        self.recompute(story_id);
        debug!(chapter_id = %chapter_id, "Chapter created");

        self.chapters
            .get(&chapter_id)
            .ok_or_else(|| StoreError::new(StoreErrorKind::ChapterNotFound(chapter_id)))
    }

    /// Replace a chapter's content, keeping the old one in its version history.
    ///
    /// Returns the signed change in word count.
    #[instrument(skip(self, content, note), fields(content_len = content.len()))]
    pub fn update_chapter_content(
        &mut self,
        chapter_id: &str,
        content: &str,
        note: &str,
    ) -> Result<i64, StoreError> {
        let story_id = self.owner_of(chapter_id)?;
        let chapter = self
            .chapters
            .get_mut(chapter_id)
            .ok_or_else(|| chapter_not_found(chapter_id))?;
        let delta = chapter.replace_content(content, note);
        self.recompute(&story_id);
        debug!(delta, "Chapter content updated");
        Ok(delta)
    }

    /// Rename a chapter.
    pub fn update_chapter_title(
        &mut self,
        chapter_id: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        self.chapters
            .get_mut(chapter_id)
            .ok_or_else(|| chapter_not_found(chapter_id))?
            .set_title(title);
        Ok(())
    }

    /// Move a chapter through its lifecycle and return the derived story status.
    #[instrument(skip(self))]
    pub fn update_chapter_status(
        &mut self,
        chapter_id: &str,
        status: ChapterStatus,
    ) -> Result<StoryStatus, StoreError> {
        let story_id = self.owner_of(chapter_id)?;
        let max_rounds = self.max_revision_rounds;
        self.chapters
            .get_mut(chapter_id)
            .ok_or_else(|| chapter_not_found(chapter_id))?
            .transition(status, max_rounds)?;
        self.recompute(&story_id);
        let overall = self
            .stories
            .get(&story_id)
            .map(|s| *s.overall_status())
            .unwrap_or_default();
        debug!(overall = %overall, "Chapter status updated");
        Ok(overall)
    }

    /// Remove a chapter. Returns false when it does not exist.
    #[instrument(skip(self))]
    pub fn delete_chapter(&mut self, chapter_id: &str) -> bool {
        let Ok(story_id) = self.owner_of(chapter_id) else {
            return false;
        };
        if self.chapters.remove(chapter_id).is_none() {
            return false;
        }
        if let Some(story) = self.stories.get_mut(&story_id) {
            story.remove_chapter_id(chapter_id);
        }
        self.recompute(&story_id);
        debug!("Chapter deleted");
        true
    }

    /// Replace a story's chapter order.
    ///
    /// Returns false without mutating anything unless `order` is a
    /// permutation of the story's current chapter ids.
    #[instrument(skip(self, order), fields(len = order.len()))]
    pub fn reorder_chapters(&mut self, story_id: &str, order: &[String]) -> bool {
        let Some(story) = self.stories.get_mut(story_id) else {
            return false;
        };
        let current: BTreeSet<&String> = story.chapter_ids().iter().collect();
        let proposed: BTreeSet<&String> = order.iter().collect();
        if order.len() != story.chapter_ids().len() || proposed != current {
            warn!("Rejected chapter reorder that is not a permutation");
            return false;
        }
        story.set_chapter_order(order.to_vec());
        true
    }

    /// Look up a story.
    pub fn story(&self, story_id: &str) -> Option<&Story> {
        self.stories.get(story_id)
    }

    /// Look up a chapter.
    pub fn chapter(&self, chapter_id: &str) -> Option<&Chapter> {
        self.chapters.get(chapter_id)
    }

    /// A story's chapters in reading order.
    pub fn chapters_of(&self, story_id: &str) -> Vec<&Chapter> {
        self.stories
            .get(story_id)
            .map(|story| {
                story
                    .chapter_ids()
                    .iter()
                    .filter_map(|id| self.chapters.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a chapter may still loop back from `revising` to `reviewing`.
    pub fn revision_budget_left(&self, chapter_id: &str) -> bool {
        self.chapters
            .get(chapter_id)
            .is_some_and(|c| *c.revision_rounds() < self.max_revision_rounds)
    }

    /// Resolve the story owning `chapter_id` from its id prefix.
    ///
    /// When several story ids match, the longest wins.
    pub fn story_id_of(&self, chapter_id: &str) -> Option<&str> {
        self.stories
            .keys()
            .filter(|story_id| {
                chapter_id
                    .strip_prefix(story_id.as_str())
                    .is_some_and(|rest| rest.starts_with("_chapter_"))
            })
            .max_by_key(|story_id| story_id.len())
            .map(String::as_str)
    }

    /// Attach metadata to a story.
    pub fn insert_story_metadata(
        &mut self,
        story_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.stories
            .get_mut(story_id)
            .ok_or_else(|| StoreError::new(StoreErrorKind::StoryNotFound(story_id.to_string())))?
            .insert_metadata(key, value);
        Ok(())
    }

    /// Attach metadata to a chapter.
    pub fn insert_chapter_metadata(
        &mut self,
        chapter_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.chapters
            .get_mut(chapter_id)
            .ok_or_else(|| chapter_not_found(chapter_id))?
            .insert_metadata(key, value);
        Ok(())
    }

    /// Plain-text export of a story.
    pub fn export_story_as_text(&self, story_id: &str) -> Result<String, StoreError> {
        Ok(self.export_story_as_structured(story_id)?.to_text())
    }

    /// Structured export of a story and its chapters.
    pub fn export_story_as_structured(&self, story_id: &str) -> Result<StoryExport, StoreError> {
        let story = self
            .stories
            .get(story_id)
            .ok_or_else(|| StoreError::new(StoreErrorKind::StoryNotFound(story_id.to_string())))?;
        Ok(StoryExport {
            story: story.clone(),
            chapters: self.chapters_of(story_id).into_iter().cloned().collect(),
        })
    }

    fn owner_of(&self, chapter_id: &str) -> Result<String, StoreError> {
        if !self.chapters.contains_key(chapter_id) {
            return Err(chapter_not_found(chapter_id));
        }
        self.story_id_of(chapter_id)
            .map(str::to_string)
            .ok_or_else(|| chapter_not_found(chapter_id))
    }

    fn recompute(&mut self, story_id: &str) {
        let Some(story) = self.stories.get_mut(story_id) else {
            return;
        };
        let chapters = &self.chapters;
        let ids = story.chapter_ids().clone();
        story.recompute(ids.iter().filter_map(|id| chapters.get(id)));
    }
}

#[track_caller]
fn chapter_not_found(chapter_id: &str) -> StoreError {
    StoreError::new(StoreErrorKind::ChapterNotFound(chapter_id.to_string()))
}
