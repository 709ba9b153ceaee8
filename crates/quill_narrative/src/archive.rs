//! Story persistence as plain JSON files.
//!
//! Each story gets its own directory under the archive root:
//!
//! ```text
//! <root>/<story_id>/story.json        story, chapters and version history
//! <root>/<story_id>/story.md          text export
//! <root>/<story_id>/reviews.jsonl     one ReviewRecord per line, append-only
//! <root>/<story_id>/continuity.jsonl  one ContinuityReport per line, append-only
//! <root>/<story_id>/session.json      session log of the last run
//! ```

use crate::{SessionLog, StoryExport};
use derive_getters::Getters;
use quill_core::{ContinuityReport, ReviewRecord};
use quill_error::{IoError, JsonError, QuillResult};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const STORY_FILE: &str = "story.json";
const TEXT_FILE: &str = "story.md";
const REVIEWS_FILE: &str = "reviews.jsonl";
const CONTINUITY_FILE: &str = "continuity.jsonl";
const SESSION_FILE: &str = "session.json";

/// File-backed archive of stories.
#[derive(Debug, Clone, Getters)]
pub struct StoryArchive {
    /// Base directory for story directories
    root: PathBuf,
}

impl StoryArchive {
    /// Open an archive rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> QuillResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            std::fs::create_dir_all(&root).map_err(|e| {
                IoError::new(
                    format!("Failed to create archive directory: {}", e),
                    root.display().to_string(),
                )
            })?;
        }
        debug!(path = %root.display(), "Initialized story archive");
        Ok(Self { root })
    }

    /// Directory holding one story's files.
    pub fn story_dir(&self, story_id: &str) -> QuillResult<PathBuf> {
        if story_id.is_empty()
            || story_id.contains(['/', '\\'])
            || story_id.starts_with('.')
        {
            return Err(IoError::new("Invalid story id", story_id).into());
        }
        Ok(self.root.join(story_id))
    }

    /// Write the story document and its text export.
    pub fn save_story(&self, export: &StoryExport) -> QuillResult<PathBuf> {
        let dir = self.ensure_dir(export.story.story_id())?;
        write_json(&dir.join(STORY_FILE), export)?;
        write_text(&dir.join(TEXT_FILE), &export.to_text())?;
        debug!(
            story_id = %export.story.story_id(),
            chapters = export.chapters.len(),
            "Saved story"
        );
        Ok(dir)
    }

    /// Read a story document.
    pub fn load_story(&self, story_id: &str) -> QuillResult<StoryExport> {
        read_json(&self.story_dir(story_id)?.join(STORY_FILE))
    }

    /// Append a review round to the story's review log.
    pub fn append_review(&self, story_id: &str, record: &ReviewRecord) -> QuillResult<()> {
        let dir = self.ensure_dir(story_id)?;
        append_line(&dir.join(REVIEWS_FILE), record)
    }

    /// Append a continuity report to the story's continuity log.
    pub fn append_continuity(&self, story_id: &str, report: &ContinuityReport) -> QuillResult<()> {
        let dir = self.ensure_dir(story_id)?;
        append_line(&dir.join(CONTINUITY_FILE), report)
    }

    /// All review rounds recorded for a story, oldest first.
    pub fn load_reviews(&self, story_id: &str) -> QuillResult<Vec<ReviewRecord>> {
        read_lines(&self.story_dir(story_id)?.join(REVIEWS_FILE))
    }

    /// All continuity reports recorded for a story, oldest first.
    pub fn load_continuity(&self, story_id: &str) -> QuillResult<Vec<ContinuityReport>> {
        read_lines(&self.story_dir(story_id)?.join(CONTINUITY_FILE))
    }

    /// Replace the story's session log.
    pub fn save_session(&self, story_id: &str, session: &SessionLog) -> QuillResult<()> {
        let dir = self.ensure_dir(story_id)?;
        write_json(&dir.join(SESSION_FILE), session)
    }

    /// Read the story's session log, empty when none was saved.
    pub fn load_session(&self, story_id: &str) -> QuillResult<SessionLog> {
        let path = self.story_dir(story_id)?.join(SESSION_FILE);
        if !path.exists() {
            return Ok(SessionLog::new());
        }
        read_json(&path)
    }

    /// Story ids present in the archive, sorted.
    pub fn list(&self) -> QuillResult<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            IoError::new(format!("Failed to list archive: {}", e), self.root.display().to_string())
        })?;
        let mut ids: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().join(STORY_FILE).exists())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Remove a story's directory. Returns false when it did not exist.
    pub fn delete(&self, story_id: &str) -> QuillResult<bool> {
        let dir = self.story_dir(story_id)?;
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir).map_err(|e| {
            IoError::new(format!("Failed to delete story: {}", e), dir.display().to_string())
        })?;
        debug!(story_id, "Deleted story");
        Ok(true)
    }

    fn ensure_dir(&self, story_id: &str) -> QuillResult<PathBuf> {
        let dir = self.story_dir(story_id)?;
        std::fs::create_dir_all(&dir).map_err(|e| {
            IoError::new(
                format!("Failed to create story directory: {}", e),
                dir.display().to_string(),
            )
        })?;
        Ok(dir)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> QuillResult<()> {
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| JsonError::new(format!("Failed to serialize {}: {}", path.display(), e)))?;
    write_text(path, &contents)
}

fn write_text(path: &Path, contents: &str) -> QuillResult<()> {
    std::fs::write(path, contents).map_err(|e| {
        IoError::new(format!("Failed to write file: {}", e), path.display().to_string())
    })?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> QuillResult<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        IoError::new(format!("Failed to read file: {}", e), path.display().to_string())
    })?;
    let value = serde_json::from_str(&contents)
        .map_err(|e| JsonError::new(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(value)
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> QuillResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|e| JsonError::new(format!("Failed to serialize {}: {}", path.display(), e)))?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            IoError::new(format!("Failed to open log: {}", e), path.display().to_string())
        })?;
    writeln!(file, "{}", line).map_err(|e| {
        IoError::new(format!("Failed to append log: {}", e), path.display().to_string())
    })?;
    Ok(())
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> QuillResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| {
        IoError::new(format!("Failed to read log: {}", e), path.display().to_string())
    })?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                JsonError::new(format!("Failed to parse {}: {}", path.display(), e)).into()
            })
        })
        .collect()
}
