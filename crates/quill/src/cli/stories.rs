//! Read-only commands over the story archive.

use crate::cli::ExportFormat;
use quill::{JsonError, QuillConfig, QuillResult, StoryArchive};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Open the archive at `output_dir`, or at `workflow.output_dir` from the loaded configuration.
pub fn open_archive(output_dir: Option<PathBuf>) -> QuillResult<StoryArchive> {
    let dir = match output_dir {
        Some(dir) => dir,
        None => QuillConfig::load()?.workflow.output_dir,
    };
    debug!(path = %dir.display(), "Opening story archive");
    StoryArchive::new(dir)
}

/// Ids of every saved story, one per line.
pub fn list_stories(archive: &StoryArchive) -> QuillResult<String> {
    Ok(archive.list()?.join("\n"))
}

/// Status overview of a saved story.
#[instrument(skip(archive))]
pub fn show_story(archive: &StoryArchive, story_id: &str) -> QuillResult<String> {
    let export = archive.load_story(story_id)?;
    let reviews = archive.load_reviews(story_id)?;
    let session = archive.load_session(story_id)?;
    let story = &export.story;

    let mut lines = vec![
        format!("{} ({})", story.title(), story.story_id()),
        format!(
            "status: {}, chapters: {}, length: {}",
            story.overall_status(),
            story.total_chapters(),
            story.word_count()
        ),
        format!(
            "creation steps: {}, review rounds: {}",
            session.creation_steps(),
            reviews.len()
        ),
    ];
    for (i, chapter) in export.chapters.iter().enumerate() {
        lines.push(format!(
            "  {}. {} [{}] {} chars, {} revisions",
            i + 1,
            chapter.title(),
            chapter.status(),
            chapter.word_count(),
            chapter.revision_rounds()
        ));
    }
    Ok(lines.join("\n"))
}

/// Full text or JSON document of a saved story.
#[instrument(skip(archive))]
pub fn export_story(
    archive: &StoryArchive,
    story_id: &str,
    format: ExportFormat,
) -> QuillResult<String> {
    let export = archive.load_story(story_id)?;
    match format {
        ExportFormat::Text => Ok(export.to_text()),
        ExportFormat::Json => serde_json::to_string_pretty(&export)
            .map_err(|e| JsonError::new(format!("Failed to serialize story: {}", e)).into()),
    }
}
