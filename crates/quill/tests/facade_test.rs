//! End-to-end run through the facade crate.

use async_trait::async_trait;
use quill::{
    ChapterStatus, QuillConfig, QuillResult, Role, RoleRegistry, StoryArchive, TextGenerator,
    WorkflowOrchestrator,
};
use std::sync::Arc;

const PARAGRAPH: &str = "The lamp burned all night while the keeper traced the coastline.";

#[derive(Debug)]
struct Steady;

#[async_trait]
impl TextGenerator for Steady {
    async fn generate(&self, _role: Role, _prompt: &str) -> QuillResult<String> {
        Ok(PARAGRAPH.to_string())
    }

    fn provider_name(&self) -> &'static str {
        "steady"
    }

    fn model_name(&self) -> &str {
        "steady-1"
    }
}

#[tokio::test]
async fn test_run_persists_finished_story() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = QuillConfig::default();
    config.creation.total_target_length = 20;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_delay_secs = 0;

    let archive = StoryArchive::new(dir.path()).unwrap();
    let registry = RoleRegistry::new().with_default(Arc::new(Steady));
    let mut orchestrator = WorkflowOrchestrator::new(Arc::new(config), registry)
        .with_archive(archive.clone())
        .with_story_id("keeper");

    let outcome = orchestrator.run("A lighthouse keeper", "The Keeper").await;
    assert!(outcome.is_completed(), "{:?}", outcome.status);
    assert_eq!(outcome.content, PARAGRAPH);

    assert_eq!(archive.list().unwrap(), vec!["keeper".to_string()]);
    let saved = archive.load_story("keeper").unwrap();
    assert_eq!(saved.chapters.len(), 1);
    assert_eq!(*saved.chapters[0].status(), ChapterStatus::Final);
    assert!(!archive.load_reviews("keeper").unwrap().is_empty());
    assert_eq!(archive.load_session("keeper").unwrap().creation_steps(), 1);
}
