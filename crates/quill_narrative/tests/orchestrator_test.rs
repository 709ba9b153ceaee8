//! Tests for the phase state machine and the creation loop.

mod test_utils;

use async_trait::async_trait;
use quill_core::{ChapterStatus, QuillConfig, Role, StoryStatus};
use quill_error::{GenerationErrorKind, QuillResult};
use quill_interface::{PauseDecision, Phase, ProgressEvent, ProgressSink, RoleRegistry};
use quill_narrative::{SessionEvent, StoryArchive, WorkflowOrchestrator, WorkflowStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use test_utils::{
    MockBehavior, MockGenerator, MockResponse, ScriptedPause, fast_config, recording_sink,
};

fn writer_only(text: &str) -> RoleRegistry {
    RoleRegistry::new().with_handler(Role::Writer, MockGenerator::fixed(text).shared())
}

fn new_orchestrator(config: QuillConfig, registry: RoleRegistry) -> WorkflowOrchestrator {
    WorkflowOrchestrator::new(Arc::new(config), registry).with_story_id("tale")
}

#[tokio::test]
async fn test_creation_stops_at_target_length() {
    let writer = MockGenerator::fixed("a".repeat(1000));
    let log = writer.call_log();
    let registry = RoleRegistry::new().with_handler(Role::Writer, writer.shared());
    let mut orchestrator = new_orchestrator(fast_config(), registry);

    let outcome = orchestrator.run("A lighthouse keeper finds a map", "The Map").await;

    assert!(outcome.is_completed(), "{:?}", outcome.status);
    assert_eq!(outcome.last_phase, Phase::Done);
    assert_eq!(outcome.session.creation_steps(), 5);
    let writing_calls = log
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, prompt)| prompt.starts_with("Write part"))
        .count();
    assert_eq!(writing_calls, 5);
    assert!(outcome.content.chars().count() >= 5000);

    let export = outcome.export.unwrap();
    assert_eq!(export.chapters.len(), 5);
    assert_eq!(*export.story.total_chapters(), 5);
    assert_eq!(*export.story.word_count(), 5000);
    assert_eq!(*export.story.overall_status(), StoryStatus::Completed);
    assert!(export.chapters.iter().all(|c| *c.status() == ChapterStatus::Final));
    assert_eq!(export.chapters[0].title(), "Chapter 1");
    assert!(outcome.final_report.is_some());
}

#[tokio::test]
async fn test_iteration_cap_bounds_creation() {
    let mut config = fast_config();
    config.creation.max_iterations = 7;
    let registry = RoleRegistry::new()
        .with_handler(Role::Writer, MockGenerator::fixed("A short part.").shared())
        .with_handler(
            Role::Editor,
            MockGenerator::fixed(r#"{"is_continuing": true, "progress_ratio": 0.1}"#).shared(),
        );
    let mut orchestrator = new_orchestrator(config, registry);

    let outcome = orchestrator.run("An endless road", "Road").await;

    assert!(outcome.is_completed(), "{:?}", outcome.status);
    assert_eq!(outcome.session.creation_steps(), 7);
    assert_eq!(outcome.export.unwrap().chapters.len(), 7);
}

#[tokio::test]
async fn test_planner_target_length_overrides_config() {
    let registry = RoleRegistry::new()
        .with_handler(Role::Writer, MockGenerator::fixed("b".repeat(1000)).shared())
        .with_handler(
            Role::Planner,
            MockGenerator::fixed(r#"{"themes": ["loss"], "target_length": 2000}"#).shared(),
        );
    let mut orchestrator = new_orchestrator(fast_config(), registry);

    let outcome = orchestrator.run("A quiet village", "Village").await;

    assert_eq!(outcome.planning.as_ref().unwrap().target_length, 2000);
    assert_eq!(outcome.session.creation_steps(), 2);
}

#[tokio::test]
async fn test_no_generator_is_an_error() {
    let mut orchestrator = new_orchestrator(fast_config(), RoleRegistry::new());

    let outcome = orchestrator.run("Anything", "Nothing").await;

    match &outcome.status {
        WorkflowStatus::Error { message } => assert!(message.contains("No text generator")),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(outcome.last_phase, Phase::Research);
    assert!(outcome.export.is_none());
}

#[tokio::test]
async fn test_missing_writer_keeps_research_results() {
    let registry = RoleRegistry::new().with_handler(
        Role::Planner,
        MockGenerator::fixed(r#"{"target_length": 3000}"#).shared(),
    );
    let mut orchestrator = new_orchestrator(fast_config(), registry);

    let outcome = orchestrator.run("A heist on the moon", "Moon").await;

    match &outcome.status {
        WorkflowStatus::Error { message } => assert!(message.contains("writer")),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(outcome.last_phase, Phase::Creation);
    let planning = outcome.planning.unwrap();
    assert_eq!(planning.target_length, 3000);
    assert_eq!(planning.outline, "Outline for: A heist on the moon");
}

#[tokio::test]
async fn test_writer_exhaustion_returns_partial_results() {
    let writer = MockGenerator::new(MockBehavior::Sequence(vec![
        MockResponse::Success("An outline.".into()),
        MockResponse::Success("The first part.".into()),
        MockResponse::Success("no decision here".into()),
        MockResponse::Error(GenerationErrorKind::Rejected("content policy".into())),
    ]));
    let registry = RoleRegistry::new().with_handler(Role::Writer, writer.shared());
    let mut orchestrator = new_orchestrator(fast_config(), registry);

    let outcome = orchestrator.run("A storm", "Storm").await;

    match &outcome.status {
        WorkflowStatus::Error { message } => assert!(message.contains("step 2")),
        other => panic!("expected error, got {:?}", other),
    }
    let export = outcome.export.unwrap();
    assert_eq!(export.chapters.len(), 1);
    assert_eq!(export.chapters[0].content(), "The first part.");
    assert_eq!(outcome.content, "The first part.");
}

#[tokio::test]
async fn test_exit_at_pause_point_aborts_with_partial_results() {
    let mut config = fast_config();
    config.workflow.manual_control = true;
    let pause = Arc::new(ScriptedPause::new(vec![
        PauseDecision::Continue,
        PauseDecision::Exit,
    ]));
    let seen = Arc::clone(&pause.seen);
    let mut orchestrator =
        new_orchestrator(config, writer_only(&"c".repeat(1000))).with_pause_controller(pause);

    let outcome = orchestrator.run("A desert crossing", "Sand").await;

    assert!(matches!(outcome.status, WorkflowStatus::Aborted { .. }));
    assert_eq!(outcome.last_phase, Phase::Creation);
    assert_eq!(*seen.lock().unwrap(), vec![Phase::Research, Phase::Creation]);
    let export = outcome.export.unwrap();
    assert_eq!(export.chapters.len(), 5);
    assert!(export.chapters.iter().all(|c| *c.status() == ChapterStatus::Draft));
    assert!(outcome.reviews.is_empty());
}

#[tokio::test]
async fn test_regenerate_creation_replaces_chapters() {
    let mut config = fast_config();
    config.workflow.manual_control = true;
    let pause = Arc::new(ScriptedPause::new(vec![
        PauseDecision::Continue,
        PauseDecision::Regenerate,
    ]));
    let mut orchestrator =
        new_orchestrator(config, writer_only(&"d".repeat(1000))).with_pause_controller(pause);

    let outcome = orchestrator.run("Twin cities", "Twins").await;

    assert!(outcome.is_completed(), "{:?}", outcome.status);
    let export = outcome.export.unwrap();
    assert_eq!(export.chapters.len(), 5);
    assert_eq!(export.chapters[0].chapter_id(), "tale_chapter_6");
    assert_eq!(*export.story.word_count(), 5000);
    assert_eq!(outcome.continuity.len(), 5);
    assert_eq!(outcome.session.creation_steps(), 10);
}

#[tokio::test]
async fn test_review_commit_waits_for_pause_point() {
    let mut config = fast_config();
    config.workflow.manual_control = true;
    let pause = Arc::new(ScriptedPause::new(vec![
        PauseDecision::Continue,
        PauseDecision::Continue,
        PauseDecision::Exit,
    ]));
    let mut orchestrator =
        new_orchestrator(config, writer_only(&"e".repeat(1000))).with_pause_controller(pause);

    let outcome = orchestrator.run("A long winter", "Winter").await;

    assert_eq!(outcome.last_phase, Phase::Review);
    let export = outcome.export.unwrap();
    assert!(export.chapters.iter().all(|c| *c.status() == ChapterStatus::Reviewing));
    assert_eq!(*export.story.overall_status(), StoryStatus::Writing);
}

struct CancelOnStep {
    flag: Arc<AtomicBool>,
    step: String,
}

#[async_trait]
impl ProgressSink for CancelOnStep {
    async fn report(&self, event: &ProgressEvent) -> QuillResult<()> {
        if event.phase == Phase::Creation && event.step == self.step {
            self.flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_finishes_current_chapter() {
    let orchestrator = new_orchestrator(fast_config(), writer_only(&"f".repeat(1000)));
    let sink = CancelOnStep {
        flag: orchestrator.cancellation_flag(),
        step: "chapter 2".to_string(),
    };
    let mut orchestrator = orchestrator.with_progress_sink(Arc::new(sink));

    let outcome = orchestrator.run("A train at night", "Night Train").await;

    match &outcome.status {
        WorkflowStatus::Aborted { reason } => assert_eq!(reason, "cancelled"),
        other => panic!("expected abort, got {:?}", other),
    }
    let export = outcome.export.unwrap();
    assert_eq!(export.chapters.len(), 2);
    assert_eq!(export.chapters[1].content().chars().count(), 1000);
}

#[tokio::test]
async fn test_cancellation_skips_pause_point_and_keeps_chapters() {
    let mut config = fast_config();
    config.workflow.manual_control = true;
    let pause = Arc::new(ScriptedPause::new(vec![
        PauseDecision::Continue,
        PauseDecision::Regenerate,
    ]));
    let seen = Arc::clone(&pause.seen);
    let orchestrator =
        new_orchestrator(config, writer_only(&"k".repeat(1000))).with_pause_controller(pause);
    let sink = CancelOnStep {
        flag: orchestrator.cancellation_flag(),
        step: "chapter 2".to_string(),
    };
    let mut orchestrator = orchestrator.with_progress_sink(Arc::new(sink));

    let outcome = orchestrator.run("A lantern festival", "Lanterns").await;

    match &outcome.status {
        WorkflowStatus::Aborted { reason } => assert_eq!(reason, "cancelled"),
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(outcome.last_phase, Phase::Creation);
    assert_eq!(*seen.lock().unwrap(), vec![Phase::Research]);
    let export = outcome.export.unwrap();
    assert_eq!(export.chapters.len(), 2);
    assert_eq!(export.chapters[0].chapter_id(), "tale_chapter_1");
}

#[tokio::test]
async fn test_progress_sink_failures_are_swallowed() {
    let (sink, events) = recording_sink(true);
    let mut orchestrator =
        new_orchestrator(fast_config(), writer_only(&"g".repeat(1000))).with_progress_sink(sink);

    let outcome = orchestrator.run("Lost letters", "Letters").await;

    assert!(outcome.is_completed());
    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| e.phase == Phase::Research));
    assert!(events.iter().any(|e| e.phase == Phase::FinalCheck));
    assert!(events.iter().all(|e| e.progress.is_none_or(|p| (0.0..=1.0).contains(&p))));
}

#[tokio::test]
async fn test_editor_advisory_is_logged() {
    let registry = RoleRegistry::new()
        .with_handler(Role::Writer, MockGenerator::fixed("h".repeat(1000)).shared())
        .with_handler(
            Role::Editor,
            MockGenerator::fixed(
                r#"{
                    "score": 90,
                    "is_continuing": true,
                    "reader_experience": {"drop_off_risk": "high"}
                }"#,
            )
            .shared(),
        );
    let mut orchestrator = new_orchestrator(fast_config(), registry);

    let outcome = orchestrator.run("A haunted mill", "Mill").await;

    let advisories = outcome
        .session
        .entries()
        .iter()
        .filter(|e| matches!(e.event, SessionEvent::Advisory { role: Role::Editor, .. }))
        .count();
    assert_eq!(advisories, 5);
    assert_eq!(outcome.final_report.unwrap().editor_score, Some(90.0));
}

#[tokio::test]
async fn test_archive_receives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let archive = StoryArchive::new(dir.path()).unwrap();
    let mut orchestrator = new_orchestrator(fast_config(), writer_only(&"i".repeat(1000)))
        .with_archive(archive.clone());

    let outcome = orchestrator.run("A clockmaker's apprentice", "Clocks").await;
    assert!(outcome.is_completed());

    let stored = archive.load_story("tale").unwrap();
    assert_eq!(stored.chapters.len(), 5);
    assert!(stored.chapters.iter().all(|c| *c.status() == ChapterStatus::Final));
    assert_eq!(archive.load_continuity("tale").unwrap().len(), 5);
    assert_eq!(archive.load_reviews("tale").unwrap().len(), 5);
    assert_eq!(archive.load_session("tale").unwrap().creation_steps(), 5);
    assert!(dir.path().join("tale").join("story.md").exists());
    assert_eq!(archive.list().unwrap(), vec!["tale".to_string()]);
}

#[tokio::test]
async fn test_regenerated_review_does_not_reset_revision_budget() {
    let mut config = fast_config();
    config.workflow.manual_control = true;
    let pause = Arc::new(ScriptedPause::new(vec![
        PauseDecision::Continue,
        PauseDecision::Continue,
        PauseDecision::Regenerate,
    ]));
    let registry = RoleRegistry::new()
        .with_handler(Role::Writer, MockGenerator::fixed("j".repeat(1000)).shared())
        .with_handler(Role::RhythmSpecialist, MockGenerator::fixed(r#"{"score": 10}"#).shared());
    let mut orchestrator = new_orchestrator(config, registry).with_pause_controller(pause);

    let outcome = orchestrator.run("A river delta", "Delta").await;

    assert!(outcome.is_completed(), "{:?}", outcome.status);
    let export = outcome.export.unwrap();
    // Two revisions in the first pass, one more before the budget runs out.
    assert!(export.chapters.iter().all(|c| *c.revision_rounds() == 3));
    assert!(export.chapters.iter().all(|c| *c.status() == ChapterStatus::Final));
}
