//! Tests for chapter decisions backed by scripted generators.

mod test_utils;

use quill_core::{PlanningData, Role};
use quill_interface::RoleRegistry;
use quill_narrative::{ChapterDecisionEngine, FallbackReason, Source};
use test_utils::{MockGenerator, fast_config};

#[tokio::test]
async fn test_generated_decision_is_clamped() {
    let writer = MockGenerator::fixed(
        "Here you go:\n```json\n{\"should_end\": true, \"confidence\": 1.5, \
         \"suggested_title\": \"The Crossing\", \"next_chapter_hint\": \"the storm\"}\n```",
    );
    let registry = RoleRegistry::new().with_handler(Role::Writer, writer.shared());
    let mut engine = ChapterDecisionEngine::new(&fast_config(), &registry);

    let resolved = engine
        .should_end_chapter("The ferry reached the far bank.", &PlanningData::default())
        .await;

    assert!(!resolved.is_fallback());
    assert!(resolved.value.should_end);
    assert_eq!(resolved.value.confidence, 1.0);
    assert_eq!(resolved.value.suggested_title, "The Crossing");
    assert_eq!(resolved.value.next_hint, "the storm");
    assert_eq!(engine.decided_count(), 1);
}

#[tokio::test]
async fn test_prose_answer_falls_back_with_numbered_title() {
    let writer = MockGenerator::fixed("I think the chapter should probably end here.");
    let registry = RoleRegistry::new().with_handler(Role::Writer, writer.shared());
    let mut engine = ChapterDecisionEngine::new(&fast_config(), &registry);
    let planning = PlanningData::default();

    engine.should_end_chapter("short", &planning).await;
    let resolved = engine.should_end_chapter("short", &planning).await;

    assert!(matches!(
        resolved.source,
        Source::Fallback(FallbackReason::Parse(_))
    ));
    assert!(!resolved.value.should_end);
    assert_eq!(resolved.value.suggested_title, "Chapter 2");
    assert_eq!(resolved.value.confidence, 0.5);
}

#[tokio::test]
async fn test_outline_accepts_bare_and_wrapped_lists() {
    let planner = MockGenerator::sequence([
        r#"[
            {"title": "Arrival", "summary": "she lands"},
            {"title": " ", "content_summary": "storm"}
        ]"#,
        r#"{"dynamic_chapters": [{"title": "Only", "key_elements": ["map"]}]}"#,
    ]);
    let registry = RoleRegistry::new().with_handler(Role::Planner, planner.shared());
    let engine = ChapterDecisionEngine::new(&fast_config(), &registry);

    let bare = engine.create_chapter_outline("a map").await;
    assert!(!bare.is_fallback());
    assert_eq!(bare.value.len(), 2);
    assert_eq!(bare.value[1].title, "Chapter 2");
    assert_eq!(bare.value[1].summary, "storm");

    let wrapped = engine.create_chapter_outline("a map").await;
    assert_eq!(wrapped.value.len(), 1);
    assert_eq!(wrapped.value[0].key_events, vec!["map".to_string()]);
}

#[tokio::test]
async fn test_empty_outline_uses_fallback() {
    let planner = MockGenerator::fixed(r#"{"dynamic_chapters": []}"#);
    let registry = RoleRegistry::new().with_handler(Role::Planner, planner.shared());
    let engine = ChapterDecisionEngine::new(&fast_config(), &registry);

    let outline = engine.create_chapter_outline("a map").await;
    assert!(outline.is_fallback());
    assert_eq!(outline.value.len(), 1);
    assert_eq!(outline.value[0].number, 1);
}

#[tokio::test]
async fn test_progress_fills_missing_fields_from_heuristic() {
    let editor = MockGenerator::fixed(r#"{"story_progress_ratio": 1.7, "is_continuing": true}"#);
    let registry = RoleRegistry::new().with_handler(Role::Editor, editor.shared());
    let engine = ChapterDecisionEngine::new(&fast_config(), &registry);
    let chapters = vec!["one".to_string(), "two".to_string()];

    let progress = engine
        .evaluate_overall_progress(&chapters, &PlanningData::default())
        .await;
    assert!(!progress.is_fallback());
    assert_eq!(progress.value.progress_ratio, 1.0);
    assert!(progress.value.is_continuing);
    assert_eq!(
        progress.value.estimated_remaining,
        engine.fallback_progress(&chapters).estimated_remaining
    );
}

#[tokio::test]
async fn test_missing_editor_stops_at_heuristic_limit() {
    let engine = ChapterDecisionEngine::new(&fast_config(), &RoleRegistry::new());
    let chapters: Vec<String> = (0..5).map(|i| format!("chapter {}", i)).collect();

    let progress = engine
        .evaluate_overall_progress(&chapters, &PlanningData::default())
        .await;
    assert!(matches!(
        progress.source,
        Source::Fallback(FallbackReason::MissingHandler(Role::Editor))
    ));
    assert!(!progress.value.is_continuing);
}
