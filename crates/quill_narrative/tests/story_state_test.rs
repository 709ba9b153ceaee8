//! Tests for the story and chapter state machine.

use quill_core::{ChapterStatus, StoryStatus};
use quill_error::StoreErrorKind;
use quill_narrative::StoryStateStore;

fn store_with_chapters(contents: &[&str]) -> (StoryStateStore, Vec<String>) {
    let mut store = StoryStateStore::new(3);
    store.create_story("tale", "A Tale").unwrap();
    let ids = contents
        .iter()
        .enumerate()
        .map(|(i, content)| {
            store
                .create_chapter("tale", &format!("Chapter {}", i + 1), content)
                .unwrap()
                .chapter_id()
                .clone()
        })
        .collect();
    (store, ids)
}

fn chapter_sum(store: &StoryStateStore) -> usize {
    store
        .chapters_of("tale")
        .iter()
        .map(|c| *c.word_count())
        .sum()
}

#[test]
fn test_word_count_tracks_every_mutation() {
    let (mut store, ids) = store_with_chapters(&["一二三", "four five", ""]);
    assert_eq!(*store.story("tale").unwrap().word_count(), chapter_sum(&store));

    let delta = store
        .update_chapter_content(&ids[0], "一二三四五六", "expanded")
        .unwrap();
    assert_eq!(delta, 3);
    assert_eq!(*store.story("tale").unwrap().word_count(), chapter_sum(&store));

    let delta = store.update_chapter_content(&ids[1], "four", "trimmed").unwrap();
    assert_eq!(delta, -5);
    assert_eq!(*store.story("tale").unwrap().word_count(), chapter_sum(&store));

    assert!(store.delete_chapter(&ids[0]));
    let story = store.story("tale").unwrap();
    assert_eq!(*story.word_count(), 4);
    assert_eq!(*story.total_chapters(), 2);
    assert_eq!(*story.word_count(), chapter_sum(&store));
}

#[test]
fn test_new_story_starts_in_init() {
    let (store, _) = store_with_chapters(&[]);
    assert_eq!(*store.story("tale").unwrap().overall_status(), StoryStatus::Init);
    let (store, _) = store_with_chapters(&["x"]);
    assert_eq!(*store.story("tale").unwrap().overall_status(), StoryStatus::Writing);
}

#[test]
fn test_overall_status_depends_only_on_the_multiset() {
    let path_a = [
        (0, ChapterStatus::Reviewing),
        (0, ChapterStatus::Approved),
        (1, ChapterStatus::Reviewing),
        (1, ChapterStatus::Revising),
    ];
    let path_b = [
        (1, ChapterStatus::Reviewing),
        (1, ChapterStatus::Revising),
        (0, ChapterStatus::Reviewing),
        (0, ChapterStatus::Approved),
    ];

    let mut results = Vec::new();
    for path in [path_a, path_b] {
        let (mut store, ids) = store_with_chapters(&["one", "two"]);
        let mut last = StoryStatus::Init;
        for (index, status) in path {
            last = store.update_chapter_status(&ids[index], status).unwrap();
        }
        assert_eq!(*store.story("tale").unwrap().overall_status(), last);
        results.push(last);
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], StoryStatus::Revising);
}

#[test]
fn test_all_settled_chapters_complete_the_story() {
    let (mut store, ids) = store_with_chapters(&["one", "two"]);
    for id in &ids {
        store.update_chapter_status(id, ChapterStatus::Reviewing).unwrap();
        store.update_chapter_status(id, ChapterStatus::Approved).unwrap();
    }
    assert_eq!(*store.story("tale").unwrap().overall_status(), StoryStatus::Completed);
    store.update_chapter_status(&ids[0], ChapterStatus::Final).unwrap();
    assert_eq!(*store.story("tale").unwrap().overall_status(), StoryStatus::Completed);
}

#[test]
fn test_backward_transitions_are_rejected() {
    let (mut store, ids) = store_with_chapters(&["one"]);
    store.update_chapter_status(&ids[0], ChapterStatus::Reviewing).unwrap();
    store.update_chapter_status(&ids[0], ChapterStatus::Approved).unwrap();
    let err = store
        .update_chapter_status(&ids[0], ChapterStatus::Draft)
        .unwrap_err();
    assert!(matches!(err.kind, StoreErrorKind::InvalidTransition { .. }));
    assert_eq!(*store.chapter(&ids[0]).unwrap().status(), ChapterStatus::Approved);
}

#[test]
fn test_revising_loop_back_is_limited() {
    let (mut store, ids) = store_with_chapters(&["one"]);
    let id = &ids[0];
    store.update_chapter_status(id, ChapterStatus::Reviewing).unwrap();
    for _ in 0..3 {
        store.update_chapter_status(id, ChapterStatus::Revising).unwrap();
        store.update_chapter_status(id, ChapterStatus::Reviewing).unwrap();
    }
    assert!(!store.revision_budget_left(id));
    store.update_chapter_status(id, ChapterStatus::Revising).unwrap();
    let err = store
        .update_chapter_status(id, ChapterStatus::Reviewing)
        .unwrap_err();
    assert!(matches!(err.kind, StoreErrorKind::RevisionLimit { max_rounds: 3, .. }));
}

#[test]
fn test_reorder_accepts_only_permutations() {
    let (mut store, ids) = store_with_chapters(&["one", "two", "three"]);
    let before = store.story("tale").unwrap().clone();

    let dropped = vec![ids[0].clone(), ids[1].clone()];
    let duplicated = vec![ids[0].clone(), ids[0].clone(), ids[1].clone()];
    let foreign = vec![ids[0].clone(), ids[1].clone(), "tale_chapter_99".to_string()];
    for bad in [dropped, duplicated, foreign] {
        assert!(!store.reorder_chapters("tale", &bad));
        assert_eq!(store.story("tale").unwrap(), &before);
    }

    let reversed: Vec<String> = ids.iter().rev().cloned().collect();
    assert!(store.reorder_chapters("tale", &reversed));
    let story = store.story("tale").unwrap();
    assert_eq!(story.chapter_ids(), &reversed);
    assert_eq!(story.word_count(), before.word_count());
    assert_eq!(story.total_chapters(), before.total_chapters());
    assert_eq!(
        store.export_story_as_text("tale").unwrap(),
        "# Chapter 3\n\nthree\n\n# Chapter 2\n\ntwo\n\n# Chapter 1\n\none"
    );
}

#[test]
fn test_unknown_ids() {
    let (mut store, _) = store_with_chapters(&["one"]);
    assert!(!store.delete_chapter("tale_chapter_42"));
    assert!(!store.reorder_chapters("missing", &[]));
    let err = store
        .create_chapter("missing", "Lost", "text")
        .unwrap_err();
    assert!(matches!(err.kind, StoreErrorKind::StoryNotFound(_)));
    let err = store
        .update_chapter_content("tale_chapter_42", "x", "note")
        .unwrap_err();
    assert!(matches!(err.kind, StoreErrorKind::ChapterNotFound(_)));
}

#[test]
fn test_structured_export_keeps_versions() {
    let (mut store, ids) = store_with_chapters(&["draft"]);
    store.update_chapter_content(&ids[0], "revised", "editor pass").unwrap();

    let export = store.export_story_as_structured("tale").unwrap();
    let versions = export.chapters[0].versions();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].content, "draft");
    assert_eq!(versions[1].note, "editor pass");

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["story"]["story_id"], "tale");
    assert_eq!(json["chapters"][0]["content"], "revised");
}
