//! Chapter termination decisions.
//!
//! After every creation step the engine asks whether the current chapter is
//! complete and, periodically, whether the story should continue. Each
//! question has an AI path and a deterministic fallback, so the creation loop
//! can always make progress.

use crate::{ParseMode, Resolved, RetryPolicy, parse_structured, tail_chars};
use quill_core::{
    ChapterDecision, DecisionConfig, PlannedChapter, PlanningData, ProgressAssessment, QuillConfig,
    Role,
};
use quill_error::{ParseError, ParseErrorKind};
use quill_interface::{Handler, RoleRegistry};
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct RawDecision {
    should_end: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    suggested_title: Option<String>,
    #[serde(default, alias = "next_chapter_hint")]
    next_hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlannedChapter {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "content_summary")]
    summary: String,
    #[serde(default, alias = "key_elements")]
    key_events: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOutline {
    Wrapped {
        #[serde(alias = "chapters")]
        dynamic_chapters: Vec<RawPlannedChapter>,
    },
    Bare(Vec<RawPlannedChapter>),
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    #[serde(default, alias = "story_progress_ratio")]
    progress_ratio: Option<f64>,
    #[serde(default, alias = "estimated_remaining_parts")]
    estimated_remaining: Option<u32>,
    is_continuing: bool,
    #[serde(default)]
    summary: Option<String>,
}

/// Decides chapter and story boundaries.
#[derive(Debug, Clone)]
pub struct ChapterDecisionEngine {
    config: DecisionConfig,
    writer: Handler,
    planner: Handler,
    editor: Handler,
    retry: RetryPolicy,
    decided: u32,
}

impl ChapterDecisionEngine {
    /// Create an engine bound to the writer, planner and editor roles.
    pub fn new(config: &QuillConfig, registry: &RoleRegistry) -> Self {
        Self {
            config: config.decision.clone(),
            writer: registry.resolve(Role::Writer),
            planner: registry.resolve(Role::Planner),
            editor: registry.resolve(Role::Editor),
            retry: RetryPolicy::from_config(&config.retry),
            decided: 0,
        }
    }

    /// Chapters decided so far.
    pub fn decided_count(&self) -> u32 {
        self.decided
    }

    /// Forget previous decisions.
    pub fn reset(&mut self) {
        self.decided = 0;
    }

    /// Decide whether the chapter ending at the tail of `current_content` is complete.
    #[instrument(
        skip(self, current_content, planning),
        fields(content_len = current_content.len(), decided = self.decided)
    )]
    pub async fn should_end_chapter(
        &mut self,
        current_content: &str,
        planning: &PlanningData,
    ) -> Resolved<ChapterDecision> {
        let chapter_num = self.decided + 1;
        let prompt = format!(
            "You are an experienced novelist and story structure expert. Decide whether the \
             passage below reaches a natural chapter break: a completed beat or conflict, \
             released tension, or a natural pause.\n\n\
             [Current content]\n{}\n\n[Planning data]\n{}\n\n\
             Respond with a JSON object: {{\"should_end\": bool, \"confidence\": number 0-1, \
             \"reasoning\": string, \"suggested_title\": string, \"next_hint\": string}}",
            tail_chars(current_content, self.config.content_tail_chars),
            planning.preview(self.config.planning_preview_chars),
        );

        let default_title = format!("Chapter {}", chapter_num);
        let resolved = self
            .retry
            .resolve(
                Role::Writer,
                &self.writer,
                &prompt,
                |text| {
                    let raw: RawDecision = parse_structured(text, ParseMode::Lenient)?;
                    Ok(ChapterDecision {
                        should_end: raw.should_end,
                        confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
                        reasoning: raw.reasoning.unwrap_or_else(|| "model decision".to_string()),
                        suggested_title: raw
                            .suggested_title
                            .filter(|t| !t.trim().is_empty())
                            .unwrap_or_else(|| default_title.clone()),
                        next_hint: raw.next_hint.unwrap_or_default(),
                    })
                },
                || self.fallback_decision(current_content),
            )
            .await;

        self.decided += 1;
        debug!(
            should_end = resolved.value.should_end,
            confidence = resolved.value.confidence,
            fallback = resolved.is_fallback(),
            "Chapter decision"
        );
        resolved
    }

    /// Deterministic chapter decision.
    ///
    /// The chapter ends when the content is longer than the minimum chapter
    /// length and a paragraph break occurs within the trailing window.
    pub fn fallback_decision(&self, current_content: &str) -> ChapterDecision {
        let length = current_content.chars().count();
        let should_end = length > self.config.min_chapter_length
            && tail_chars(current_content, self.config.break_window_chars).contains('\n');
        ChapterDecision {
            should_end,
            confidence: self.config.fallback_confidence,
            reasoning: format!("length and paragraph structure heuristic (length: {})", length),
            suggested_title: format!("Chapter {}", self.decided + 1),
            next_hint: "follow the story's development".to_string(),
        }
    }

    /// Plan a variable-length list of chapters for `overall_idea`.
    #[instrument(skip(self, overall_idea))]
    pub async fn create_chapter_outline(
        &self,
        overall_idea: &str,
    ) -> Resolved<Vec<PlannedChapter>> {
        let prompt = format!(
            "Design a chapter plan for the story idea below. Do not fix a chapter count in \
             advance; split where the plot naturally turns, following cycles of conflict \
             and resolution.\n\n[Idea]\n{}\n\n\
             Respond with JSON: {{\"dynamic_chapters\": [{{\"title\": string, \"summary\": string, \
             \"key_events\": [string]}}]}}",
            overall_idea
        );

        self.retry
            .resolve(
                Role::Planner,
                &self.planner,
                &prompt,
                |text| {
                    let chapters = match parse_structured::<RawOutline>(text, ParseMode::Lenient)? {
                        RawOutline::Wrapped { dynamic_chapters } => dynamic_chapters,
                        RawOutline::Bare(chapters) => chapters,
                    };
                    if chapters.is_empty() {
                        return Err(ParseError::new(
                            ParseErrorKind::SchemaMismatch("empty chapter outline".to_string()),
                            text,
                        ));
                    }
                    Ok(chapters
                        .into_iter()
                        .enumerate()
                        .map(|(i, raw)| {
                            let number = i as u32 + 1;
                            PlannedChapter {
                                number,
                                title: if raw.title.trim().is_empty() {
                                    format!("Chapter {}", number)
                                } else {
                                    raw.title
                                },
                                summary: raw.summary,
                                key_events: raw.key_events,
                            }
                        })
                        .collect())
                },
                || fallback_outline(overall_idea),
            )
            .await
    }

    /// Judge whether the story should keep going after `chapters_so_far`.
    #[instrument(skip(self, chapters_so_far, planning), fields(chapters = chapters_so_far.len()))]
    pub async fn evaluate_overall_progress(
        &self,
        chapters_so_far: &[String],
        planning: &PlanningData,
    ) -> Resolved<ProgressAssessment> {
        let total_chars: usize = chapters_so_far.iter().map(|c| c.chars().count()).sum();
        let prompt = format!(
            "Assess the overall progress of this writing project.\n\n\
             [Chapters completed] {}\n[Total length] {}\n[Planning data]\n{}\n\n\
             Consider how far the plot has developed, whether more content is needed, and \
             the current pacing. Respond with JSON: {{\"progress_ratio\": number 0-1, \
             \"estimated_remaining\": integer, \"is_continuing\": bool, \"summary\": string}}",
            chapters_so_far.len(),
            total_chars,
            planning.preview(self.config.planning_preview_chars),
        );

        self.retry
            .resolve(
                Role::Editor,
                &self.editor,
                &prompt,
                |text| {
                    let raw: RawProgress = parse_structured(text, ParseMode::Lenient)?;
                    let fallback = self.fallback_progress(chapters_so_far);
                    Ok(ProgressAssessment {
                        progress_ratio: raw
                            .progress_ratio
                            .map(|r| r.clamp(0.0, 1.0))
                            .unwrap_or(fallback.progress_ratio),
                        estimated_remaining: raw
                            .estimated_remaining
                            .unwrap_or(fallback.estimated_remaining),
                        is_continuing: raw.is_continuing,
                        summary: raw.summary.unwrap_or(fallback.summary),
                    })
                },
                || self.fallback_progress(chapters_so_far),
            )
            .await
    }

    /// Deterministic progress assessment from the chapter count alone.
    pub fn fallback_progress(&self, chapters_so_far: &[String]) -> ProgressAssessment {
        let count = chapters_so_far.len() as u32;
        let expected = self.config.expected_chapters.max(1);
        let total_chars: usize = chapters_so_far.iter().map(|c| c.chars().count()).sum();
        ProgressAssessment {
            progress_ratio: (count as f64 / expected as f64).min(1.0),
            estimated_remaining: expected.saturating_sub(count).max(1),
            is_continuing: count < self.config.max_chapters,
            summary: format!("{} chapters completed, {} characters", count, total_chars),
        }
    }
}

fn fallback_outline(overall_idea: &str) -> Vec<PlannedChapter> {
    vec![PlannedChapter {
        number: 1,
        title: "Opening".to_string(),
        summary: format!("Opening built on: {}", overall_idea),
        key_events: Vec::new(),
    }]
}
