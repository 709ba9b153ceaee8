//! Multi-reviewer scoring and the revision loop.
//!
//! Reviewers answer in several historical shapes. [`normalize_score`] maps
//! each of them onto `[0, 100]`; the aggregator averages whatever normalized
//! and decides whether the chapter is accepted or revised once more.

use crate::{
    FallbackReason, ParseMode, RetryPolicy, Source, StoryStateStore, head_chars, parse_structured,
};
use chrono::Utc;
use futures::future::join_all;
use quill_core::{
    ChapterStatus, LengthMetric, QuillConfig, ReviewConfig, ReviewOutcome, ReviewRecord,
    ReviewerFeedback, Role,
};
use quill_error::{QuillResult, StoreError, StoreErrorKind};
use quill_interface::{Handler, RoleRegistry, TextGenerator};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const GAP_KEYS: &[&str] = &["logic_gaps", "unanchored_risks", "gaps", "risks"];
const FEEDBACK_PREVIEW_CHARS: usize = 300;

/// Map one reviewer's feedback onto `[0, 100]`.
///
/// Recognized shapes, tried in order:
/// - a numeric `score` (or `overall_score`), numbers or numeric strings
/// - a categorical `coherence_score` of `low`, `medium` or `high`
/// - a list of gaps or risks: `max(30, 85 - 5 * count)`
///
/// Anything else yields `None`.
///
/// # Examples
///
/// ```
/// use quill_narrative::normalize_score;
/// use serde_json::json;
///
/// assert_eq!(normalize_score(&json!({"score": 80})), Some(80.0));
/// assert_eq!(normalize_score(&json!({"coherence_score": "high"})), Some(90.0));
/// assert_eq!(normalize_score(&json!({"logic_gaps": ["a", "b"]})), Some(75.0));
/// assert_eq!(normalize_score(&json!({"comments": "nice"})), None);
/// ```
pub fn normalize_score(feedback: &Value) -> Option<f64> {
    let object = feedback.as_object()?;

    let explicit = ["score", "overall_score"]
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(numeric);
    if let Some(score) = explicit {
        return Some(score.clamp(0.0, 100.0));
    }

    if let Some(label) = object.get("coherence_score").and_then(Value::as_str) {
        match label.trim().to_lowercase().as_str() {
            "low" => return Some(50.0),
            "medium" => return Some(70.0),
            "high" => return Some(90.0),
            _ => {}
        }
    }

    GAP_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(Value::as_array)
        .map(|gaps| (85.0 - 5.0 * gaps.len() as f64).max(30.0))
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Per-reviewer feedback merged into one round.
///
/// Merging goes through role-keyed maps, so the result does not depend on the
/// order reviewers completed in.
pub fn aggregate(feedback: &[ReviewerFeedback]) -> (BTreeMap<Role, f64>, f64, usize) {
    let scores: BTreeMap<Role, f64> = feedback
        .iter()
        .filter_map(|f| f.score.map(|score| (f.role, score)))
        .collect();
    let count = scores.len();
    let average = if count == 0 {
        0.0
    } else {
        scores.values().sum::<f64>() / count as f64
    };
    (scores, average, count)
}

/// Everything that happened while reviewing one chapter.
#[derive(Debug, Clone)]
pub struct ChapterReview {
    /// Reviewed chapter
    pub chapter_id: String,
    /// One record per round, in order
    pub rounds: Vec<ReviewRecord>,
    /// Content after the last revision
    pub final_content: String,
    /// Revision passes applied
    pub revisions: u32,
}

impl ChapterReview {
    /// Average score of the last round, 0 when nothing was reviewed.
    pub fn final_score(&self) -> f64 {
        self.rounds.last().map(|r| r.average_score).unwrap_or(0.0)
    }
}

/// Fans a chapter out to every configured reviewer and drives revisions.
pub struct ReviewAggregator {
    config: ReviewConfig,
    target_length: usize,
    metric: LengthMetric,
    reviewers: Vec<(Role, Arc<dyn TextGenerator>)>,
    writer: Handler,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ReviewAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewAggregator")
            .field("config", &self.config)
            .field("target_length", &self.target_length)
            .field("reviewers", &self.reviewers.iter().map(|(r, _)| *r).collect::<Vec<_>>())
            .field("writer", &self.writer)
            .finish()
    }
}

impl ReviewAggregator {
    /// Resolve the configured reviewers; unbound ones are left out of the fan-out.
    ///
    /// A role listed more than once is asked once.
    pub fn new(config: &QuillConfig, registry: &RoleRegistry) -> Self {
        let mut listed = BTreeSet::new();
        let reviewers = config
            .review
            .reviewers
            .iter()
            .filter(|role| listed.insert(**role))
            .filter_map(|role| match registry.resolve(*role) {
                Handler::Available(generator) => Some((*role, generator)),
                Handler::Missing(_) => {
                    debug!(role = %role, "Reviewer not registered, skipping");
                    None
                }
            })
            .collect();
        Self {
            config: config.review.clone(),
            target_length: config.creation.target_length_per_chapter,
            metric: config.creation.length_metric,
            reviewers,
            writer: registry.resolve(Role::Writer),
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Roles taking part in every round.
    pub fn reviewer_roles(&self) -> Vec<Role> {
        self.reviewers.iter().map(|(role, _)| *role).collect()
    }

    /// Ask every reviewer about `content` concurrently.
    ///
    /// A failed call yields the configured error score together with the
    /// error; text without usable structure yields no score at all.
    #[instrument(
        skip(self, content),
        fields(content_len = content.len(), reviewers = self.reviewers.len())
    )]
    pub async fn collect_feedback(&self, content: &str) -> Vec<ReviewerFeedback> {
        let calls = self.reviewers.iter().map(|(role, generator)| {
            let handler = Handler::Available(Arc::clone(generator));
            let prompt = review_prompt(*role, content);
            async move {
                let resolved = self
                    .retry
                    .resolve(
                        *role,
                        &handler,
                        &prompt,
                        |text| parse_structured::<Value>(text, ParseMode::Lenient),
                        || Value::Null,
                    )
                    .await;
                match resolved.source {
                    Source::Generated => ReviewerFeedback {
                        role: *role,
                        score: normalize_score(&resolved.value),
                        error: None,
                        raw: resolved.value,
                    },
                    Source::Fallback(FallbackReason::Parse(e)) => ReviewerFeedback {
                        role: *role,
                        score: None,
                        error: None,
                        raw: Value::String(e.raw),
                    },
                    Source::Fallback(reason) => ReviewerFeedback {
                        role: *role,
                        score: Some(self.config.error_score),
                        error: Some(reason.to_string()),
                        raw: Value::Null,
                    },
                }
            }
        });
        join_all(calls).await
    }

    /// Run one scored round and record it with a provisional outcome.
    pub async fn review_round(
        &self,
        content: &str,
        chapter_id: Option<&str>,
        round: u32,
    ) -> ReviewRecord {
        let feedback = self.collect_feedback(content).await;
        let (per_reviewer_scores, average_score, valid_score_count) = aggregate(&feedback);

        let mut raw_feedback = BTreeMap::new();
        let mut errors = BTreeMap::new();
        for item in feedback {
            if let Some(error) = item.error {
                errors.insert(item.role, error);
            }
            raw_feedback.insert(item.role, item.raw);
        }

        let outcome = if average_score >= self.config.score_threshold {
            ReviewOutcome::Accepted
        } else {
            ReviewOutcome::Revise
        };
        info!(round, score = average_score, valid = valid_score_count, "Review round scored");

        ReviewRecord {
            chapter_id: chapter_id.map(str::to_string),
            round,
            per_reviewer_scores,
            average_score,
            valid_score_count,
            raw_feedback,
            errors,
            outcome,
            created_at: Utc::now(),
        }
    }

    /// Review a chapter until it is accepted or no revision is allowed.
    ///
    /// The chapter is moved into `reviewing` and left there; committing the
    /// approval is the caller's decision. Settled chapters are not touched.
    #[instrument(skip(self, store))]
    pub async fn review_chapter(
        &self,
        store: &mut StoryStateStore,
        chapter_id: &str,
    ) -> QuillResult<ChapterReview> {
        let chapter = store.chapter(chapter_id).ok_or_else(|| {
            StoreError::new(StoreErrorKind::ChapterNotFound(chapter_id.to_string()))
        })?;
        let mut content = chapter.content().clone();
        let mut review = ChapterReview {
            chapter_id: chapter_id.to_string(),
            rounds: Vec::new(),
            final_content: content.clone(),
            revisions: 0,
        };
        if chapter.status().is_settled() {
            debug!(status = %chapter.status(), "Chapter already settled, skipping review");
            return Ok(review);
        }
        store.update_chapter_status(chapter_id, ChapterStatus::Reviewing)?;

        let max_rounds = self.config.max_revision_rounds;
        let length_limit = self.target_length as f64 * self.config.length_overrun_factor;

        for round in 1..=max_rounds {
            let mut record = self.review_round(&content, Some(chapter_id), round).await;

            if record.outcome == ReviewOutcome::Revise {
                record.outcome = if self.reviewers.is_empty() {
                    accept_as_is("no reviewers registered")
                } else if round >= max_rounds {
                    accept_as_is("revision rounds exhausted")
                } else if self.metric.measure(&content) as f64 > length_limit {
                    accept_as_is("content already exceeds the length limit")
                } else if !store.revision_budget_left(chapter_id) {
                    accept_as_is("chapter revision budget exhausted")
                } else {
                    match self.revise(&content, &record).await {
                        Ok(revised) => {
                            store.update_chapter_status(chapter_id, ChapterStatus::Revising)?;
                            store.update_chapter_content(
                                chapter_id,
                                &revised,
                                &format!("revision after round {}", round),
                            )?;
                            store.update_chapter_status(chapter_id, ChapterStatus::Reviewing)?;
                            content = revised;
                            review.revisions += 1;
                            ReviewOutcome::Revise
                        }
                        Err(reason) => {
                            warn!(round, reason = %reason, "Revision unavailable, accepting as is");
                            accept_as_is(reason)
                        }
                    }
                };
            }

            let done = record.outcome != ReviewOutcome::Revise;
            review.rounds.push(record);
            if done {
                break;
            }
        }

        info!(
            rounds = review.rounds.len(),
            revisions = review.revisions,
            score = review.final_score(),
            "Chapter review finished"
        );
        review.final_content = content;
        Ok(review)
    }

    async fn revise(&self, content: &str, record: &ReviewRecord) -> Result<String, String> {
        let Handler::Available(writer) = &self.writer else {
            return Err("no writer registered".to_string());
        };
        let prompt = revision_prompt(content, record);
        match self.retry.generate(writer, Role::Writer, &prompt).await {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Err("writer returned an empty revision".to_string()),
            Err(e) => Err(format!("revision failed: {}", e)),
        }
    }
}

fn accept_as_is(reason: impl Into<String>) -> ReviewOutcome {
    ReviewOutcome::AcceptedAsIs {
        reason: reason.into(),
    }
}

fn review_prompt(role: Role, content: &str) -> String {
    format!(
        "Review the following chapter as the {} of this story.\n\
         Respond with a JSON object containing a numeric \"score\" from 0 to 100, \
         \"comments\" and a list of \"suggestions\".\n\n{}",
        role, content
    )
}

fn revision_prompt(content: &str, record: &ReviewRecord) -> String {
    let notes = record
        .raw_feedback
        .iter()
        .filter(|(_, raw)| !raw.is_null())
        .map(|(role, raw)| {
            let text = match raw {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("- {}: {}", role, head_chars(&text, FEEDBACK_PREVIEW_CHARS))
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Revise the chapter below. It scored {:.1} out of 100.\n\
         Reviewer notes:\n{}\n\n\
         Return only the full revised chapter.\n\n{}",
        record.average_score, notes, content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feedback(role: Role, raw: Value) -> ReviewerFeedback {
        ReviewerFeedback {
            role,
            score: normalize_score(&raw),
            error: None,
            raw,
        }
    }

    #[test]
    fn test_mixed_shapes_average() {
        let items = vec![
            feedback(Role::FactChecker, json!({"score": 80})),
            feedback(Role::Editor, json!({"coherence_score": "high"})),
            feedback(Role::DialogueSpecialist, json!({"logic_gaps": ["g1", "g2"]})),
        ];
        let (scores, average, count) = aggregate(&items);
        assert_eq!(count, 3);
        assert_eq!(scores[&Role::DialogueSpecialist], 75.0);
        assert!((average - 81.666_666).abs() < 0.01);
    }

    #[test]
    fn test_unscored_entries_are_ignored() {
        let items = vec![
            feedback(Role::FactChecker, json!({"score": 70})),
            feedback(Role::Editor, json!({"score": "excellent"})),
            feedback(Role::RhythmSpecialist, Value::String("prose only".into())),
        ];
        let (_, average, count) = aggregate(&items);
        assert_eq!(count, 1);
        assert_eq!(average, 70.0);
    }

    #[test]
    fn test_empty_round_averages_zero() {
        assert_eq!(aggregate(&[]), (BTreeMap::new(), 0.0, 0));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = feedback(Role::Editor, json!({"score": 91}));
        let b = feedback(Role::FactChecker, json!({"coherence_score": "low"}));
        assert_eq!(aggregate(&[a.clone(), b.clone()]), aggregate(&[b, a]));
    }

    #[test]
    fn test_normalizer_edges() {
        assert_eq!(normalize_score(&json!({"score": 140})), Some(100.0));
        assert_eq!(normalize_score(&json!({"score": " 72.5 "})), Some(72.5));
        assert_eq!(normalize_score(&json!({"overall_score": 66})), Some(66.0));
        assert_eq!(normalize_score(&json!({"coherence_score": "Medium"})), Some(70.0));
        let many: Vec<u32> = (0..20).collect();
        assert_eq!(normalize_score(&json!({"unanchored_risks": many})), Some(30.0));
        assert_eq!(normalize_score(&json!({"logic_gaps": []})), Some(85.0));
        assert_eq!(normalize_score(&json!([1, 2])), None);
    }
}
