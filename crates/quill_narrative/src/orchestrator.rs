//! Phase state machine driving a whole story run.
//!
//! `Research -> Creation -> Review -> FinalCheck -> Done`, with `Aborted`
//! reachable from every phase. After each phase the orchestrator passes a
//! pause point; with manual control enabled a [`PauseController`] decides
//! whether to continue, rerun the phase, or stop.

use crate::{
    ChapterDecisionEngine, ChapterInfo, ContinuityTracker, Heuristics, ParseMode, RetryPolicy,
    ReviewAggregator, SessionEvent, SessionLog, StoryArchive, StoryExport, StoryStateStore,
    StructureCheck, head_chars, normalize_score, parse_structured, tail_chars,
};
use quill_core::{
    ChapterStatus, ContinuityReport, ContinuitySummary, PlanningData, QuillConfig, ReviewRecord,
    Role,
};
use quill_error::{
    ParseError, ParseErrorKind, QuillError, QuillResult, WorkflowError, WorkflowErrorKind,
};
use quill_interface::{
    Handler, PauseController, PauseDecision, Phase, ProgressEvent, ProgressSink, RoleRegistry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

const NOTE_PREVIEW_CHARS: usize = 200;
const FINAL_REQUEST_CHARS: usize = 6000;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Every phase finished
    Completed,
    /// Stopped on request; not an error
    Aborted {
        /// Why the run stopped
        reason: String,
    },
    /// A phase failed
    Error {
        /// What failed
        message: String,
    },
}

/// Result of the final check phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Fact-checker notes, when one was available
    pub fact_check_notes: Option<String>,
    /// Editor score over the whole story, normalized to `[0, 100]`
    pub editor_score: Option<f64>,
    /// Continuity over all chapters
    pub continuity: ContinuitySummary,
    /// Local structure check
    pub structure: StructureCheck,
}

/// Everything a run produced, however far it got.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    /// How the run ended
    pub status: WorkflowStatus,
    /// Phase the run was in when it ended
    pub last_phase: Phase,
    /// Story id, once the story exists
    pub story_id: Option<String>,
    /// Research output
    pub planning: Option<PlanningData>,
    /// Accumulated creation output
    pub content: String,
    /// Story and chapters as stored
    pub export: Option<StoryExport>,
    /// Every review round, in order
    pub reviews: Vec<ReviewRecord>,
    /// Every continuity report, in order
    pub continuity: Vec<ContinuityReport>,
    /// Final check result
    pub final_report: Option<FinalReport>,
    /// Session log of the run
    pub session: SessionLog,
}

impl WorkflowOutcome {
    /// Whether the run reached `Done`.
    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// Drives one story through all phases.
pub struct WorkflowOrchestrator {
    config: Arc<QuillConfig>,
    registry: RoleRegistry,
    decisions: ChapterDecisionEngine,
    continuity: ContinuityTracker,
    reviews: ReviewAggregator,
    store: StoryStateStore,
    retry: RetryPolicy,
    heuristics: Heuristics,
    progress: Option<Arc<dyn ProgressSink>>,
    pause: Option<Arc<dyn PauseController>>,
    archive: Option<StoryArchive>,
    cancelled: Arc<AtomicBool>,
    phase: Phase,
    story_id: Option<String>,
    planning: Option<PlanningData>,
    content: String,
    segments: Vec<String>,
    review_log: Vec<ReviewRecord>,
    final_report: Option<FinalReport>,
    session: SessionLog,
}

impl std::fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("phase", &self.phase)
            .field("story_id", &self.story_id)
            .field("roles", &self.registry.roles().collect::<Vec<_>>())
            .field("segments", &self.segments.len())
            .field("has_pause_controller", &self.pause.is_some())
            .field("has_archive", &self.archive.is_some())
            .finish()
    }
}

impl WorkflowOrchestrator {
    /// Build every component from one configuration and one registry.
    pub fn new(config: Arc<QuillConfig>, registry: RoleRegistry) -> Self {
        Self {
            decisions: ChapterDecisionEngine::new(&config, &registry),
            continuity: ContinuityTracker::new(&config, &registry),
            reviews: ReviewAggregator::new(&config, &registry),
            store: StoryStateStore::new(config.review.max_revision_rounds),
            retry: RetryPolicy::from_config(&config.retry),
            heuristics: Heuristics::new(),
            progress: None,
            pause: None,
            archive: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            phase: Phase::Research,
            story_id: None,
            planning: None,
            content: String::new(),
            segments: Vec::new(),
            review_log: Vec::new(),
            final_report: None,
            session: SessionLog::new(),
            config,
            registry,
        }
    }

    /// Report progress to `sink`.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Consult `controller` at pause points when manual control is enabled.
    pub fn with_pause_controller(mut self, controller: Arc<dyn PauseController>) -> Self {
        self.pause = Some(controller);
        self
    }

    /// Persist the story, its logs and its session into `archive`.
    pub fn with_archive(mut self, archive: StoryArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Use a fixed story id instead of a generated one.
    pub fn with_story_id(mut self, story_id: impl Into<String>) -> Self {
        self.story_id = Some(story_id.into());
        self
    }

    /// Flag that stops the run at the next unit-of-work boundary once set.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The story state store.
    pub fn store(&self) -> &StoryStateStore {
        &self.store
    }

    /// The continuity tracker.
    pub fn continuity(&self) -> &ContinuityTracker {
        &self.continuity
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run the whole workflow for `idea`.
    ///
    /// Never fails: errors and aborts come back as a [`WorkflowStatus`]
    /// together with whatever was produced up to that point.
    #[instrument(skip(self, idea, title), fields(idea_len = idea.len()))]
    pub async fn run(&mut self, idea: &str, title: &str) -> WorkflowOutcome {
        self.phase = Phase::Research;

        if self.registry.is_empty() {
            let error = QuillError::from(WorkflowError::new(WorkflowErrorKind::NoGenerator));
            warn!(error = %error, "Cannot start without a text generator");
            return self.finish(WorkflowStatus::Error {
                message: error.to_string(),
            });
        }

        while !self.phase.is_terminal() {
            if self.is_cancelled() {
                info!(phase = %self.phase, "Cancellation requested, stopping");
                return self.finish(WorkflowStatus::Aborted {
                    reason: "cancelled".to_string(),
                });
            }

            let phase = self.phase;
            info!(phase = %phase, "Entering phase");
            self.session.record(SessionEvent::PhaseStarted { phase });

            let result = match phase {
                Phase::Research => self.research(idea, title).await,
                Phase::Creation => self.creation().await,
                Phase::Review => self.review().await,
                Phase::FinalCheck => self.final_check().await,
                Phase::Done | Phase::Aborted => Ok(()),
            };
            if let Err(e) = result {
                warn!(phase = %phase, error = %e, "Phase failed");
                return self.finish(WorkflowStatus::Error {
                    message: e.to_string(),
                });
            }
            if self.is_cancelled() {
                info!(phase = %phase, "Cancellation requested, skipping pause point");
                return self.finish(WorkflowStatus::Aborted {
                    reason: "cancelled".to_string(),
                });
            }

            let decision = match self.pause_point(phase).await {
                Ok(decision) => decision,
                Err(e) => {
                    return self.finish(WorkflowStatus::Error {
                        message: e.to_string(),
                    });
                }
            };
            self.session.record(SessionEvent::Paused { phase, decision });

            match decision {
                PauseDecision::Continue => {
                    if let Err(e) = self.commit(phase) {
                        return self.finish(WorkflowStatus::Error {
                            message: e.to_string(),
                        });
                    }
                    self.phase = phase.next().unwrap_or(Phase::Done);
                }
                PauseDecision::Regenerate => {
                    info!(phase = %phase, "Regenerating phase");
                    self.rewind(phase);
                }
                PauseDecision::Exit => {
                    info!(phase = %phase, "Exit requested");
                    return self.finish(WorkflowStatus::Aborted {
                        reason: format!("exit requested after {}", phase),
                    });
                }
            }
        }

        self.finish(WorkflowStatus::Completed)
    }

    async fn pause_point(&self, phase: Phase) -> QuillResult<PauseDecision> {
        if !self.config.workflow.manual_control {
            return Ok(PauseDecision::Continue);
        }
        let Some(controller) = &self.pause else {
            debug!("Manual control enabled without a pause controller, continuing");
            return Ok(PauseDecision::Continue);
        };
        let summary = self.phase_summary(phase);
        controller.decide(phase, &summary).await.map_err(|e| {
            WorkflowError::new(WorkflowErrorKind::PauseFailed(e.to_string())).into()
        })
    }

    fn phase_summary(&self, phase: Phase) -> String {
        match phase {
            Phase::Research => self
                .planning
                .as_ref()
                .map(|p| {
                    format!(
                        "Planned {} chapter(s), target length {}",
                        p.planned_chapters.len(),
                        p.target_length
                    )
                })
                .unwrap_or_default(),
            Phase::Creation => format!(
                "{} chapter(s), {} characters",
                self.segments.len(),
                self.content.chars().count()
            ),
            Phase::Review => {
                let last_scores: Vec<String> = self
                    .current_chapter_ids()
                    .iter()
                    .filter_map(|id| {
                        self.review_log
                            .iter()
                            .rev()
                            .find(|r| r.chapter_id.as_deref() == Some(id.as_str()))
                            .map(|r| format!("{}: {:.1}", id, r.average_score))
                    })
                    .collect();
                format!("Review scores: {}", last_scores.join(", "))
            }
            Phase::FinalCheck => self
                .final_report
                .as_ref()
                .map(|r| format!("Structure score {:.0}", r.structure.structure_score))
                .unwrap_or_default(),
            Phase::Done | Phase::Aborted => String::new(),
        }
    }

    /// Settle the effects of a phase once the pause point let it through.
    fn commit(&mut self, phase: Phase) -> QuillResult<()> {
        if phase == Phase::Review {
            for chapter_id in self.current_chapter_ids() {
                let reviewing = self
                    .store
                    .chapter(&chapter_id)
                    .is_some_and(|c| *c.status() == ChapterStatus::Reviewing);
                if reviewing {
                    self.store
                        .update_chapter_status(&chapter_id, ChapterStatus::Approved)?;
                }
            }
            self.persist_story();
        }
        Ok(())
    }

    /// Undo what a phase did so it can run again.
    fn rewind(&mut self, phase: Phase) {
        match phase {
            Phase::Research => self.planning = None,
            Phase::Creation => {
                for chapter_id in self.current_chapter_ids() {
                    self.store.delete_chapter(&chapter_id);
                }
                self.content.clear();
                self.segments.clear();
                self.continuity.reset();
                self.decisions.reset();
            }
            Phase::FinalCheck => self.final_report = None,
            Phase::Review | Phase::Done | Phase::Aborted => {}
        }
    }

    fn current_chapter_ids(&self) -> Vec<String> {
        self.story_id
            .as_deref()
            .and_then(|id| self.store.story(id))
            .map(|s| s.chapter_ids().clone())
            .unwrap_or_default()
    }

    fn require_story(&self) -> QuillResult<String> {
        self.story_id
            .clone()
            .filter(|id| self.store.story(id).is_some())
            .ok_or_else(|| WorkflowError::new(WorkflowErrorKind::NoStory).into())
    }

    #[instrument(skip(self, idea, title))]
    async fn research(&mut self, idea: &str, title: &str) -> QuillResult<()> {
        let story_id = match &self.story_id {
            Some(id) => id.clone(),
            None => format!("story_{}", uuid::Uuid::new_v4().simple()),
        };
        if self.store.story(&story_id).is_none() {
            self.store.create_story(&story_id, title)?;
        }
        self.story_id = Some(story_id.clone());
        self.emit(Phase::Research, "analysis", "Analyzing the story idea", Some(0.0)).await;

        let analysis = self
            .retry
            .resolve(
                Role::Planner,
                &self.registry.resolve(Role::Planner),
                &format!(
                    "Analyze this story idea and plan its development. Respond with JSON \
                     including \"themes\", \"characters\", \"setting\", \"conflict\" and an \
                     optional integer \"target_length\".\n\n{}",
                    idea
                ),
                |text| parse_structured::<Value>(text, ParseMode::Lenient),
                || json!({ "idea": idea }),
            )
            .await
            .into_value();

        let target_length = analysis
            .get("target_length")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(self.config.creation.total_target_length);

        self.emit(Phase::Research, "outline", "Drafting the outline", Some(0.4)).await;
        let outline = self
            .retry
            .resolve(
                Role::Writer,
                &self.registry.resolve(Role::Writer),
                &format!(
                    "Write a short outline for a story based on this idea and analysis.\n\n\
                     [Idea]\n{}\n\n[Analysis]\n{}",
                    idea, analysis
                ),
                non_empty,
                || format!("Outline for: {}", idea),
            )
            .await
            .into_value();

        self.emit(Phase::Research, "chapters", "Planning chapters", Some(0.7)).await;
        let planned_chapters = self.decisions.create_chapter_outline(idea).await.into_value();

        let planning = PlanningData {
            idea: idea.to_string(),
            analysis,
            outline,
            planned_chapters,
            target_length,
        };
        self.store
            .insert_story_metadata(&story_id, "target_length", json!(target_length))?;
        self.store.insert_story_metadata(
            &story_id,
            "planned_chapters",
            json!(planning.planned_chapters.len()),
        )?;
        info!(
            target_length,
            planned = planning.planned_chapters.len(),
            "Research complete"
        );
        self.planning = Some(planning);
        self.emit(Phase::Research, "done", "Research complete", Some(1.0)).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn creation(&mut self) -> QuillResult<()> {
        let story_id = self.require_story()?;
        let planning = self
            .planning
            .clone()
            .ok_or_else(|| WorkflowError::new(WorkflowErrorKind::NoStory))?;
        let Handler::Available(writer) = self.registry.resolve(Role::Writer) else {
            let kind = WorkflowErrorKind::MissingHandler(Role::Writer.to_string());
            return Err(WorkflowError::new(kind).into());
        };

        let metric = self.config.creation.length_metric;
        let target = planning.target_length.max(1);
        let max_iterations = self.config.creation.max_iterations;

        for step in 1..=max_iterations {
            if self.is_cancelled() {
                info!(step, "Cancellation requested, leaving creation loop");
                break;
            }
            let progress = metric.measure(&self.content) as f64 / target as f64;
            self.emit(
                Phase::Creation,
                &format!("chapter {}", step),
                &format!("Writing part {}", step),
                Some(progress),
            )
            .await;

            let prompt = self.creation_prompt(&planning, step);
            let segment = self
                .retry
                .generate(&writer, Role::Writer, &prompt)
                .await
                .map_err(|e| {
                    WorkflowError::new(WorkflowErrorKind::WriterExhausted {
                        step,
                        message: e.to_string(),
                    })
                })?;
            if !self.content.is_empty() {
                self.content.push_str("\n\n");
            }
            self.content.push_str(&segment);
            self.segments.push(segment.clone());

            let decision = self.decisions.should_end_chapter(&self.content, &planning).await;
            let decision_fallback = decision.is_fallback();
            let decision = decision.into_value();

            let chapter_id = self
                .store
                .create_chapter(&story_id, &decision.suggested_title, &segment)?
                .chapter_id()
                .clone();

            let report = self.continuity.check_continuity(&segment, step).await;
            self.continuity
                .update_for_chapter(
                    &segment,
                    &ChapterInfo {
                        chapter_num: step,
                        title: decision.suggested_title.clone(),
                    },
                )
                .await;
            for issue in report.high_severity() {
                warn!(
                    element = %issue.element,
                    issue = %issue.issue,
                    "High severity continuity issue"
                );
            }
            if let Some(archive) = &self.archive {
                if let Err(e) = archive.append_continuity(&story_id, &report) {
                    warn!(error = %e, "Failed to persist continuity report");
                }
            }
            self.store
                .insert_chapter_metadata(&chapter_id, "continuity_issues", json!(report.score))?;

            self.evaluate_chapter(step, &segment).await;
            self.archive_update(step, &segment).await;

            self.session.record(SessionEvent::CreationStep {
                step,
                content_length: metric.measure(&self.content),
                chapter_id,
                decision: decision.clone(),
                decision_fallback,
                continuity_issues: report.score,
            });

            let length = metric.measure(&self.content);
            debug!(
                step,
                length,
                target,
                should_end = decision.should_end,
                "Creation step complete"
            );
            if length >= target {
                info!(step, length, "Target length reached");
                self.emit(Phase::Creation, "target reached", "Target length reached", Some(1.0))
                    .await;
                break;
            }
            if decision.should_end {
                continue;
            }
            let assessment = self
                .decisions
                .evaluate_overall_progress(&self.segments, &planning)
                .await
                .into_value();
            if !assessment.is_continuing {
                info!(step, summary = %assessment.summary, "Story judged complete");
                break;
            }
            if step == max_iterations {
                warn!(max_iterations, "Creation stopped at the iteration cap");
            }
        }

        self.persist_story();
        Ok(())
    }

    fn creation_prompt(&self, planning: &PlanningData, step: u32) -> String {
        let previous = if self.content.is_empty() {
            "(none)"
        } else {
            tail_chars(&self.content, self.config.creation.context_tail_chars)
        };
        let planned = planning
            .planned_chapters
            .get(step as usize - 1)
            .map(|c| format!("{}: {}", c.title, c.summary))
            .unwrap_or_else(|| "continue the story naturally".to_string());
        format!(
            "Write part {} of the story.\n\n[Idea]\n{}\n\n[Outline]\n{}\n\n[Planned]\n{}\n\n\
             [Story so far, ending]\n{}\n\n\
             Aim for about {} characters and stay consistent with what came before.",
            step,
            planning.idea,
            planning.outline,
            planned,
            previous,
            self.config.creation.target_length_per_chapter
        )
    }

    async fn evaluate_chapter(&mut self, step: u32, segment: &str) {
        let handler = self.registry.resolve(Role::Editor);
        if !handler.is_available() {
            return;
        }
        let evaluation = self
            .retry
            .resolve(
                Role::Editor,
                &handler,
                &format!(
                    "Evaluate this chapter for readers. Respond with JSON containing \
                     \"reader_experience\": {{\"engagement_level\": \"low|medium|high\", \
                     \"drop_off_risk\": \"low|medium|high\"}} \
                     and \"actionable_suggestions\".\n\n{}",
                    segment
                ),
                |text| parse_structured::<Value>(text, ParseMode::Lenient),
                || Value::Null,
            )
            .await;
        if evaluation.is_fallback() {
            return;
        }
        let value = evaluation.into_value();
        let experience = value
            .get("reader_experience")
            .or_else(|| value.pointer("/comprehensive_evaluation/reader_experience"));
        let label = |key: &str| {
            experience
                .and_then(|e| e.get(key))
                .and_then(Value::as_str)
                .map(str::to_lowercase)
        };
        let at_risk = label("drop_off_risk").as_deref() == Some("high")
            || label("engagement_level").as_deref() == Some("low");
        if at_risk {
            let note = format!("Chapter {} may lose readers", step);
            warn!(step, "Editor flagged reader experience risk");
            self.emit(Phase::Creation, "editor advisory", &note, None).await;
            self.session.record(SessionEvent::Advisory {
                step,
                role: Role::Editor,
                note,
            });
        }
    }

    async fn archive_update(&mut self, step: u32, segment: &str) {
        let Handler::Available(archivist) = self.registry.resolve(Role::Archivist) else {
            return;
        };
        let prompt = format!(
            "Update the story archive with anything new in chapter {}: characters, places, \
             rules and open threads.\n\n{}",
            step,
            head_chars(segment, FINAL_REQUEST_CHARS)
        );
        match self.retry.generate(&archivist, Role::Archivist, &prompt).await {
            Ok(text) => self.session.record(SessionEvent::Advisory {
                step,
                role: Role::Archivist,
                note: head_chars(text.trim(), NOTE_PREVIEW_CHARS).to_string(),
            }),
            Err(e) => warn!(step, error = %e, "Archive update failed"),
        }
    }

    #[instrument(skip(self))]
    async fn review(&mut self) -> QuillResult<()> {
        let story_id = self.require_story()?;
        let chapter_ids = self.current_chapter_ids();
        let total = chapter_ids.len().max(1);

        for (index, chapter_id) in chapter_ids.iter().enumerate() {
            if self.is_cancelled() {
                info!("Cancellation requested, leaving review");
                break;
            }
            let settled = self
                .store
                .chapter(chapter_id)
                .is_none_or(|c| c.status().is_settled());
            if settled {
                continue;
            }
            self.emit(
                Phase::Review,
                chapter_id,
                &format!("Reviewing chapter {} of {}", index + 1, total),
                Some(index as f64 / total as f64),
            )
            .await;

            let review = self.reviews.review_chapter(&mut self.store, chapter_id).await?;
            for record in &review.rounds {
                if let Some(archive) = &self.archive {
                    if let Err(e) = archive.append_review(&story_id, record) {
                        warn!(error = %e, "Failed to persist review record");
                    }
                }
            }
            self.store.insert_chapter_metadata(
                chapter_id,
                "review_score",
                json!(review.final_score()),
            )?;
            self.session.record(SessionEvent::Reviewed {
                chapter_id: chapter_id.clone(),
                rounds: review.rounds.len(),
                score: review.final_score(),
            });
            self.review_log.extend(review.rounds);
        }

        self.content = self
            .store
            .chapters_of(&story_id)
            .iter()
            .map(|c| c.content().as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.emit(Phase::Review, "done", "Review complete", Some(1.0)).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn final_check(&mut self) -> QuillResult<()> {
        let story_id = self.require_story()?;
        let text = self.store.export_story_as_text(&story_id)?;
        let excerpt = head_chars(&text, FINAL_REQUEST_CHARS);

        self.emit(Phase::FinalCheck, "fact check", "Checking facts and logic", Some(0.0)).await;
        let fact_check_notes = self
            .retry
            .resolve(
                Role::FactChecker,
                &self.registry.resolve(Role::FactChecker),
                &format!(
                    "Check the finished story for factual and logical problems.\n\n{}",
                    excerpt
                ),
                |t| non_empty(t).map(Some),
                || None,
            )
            .await
            .into_value();

        self.emit(Phase::FinalCheck, "editor", "Scoring the finished story", Some(0.3)).await;
        let editor_score = self
            .retry
            .resolve(
                Role::Editor,
                &self.registry.resolve(Role::Editor),
                &format!(
                    "Give an overall evaluation of the finished story. Respond with JSON \
                     containing a numeric \"overall_score\" from 0 to 100.\n\n{}",
                    excerpt
                ),
                |t| parse_structured::<Value>(t, ParseMode::Lenient),
                || Value::Null,
            )
            .await
            .into_value();
        let editor_score = normalize_score(&editor_score);

        let structure = self.heuristics.structure(&text);
        let continuity = self.continuity.summary();

        for chapter_id in self.current_chapter_ids() {
            let reviewing = self
                .store
                .chapter(&chapter_id)
                .is_some_and(|c| *c.status() == ChapterStatus::Reviewing);
            if reviewing {
                self.store
                    .update_chapter_status(&chapter_id, ChapterStatus::Approved)?;
            }
            self.store
                .update_chapter_status(&chapter_id, ChapterStatus::Final)?;
        }

        info!(
            structure_score = structure.structure_score,
            editor_score = ?editor_score,
            issues = continuity.total_issues,
            "Final check complete"
        );
        self.final_report = Some(FinalReport {
            fact_check_notes,
            editor_score,
            continuity,
            structure,
        });
        self.persist_story();
        self.emit(Phase::FinalCheck, "done", "Story finalized", Some(1.0)).await;
        Ok(())
    }

    fn persist_story(&self) {
        let (Some(archive), Some(story_id)) = (&self.archive, &self.story_id) else {
            return;
        };
        let result = self
            .store
            .export_story_as_structured(story_id)
            .map_err(QuillError::from)
            .and_then(|export| archive.save_story(&export).map(|_| ()))
            .and_then(|_| archive.save_session(story_id, &self.session));
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist story");
        }
    }

    async fn emit(&self, phase: Phase, step: &str, message: &str, progress: Option<f64>) {
        let Some(sink) = &self.progress else {
            return;
        };
        let event = ProgressEvent::new(phase, step, message, progress);
        if let Err(e) = sink.report(&event).await {
            warn!(error = %e, step, "Progress sink failed");
        }
    }

    fn finish(&mut self, status: WorkflowStatus) -> WorkflowOutcome {
        let last_phase = self.phase;
        self.phase = match status {
            WorkflowStatus::Completed => Phase::Done,
            _ => Phase::Aborted,
        };
        self.persist_story();
        info!(status = ?status, "Workflow finished");

        WorkflowOutcome {
            status,
            last_phase,
            story_id: self.story_id.clone(),
            planning: self.planning.clone(),
            content: self.content.clone(),
            export: self
                .story_id
                .as_deref()
                .and_then(|id| self.store.export_story_as_structured(id).ok()),
            reviews: self.review_log.clone(),
            continuity: self.continuity.reports().to_vec(),
            final_report: self.final_report.clone(),
            session: self.session.clone(),
        }
    }
}

fn non_empty(text: &str) -> Result<String, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ParseError::new(ParseErrorKind::NoStructuredContent, text))
    } else {
        Ok(trimmed.to_string())
    }
}
