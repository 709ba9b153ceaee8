//! Core data types for the Quill story engine.
//!
//! This crate provides the data model shared by every Quill component: stories,
//! chapters and their lifecycle, continuity records, review records, chapter
//! decisions, the typed [`Role`] set, and the explicit [`QuillConfig`] object.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chapter;
mod config;
mod continuity;
mod decision;
mod length;
mod planning;
mod review;
mod role;
mod story;

pub use chapter::{Chapter, ChapterStatus, ChapterVersion};
pub use config::{
    ContinuityConfig, CreationConfig, DecisionConfig, QuillConfig, RetryConfig, ReviewConfig,
    WorkflowConfig,
};
pub use continuity::{
    ContinuityReport, ContinuitySummary, ElementCategory, Inconsistency, Severity,
    StoryElementRecord,
};
pub use decision::{ChapterDecision, PlannedChapter, ProgressAssessment};
pub use length::LengthMetric;
pub use planning::PlanningData;
pub use review::{ReviewOutcome, ReviewRecord, ReviewerFeedback};
pub use role::Role;
pub use story::{Story, StoryStatus};
