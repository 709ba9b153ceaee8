//! Story generation engine for Quill.
//!
//! This crate holds the parts of Quill with real state: deciding where
//! chapters end, tracking continuity across chapters, the story and chapter
//! state machine, multi-reviewer scoring with revisions, and the phase
//! orchestrator that sequences a whole run.
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_narrative::WorkflowOrchestrator;
//! use quill_core::QuillConfig;
//! use quill_interface::RoleRegistry;
//! use std::sync::Arc;
//!
//! # async fn example(generator: Arc<dyn quill_interface::TextGenerator>) {
//! let config = Arc::new(QuillConfig::load().unwrap());
//! let registry = RoleRegistry::new().with_default(generator);
//! let mut orchestrator = WorkflowOrchestrator::new(config, registry);
//!
//! let outcome = orchestrator.run("A lighthouse keeper finds a map", "The Map").await;
//! let chapters = outcome.export.map(|e| e.chapters.len()).unwrap_or(0);
//! println!("{:?}: {} chapters", outcome.status, chapters);
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod continuity;
mod decision;
mod extraction;
mod heuristics;
mod orchestrator;
mod retry;
mod review;
mod session;
mod store;
mod text;

pub use archive::StoryArchive;
pub use continuity::{ChapterInfo, ContinuityTracker, normalize_key};
pub use decision::ChapterDecisionEngine;
pub use extraction::{ParseMode, parse_structured};
pub use heuristics::{Heuristics, StructureCheck};
pub use orchestrator::{FinalReport, WorkflowOrchestrator, WorkflowOutcome, WorkflowStatus};
pub use retry::{FallbackReason, Resolved, RetryPolicy, Source};
pub use review::{ChapterReview, ReviewAggregator, aggregate, normalize_score};
pub use session::{SessionEntry, SessionEvent, SessionLog};
pub use store::{StoryExport, StoryStateStore};
pub use text::{head_chars, tail_chars};
