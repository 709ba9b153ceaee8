//! Quill - dynamic multi-chapter story generation
//!
//! Quill coordinates several text-generation roles to write a long-form story
//! split into chapters. It decides where chapters end, tracks characters and
//! events across chapters, and gates every chapter behind a multi-reviewer
//! score before the story is finalized.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use quill::{ChatCompletionsClient, QuillConfig, RoleRegistry, WorkflowOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(QuillConfig::load()?);
//!     let client = Arc::new(ChatCompletionsClient::from_env()?);
//!     let registry = RoleRegistry::new().with_default(client);
//!
//!     let mut orchestrator = WorkflowOrchestrator::new(config, registry);
//!     let outcome = orchestrator.run("A lighthouse keeper finds a map", "The Map").await;
//!     println!("{}", outcome.content);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `quill_error` - Error types
//! - `quill_core` - Story, chapter and review data types plus configuration
//! - `quill_interface` - Collaborator traits and the role registry
//! - `quill_models` - Chat-completions text generator
//! - `quill_narrative` - Decision engine, continuity tracker, state store,
//!   review aggregator and workflow orchestrator
//!
//! This crate (`quill`) re-exports everything for convenience.

pub use quill_core::*;
pub use quill_error::*;
pub use quill_interface::*;
pub use quill_models::*;
pub use quill_narrative::*;

mod console;
pub mod observability;

pub use console::{ConsoleProgress, PromptedPause, format_event, parse_decision};
