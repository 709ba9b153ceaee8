//! Collaborator traits.

use crate::{PauseDecision, Phase, ProgressEvent};
use async_trait::async_trait;
use quill_core::Role;
use quill_error::QuillResult;

/// Core trait every text generation backend implements.
///
/// A generator may serve several roles; the role tells it which persona or
/// system instructions to apply.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt` while acting as `role`.
    async fn generate(&self, role: Role, prompt: &str) -> QuillResult<String>;

    /// Provider name (e.g., "openai", "mock").
    fn provider_name(&self) -> &'static str;

    /// Model identifier.
    fn model_name(&self) -> &str;
}

/// Receiver of progress events.
///
/// Delivery is best-effort: the orchestrator logs and discards errors.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Handle one progress event.
    async fn report(&self, event: &ProgressEvent) -> QuillResult<()>;
}

/// External (usually human) control consulted at pause points.
#[async_trait]
pub trait PauseController: Send + Sync {
    /// Decide what to do after `phase` completed, given a short summary of its result.
    async fn decide(&self, phase: Phase, summary: &str) -> QuillResult<PauseDecision>;
}
