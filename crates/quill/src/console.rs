//! Terminal collaborators for the `quill` binary.

use async_trait::async_trait;
use quill_error::{QuillResult, WorkflowError, WorkflowErrorKind};
use quill_interface::{PauseController, PauseDecision, Phase, ProgressEvent, ProgressSink};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// One-line rendering of a progress event.
pub fn format_event(event: &ProgressEvent) -> String {
    match event.progress {
        Some(p) => format!(
            "[{}] {}: {} ({:.0}%)",
            event.phase,
            event.step,
            event.message,
            p * 100.0
        ),
        None => format!("[{}] {}: {}", event.phase, event.step, event.message),
    }
}

/// Interpret a line typed at a pause prompt.
///
/// An empty line continues.
pub fn parse_decision(input: &str) -> Option<PauseDecision> {
    match input.trim().to_lowercase().as_str() {
        "" | "c" | "continue" | "y" | "yes" => Some(PauseDecision::Continue),
        "r" | "regenerate" | "retry" => Some(PauseDecision::Regenerate),
        "e" | "exit" | "q" | "quit" => Some(PauseDecision::Exit),
        _ => None,
    }
}

/// Progress sink that prints each event to stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleProgress;

#[async_trait]
impl ProgressSink for ConsoleProgress {
    async fn report(&self, event: &ProgressEvent) -> QuillResult<()> {
        eprintln!("{}", format_event(event));
        Ok(())
    }
}

/// Pause controller that asks on the terminal.
///
/// End of input counts as exit.
#[derive(Debug, Clone, Default)]
pub struct PromptedPause;

#[async_trait]
impl PauseController for PromptedPause {
    async fn decide(&self, phase: Phase, summary: &str) -> QuillResult<PauseDecision> {
        let failed =
            |e: std::io::Error| WorkflowError::new(WorkflowErrorKind::PauseFailed(e.to_string()));
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        eprintln!("\n== {} finished ==\n{}", phase, summary);
        loop {
            eprint!("[c]ontinue, [r]egenerate or [e]xit? ");
            std::io::stderr().flush().map_err(failed)?;

            let Some(line) = lines.next_line().await.map_err(failed)? else {
                debug!(%phase, "Input closed at pause point");
                return Ok(PauseDecision::Exit);
            };
            match parse_decision(&line) {
                Some(decision) => return Ok(decision),
                None => eprintln!("Unrecognized answer: {}", line.trim()),
            }
        }
    }
}
