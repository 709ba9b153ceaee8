//! `quill write` command handler.

use crate::cli::WriteArgs;
use quill::{
    ChatCompletionsClient, ConsoleProgress, PromptedPause, QuillConfig, QuillResult, RoleRegistry,
    StoryArchive, TextGenerator, WorkflowOrchestrator, WorkflowOutcome, WorkflowStatus, head_chars,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, instrument, warn};

const TITLE_CHARS: usize = 40;

/// Resolve the configuration for a run and apply command-line overrides.
pub fn run_config(args: &WriteArgs) -> QuillResult<QuillConfig> {
    let mut config = match &args.config {
        Some(path) => QuillConfig::from_file(path)?,
        None => QuillConfig::load()?,
    };
    if args.manual {
        config.workflow.manual_control = true;
    }
    if let Some(dir) = &args.output_dir {
        config.workflow.output_dir = dir.clone();
    }
    Ok(config)
}

/// Run the full workflow for `args.idea` against the configured endpoint.
#[instrument(skip_all, fields(manual = args.manual))]
pub async fn write_story(args: WriteArgs) -> QuillResult<WorkflowOutcome> {
    let config = run_config(&args)?;
    let client = Arc::new(ChatCompletionsClient::from_env()?);
    info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "Using text generator"
    );

    let archive = StoryArchive::new(&config.workflow.output_dir)?;
    let manual = config.workflow.manual_control;
    let registry = RoleRegistry::new().with_default(client);

    let mut orchestrator = WorkflowOrchestrator::new(Arc::new(config), registry)
        .with_progress_sink(Arc::new(ConsoleProgress))
        .with_archive(archive);
    if manual {
        orchestrator = orchestrator.with_pause_controller(Arc::new(PromptedPause));
    }

    let cancel = orchestrator.cancellation_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current chapter");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let title = match args.title {
        Some(title) => title,
        None => head_chars(args.idea.trim(), TITLE_CHARS).to_string(),
    };
    Ok(orchestrator.run(&args.idea, &title).await)
}

/// Summary lines printed after a run.
pub fn summarize(outcome: &WorkflowOutcome) -> String {
    let status = match &outcome.status {
        WorkflowStatus::Completed => "completed".to_string(),
        WorkflowStatus::Aborted { reason } => format!("aborted ({})", reason),
        WorkflowStatus::Error { message } => format!("error: {}", message),
    };
    let mut lines = vec![format!("status: {} after {}", status, outcome.last_phase)];
    if let Some(story_id) = &outcome.story_id {
        lines.push(format!("story: {}", story_id));
    }
    if let Some(export) = &outcome.export {
        lines.push(format!(
            "chapters: {}, length: {}",
            export.chapters.len(),
            export.story.word_count()
        ));
    }
    if let Some(report) = &outcome.final_report {
        lines.push(format!(
            "structure score: {:.0}, continuity issues: {}",
            report.structure.structure_score, report.continuity.total_issues
        ));
        if let Some(score) = report.editor_score {
            lines.push(format!("editor score: {:.1}", score));
        }
    }
    lines.join("\n")
}
