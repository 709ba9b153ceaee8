//! Quill CLI binary.
//!
//! This binary provides command-line access to Quill's functionality:
//! - Write a story from an idea through research, creation, review and final check
//! - Inspect and export stories saved in the archive

use clap::Parser;
use quill::observability::{ObservabilityConfig, init_observability_with_config};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, export_story, list_stories, show_story, write_story};

    // API keys may live in a .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_observability_with_config(
        ObservabilityConfig::default()
            .with_verbose(cli.verbose)
            .with_json_logs(cli.json_logs),
    )?;

    match cli.command {
        Commands::Write(args) => {
            let outcome = write_story(args).await?;
            if !outcome.content.is_empty() {
                println!("{}", outcome.content);
            }
            eprintln!("\n{}", cli::summarize(&outcome));
            if let quill::WorkflowStatus::Error { message } = outcome.status {
                return Err(message.into());
            }
        }

        Commands::Show {
            story_id,
            output_dir,
        } => {
            let archive = cli::open_archive(output_dir)?;
            println!("{}", show_story(&archive, &story_id)?);
        }

        Commands::Export {
            story_id,
            format,
            output_dir,
        } => {
            let archive = cli::open_archive(output_dir)?;
            println!("{}", export_story(&archive, &story_id, format)?);
        }

        Commands::List { output_dir } => {
            let archive = cli::open_archive(output_dir)?;
            println!("{}", list_stories(&archive)?);
        }
    }

    Ok(())
}
