//! CLI command definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Quill - dynamic multi-chapter story generation
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(
    about = "Write multi-chapter stories with continuity tracking and reviewer gates",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full workflow for a story idea
    Write(WriteArgs),

    /// Show a saved story's status and chapters
    Show {
        /// Story identifier
        story_id: String,

        /// Archive directory (defaults to workflow.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Print a saved story
    Export {
        /// Story identifier
        story_id: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ExportFormat,

        /// Archive directory (defaults to workflow.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// List saved stories
    List {
        /// Archive directory (defaults to workflow.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

/// Arguments of `quill write`
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// The story idea
    #[arg(long)]
    pub idea: String,

    /// Story title (defaults to the idea)
    #[arg(long)]
    pub title: Option<String>,

    /// Configuration file replacing the layered defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stop for a decision after every phase
    #[arg(long)]
    pub manual: bool,

    /// Archive directory (defaults to workflow.output_dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Export format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Chapter titles and prose
    Text,
    /// Story, chapters and version history
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write() {
        let cli = Cli::parse_from(["quill", "write", "--idea", "a fox", "--manual", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Write(args) => {
                assert_eq!(args.idea, "a fox");
                assert!(args.manual);
                assert!(args.title.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_format() {
        let cli = Cli::parse_from(["quill", "export", "story_1", "--format", "json"]);
        match cli.command {
            Commands::Export { story_id, format, .. } => {
                assert_eq!(story_id, "story_1");
                assert_eq!(format, ExportFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
