//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the quill binary.

mod commands;
mod stories;
mod write;

pub use commands::{Cli, Commands, ExportFormat, WriteArgs};
pub use stories::{export_story, list_stories, open_archive, show_story};
pub use write::{summarize, write_story};
