//! Error types for the Quill story engine.
//!
//! This crate provides the foundation error types used throughout the Quill workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use quill_error::{QuillResult, StoreError, StoreErrorKind};
//!
//! fn find_story() -> QuillResult<String> {
//!     Err(StoreError::new(StoreErrorKind::StoryNotFound("tale".to_string())))?
//! }
//!
//! match find_story() {
//!     Ok(story) => println!("Got: {}", story),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generation;
mod io;
mod json;
mod parse;
mod store;
mod workflow;

pub use config::ConfigError;
pub use error::{QuillError, QuillErrorKind, QuillResult};
pub use generation::{GenerationError, GenerationErrorKind, RetryableError};
pub use io::IoError;
pub use json::JsonError;
pub use parse::{ParseError, ParseErrorKind};
pub use store::{StoreError, StoreErrorKind};
pub use workflow::{WorkflowError, WorkflowErrorKind};
