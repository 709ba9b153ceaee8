//! Trait definitions for the Quill story engine.
//!
//! The engine talks to the outside world through three collaborators:
//! a [`TextGenerator`] that produces text for a [`Role`](quill_core::Role),
//! a [`ProgressSink`] that receives progress events, and a [`PauseController`]
//! that answers at pause points. Generators are bound to roles once, in a
//! [`RoleRegistry`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod registry;
mod traits;
mod types;

pub use registry::{Handler, RoleRegistry};
pub use traits::{PauseController, ProgressSink, TextGenerator};
pub use types::{PauseDecision, Phase, ProgressEvent};
