//! Test utilities for Quill engine tests.
//!
//! This module provides mock collaborators and test helpers.

pub mod mock_generator;

#[allow(unused_imports)]
pub use mock_generator::{
    MockBehavior, MockGenerator, MockResponse, ScriptedPause, fast_config, recording_sink,
};
