//! Mock collaborators for testing.

#![allow(dead_code)]

use async_trait::async_trait;
use quill_core::{QuillConfig, Role};
use quill_error::{GenerationError, GenerationErrorKind, QuillError, QuillResult};
use quill_interface::{
    PauseController, PauseDecision, Phase, ProgressEvent, ProgressSink, TextGenerator,
};
use std::sync::{Arc, Mutex};

/// Behavior configuration for mock responses.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always return the given text
    Fixed(String),
    /// Always return the specified error
    Fail(GenerationErrorKind),
    /// Fail N times with the error, then succeed with the text
    FailThenSucceed {
        fail_count: usize,
        error: GenerationErrorKind,
        success_text: String,
    },
    /// Return a sequence of responses, repeating the last one when exhausted
    Sequence(Vec<MockResponse>),
    /// Return the prompt unchanged
    Echo,
}

/// A single mock response (success or error).
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(GenerationErrorKind),
}

/// Mock text generator for testing.
///
/// Records every call so tests can assert on roles and prompts.
pub struct MockGenerator {
    behavior: MockBehavior,
    call_count: Arc<Mutex<usize>>,
    calls: Arc<Mutex<Vec<(Role, String)>>>,
}

impl MockGenerator {
    /// Create a mock with custom behavior.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(Mutex::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always answers with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    /// Create a mock that always fails with `error`.
    pub fn failing(error: GenerationErrorKind) -> Self {
        Self::new(MockBehavior::Fail(error))
    }

    /// Create a mock that answers with `texts` in order.
    pub fn sequence<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(MockBehavior::Sequence(
            texts
                .into_iter()
                .map(|t| MockResponse::Success(t.into()))
                .collect(),
        ))
    }

    /// Wrap into the shape the registry expects.
    pub fn shared(self) -> Arc<dyn TextGenerator> {
        Arc::new(self)
    }

    /// Get the number of times generate() was called.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Shared handle to the call counter, usable after the mock moved into a registry.
    pub fn counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.call_count)
    }

    /// Shared handle to the recorded calls.
    pub fn call_log(&self) -> Arc<Mutex<Vec<(Role, String)>>> {
        Arc::clone(&self.calls)
    }

    fn next_response(&self, prompt: &str) -> QuillResult<String> {
        let mut count = self.call_count.lock().unwrap();
        let current = *count;
        *count += 1;

        let error =
            |kind: &GenerationErrorKind| QuillError::from(GenerationError::new(kind.clone()));
        match &self.behavior {
            MockBehavior::Fixed(text) => Ok(text.clone()),
            MockBehavior::Fail(kind) => Err(error(kind)),
            MockBehavior::FailThenSucceed {
                fail_count,
                error: kind,
                success_text,
            } => {
                if current < *fail_count {
                    Err(error(kind))
                } else {
                    Ok(success_text.clone())
                }
            }
            MockBehavior::Sequence(responses) => {
                match responses.get(current).or_else(|| responses.last()) {
                    Some(MockResponse::Success(text)) => Ok(text.clone()),
                    Some(MockResponse::Error(kind)) => Err(error(kind)),
                    None => Err(error(&GenerationErrorKind::EmptyResponse)),
                }
            }
            MockBehavior::Echo => Ok(prompt.to_string()),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, role: Role, prompt: &str) -> QuillResult<String> {
        self.calls.lock().unwrap().push((role, prompt.to_string()));
        self.next_response(prompt)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Pause controller answering from a script, then `Continue`.
pub struct ScriptedPause {
    answers: Mutex<Vec<PauseDecision>>,
    pub seen: Arc<Mutex<Vec<Phase>>>,
}

impl ScriptedPause {
    pub fn new(answers: Vec<PauseDecision>) -> Self {
        let mut answers = answers;
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl PauseController for ScriptedPause {
    async fn decide(&self, phase: Phase, _summary: &str) -> QuillResult<PauseDecision> {
        self.seen.lock().unwrap().push(phase);
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(PauseDecision::Continue))
    }
}

struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    fail: bool,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(&self, event: &ProgressEvent) -> QuillResult<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            Err(GenerationError::new(GenerationErrorKind::Rejected("sink offline".into())).into())
        } else {
            Ok(())
        }
    }
}

/// A progress sink recording every event, optionally failing after recording.
pub fn recording_sink(fail: bool) -> (Arc<dyn ProgressSink>, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink {
        events: Arc::clone(&events),
        fail,
    };
    (Arc::new(sink), events)
}

/// Default configuration with retries that never sleep long.
pub fn fast_config() -> QuillConfig {
    let mut config = QuillConfig::default();
    config.retry.initial_backoff_ms = 1;
    config.retry.max_delay_secs = 0;
    config
}
