//! Retry-with-fallback for AI-backed decisions.
//!
//! Every component that asks a generator for structured data goes through
//! [`RetryPolicy::resolve`]: a missing handler falls back at once, transient
//! generation errors are retried with exponential backoff, and permanent
//! errors or unparseable output fall back to the caller's deterministic value.

use quill_core::{RetryConfig, Role};
use quill_error::{ParseError, QuillResult, RetryableError};
use quill_interface::{Handler, TextGenerator};
use std::sync::Arc;
use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};
use tracing::{debug, warn};

/// Why a fallback value was used.
#[derive(Debug, Clone, derive_more::Display)]
pub enum FallbackReason {
    /// No generator bound to the role
    #[display("no handler for {}", _0)]
    MissingHandler(Role),
    /// Generation failed after retries
    #[display("generation failed: {}", _0)]
    Generation(String),
    /// Generated text could not be parsed
    #[display("unparseable response: {}", _0)]
    Parse(ParseError),
}

/// Which path produced a resolved value.
#[derive(Debug, Clone)]
pub enum Source {
    /// Parsed from generated text
    Generated,
    /// Deterministic fallback
    Fallback(FallbackReason),
}

/// A value together with the path that produced it.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The value
    pub value: T,
    /// Where it came from
    pub source: Source,
}

impl<T> Resolved<T> {
    /// Whether the fallback produced the value.
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, Source::Fallback(_))
    }

    /// Unwrap the value, dropping provenance.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Bounded retry policy for generation calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    initial_backoff_ms: u64,
    max_retries: usize,
    max_delay_secs: u64,
}

impl RetryPolicy {
    /// Build the policy from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_backoff_ms: config.initial_backoff_ms.max(1),
            max_retries: config.max_retries,
            max_delay_secs: config.max_delay_secs,
        }
    }

    /// Call `generator`, retrying transient failures.
    pub async fn generate(
        &self,
        generator: &Arc<dyn TextGenerator>,
        role: Role,
        prompt: &str,
    ) -> QuillResult<String> {
        let strategy = ExponentialBackoff::from_millis(self.initial_backoff_ms)
            .factor(2)
            .max_delay(std::time::Duration::from_secs(self.max_delay_secs))
            .map(jitter)
            .take(self.max_retries);

        Retry::spawn(strategy, || {
            let generator = Arc::clone(generator);
            async move {
                match generator.generate(role, prompt).await {
                    Ok(text) => Ok(text),
                    Err(e) if e.is_retryable() => {
                        warn!(role = %role, error = %e, "Generation failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => {
                        warn!(
                            role = %role,
                            error = %e,
                            "Permanent generation error, failing immediately"
                        );
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await
    }

    /// Generate with `handler`, parse the text, or fall back.
    ///
    /// `parse` decides what counts as usable output; `fallback` must be a pure
    /// deterministic computation since it runs whenever anything goes wrong.
    pub async fn resolve<T, P, F>(
        &self,
        role: Role,
        handler: &Handler,
        prompt: &str,
        parse: P,
        fallback: F,
    ) -> Resolved<T>
    where
        P: FnOnce(&str) -> Result<T, ParseError>,
        F: FnOnce() -> T,
    {
        let reason = match handler {
            Handler::Missing(missing) => FallbackReason::MissingHandler(*missing),
            Handler::Available(generator) => match self.generate(generator, role, prompt).await {
                Ok(text) => match parse(&text) {
                    Ok(value) => {
                        return Resolved {
                            value,
                            source: Source::Generated,
                        };
                    }
                    Err(e) => FallbackReason::Parse(e),
                },
                Err(e) => FallbackReason::Generation(e.to_string()),
            },
        };

        match &reason {
            FallbackReason::MissingHandler(_) => {
                debug!(role = %role, reason = %reason, "Using fallback")
            }
            _ => warn!(role = %role, reason = %reason, "Using fallback"),
        }
        Resolved {
            value: fallback(),
            source: Source::Fallback(reason),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
