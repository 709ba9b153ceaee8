//! Engine configuration.
//!
//! One [`QuillConfig`] is built at startup and handed to every component.
//! Sources, later overriding earlier:
//! - Bundled defaults (include_str! from quill.toml)
//! - User config in home directory (~/.config/quill/quill.toml)
//! - User config in current directory (./quill.toml)

use crate::{LengthMetric, Role};
use config::{Config, File, FileFormat};
use quill_error::{ConfigError, QuillError, QuillResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../../../quill.toml");

/// Creation loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreationConfig {
    /// Story length at which the creation loop stops
    pub total_target_length: usize,
    /// Length each chapter aims for, also the review length target
    pub target_length_per_chapter: usize,
    /// Hard cap on creation loop iterations
    pub max_iterations: u32,
    /// How length is counted against targets
    pub length_metric: LengthMetric,
    /// Trailing characters of prior content handed to the writer
    pub context_tail_chars: usize,
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            total_target_length: 5000,
            target_length_per_chapter: 3000,
            max_iterations: 20,
            length_metric: LengthMetric::Chars,
            context_tail_chars: 1000,
        }
    }
}

/// Review loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Average score needed to accept
    pub score_threshold: f64,
    /// Review rounds per chapter, also the revising loop-back budget
    pub max_revision_rounds: u32,
    /// Content longer than `target * factor` is not revised further
    pub length_overrun_factor: f64,
    /// Score recorded for a reviewer whose call failed
    pub error_score: f64,
    /// Roles fanned out to in every round
    pub reviewers: Vec<Role>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            score_threshold: 80.0,
            max_revision_rounds: 3,
            length_overrun_factor: 1.2,
            error_score: 60.0,
            reviewers: vec![
                Role::FactChecker,
                Role::DialogueSpecialist,
                Role::Editor,
                Role::EnvironmentSpecialist,
                Role::RhythmSpecialist,
            ],
        }
    }
}

/// Chapter decision settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Trailing characters of content sent with a decision request
    pub content_tail_chars: usize,
    /// Leading characters of serialized planning data sent with a request
    pub planning_preview_chars: usize,
    /// Heuristic: content must be longer than this to end a chapter
    pub min_chapter_length: usize,
    /// Heuristic: a paragraph break must occur within this many trailing characters
    pub break_window_chars: usize,
    /// Confidence attached to heuristic decisions
    pub fallback_confidence: f64,
    /// Chapters a story is assumed to need when no assessment is available
    pub expected_chapters: u32,
    /// Chapters after which the fallback assessment stops the story
    pub max_chapters: u32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            content_tail_chars: 2000,
            planning_preview_chars: 500,
            min_chapter_length: 2500,
            break_window_chars: 100,
            fallback_confidence: 0.5,
            expected_chapters: 3,
            max_chapters: 5,
        }
    }
}

/// Continuity tracker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuityConfig {
    /// Characters kept per prior chapter when building check context
    pub prior_summary_chars: usize,
    /// Characters kept as a chapter summary
    pub summary_chars: usize,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            prior_summary_chars: 500,
            summary_chars: 200,
        }
    }
}

/// Retry policy for generation calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// First backoff delay
    pub initial_backoff_ms: u64,
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Upper bound on a single backoff delay
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_retries: 2,
            max_delay_secs: 8,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Stop at a pause point after every phase
    pub manual_control: bool,
    /// Directory the story archive writes to
    pub output_dir: PathBuf,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            manual_control: false,
            output_dir: PathBuf::from("stories"),
        }
    }
}

/// Complete engine configuration.
///
/// # Examples
///
/// ```
/// use quill_core::QuillConfig;
///
/// let config = QuillConfig::default();
/// assert_eq!(config.review.score_threshold, 80.0);
/// assert_eq!(config.review.max_revision_rounds, 3);
/// assert_eq!(config.creation.total_target_length, 5000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    /// Creation loop
    pub creation: CreationConfig,
    /// Review loop
    pub review: ReviewConfig,
    /// Chapter decisions
    pub decision: DecisionConfig,
    /// Continuity tracking
    pub continuity: ContinuityConfig,
    /// Generation retries
    pub retry: RetryConfig,
    /// Orchestration
    pub workflow: WorkflowConfig,
}

impl QuillConfig {
    /// Load configuration from a specific file layered over the bundled defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> QuillResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> QuillResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/quill/quill.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("quill").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.review.score_threshold) {
            return Err(ConfigError::new(format!(
                "review.score_threshold must be within 0..=100, got {}",
                self.review.score_threshold
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(role) = self.review.reviewers.iter().find(|role| !seen.insert(**role)) {
            return Err(ConfigError::new(format!(
                "review.reviewers lists {} more than once",
                role
            )));
        }
        if self.review.max_revision_rounds == 0 {
            return Err(ConfigError::new("review.max_revision_rounds must be at least 1"));
        }
        if self.creation.max_iterations == 0 {
            return Err(ConfigError::new("creation.max_iterations must be at least 1"));
        }
        if self.creation.total_target_length == 0 {
            return Err(ConfigError::new("creation.total_target_length must be positive"));
        }
        if !(0.0..=1.0).contains(&self.decision.fallback_confidence) {
            return Err(ConfigError::new(format!(
                "decision.fallback_confidence must be within 0..=1, got {}",
                self.decision.fallback_confidence
            )));
        }
        if self.decision.expected_chapters == 0 {
            return Err(ConfigError::new("decision.expected_chapters must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_defaults_match_default_impl() {
        let bundled: QuillConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(bundled, QuillConfig::default());
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[review]\nscore_threshold = 70.0\nreviewers = [\"editor\"]").unwrap();

        let config = QuillConfig::from_file(file.path()).unwrap();
        assert_eq!(config.review.score_threshold, 70.0);
        assert_eq!(config.review.reviewers, vec![Role::Editor]);
        assert_eq!(config.review.max_revision_rounds, 3);
        assert_eq!(config.creation.max_iterations, 20);
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut config = QuillConfig::default();
        config.review.max_revision_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_reviewers() {
        let mut config = QuillConfig::default();
        config.review.reviewers = vec![Role::Editor, Role::FactChecker, Role::Editor];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("editor"), "{}", err);
    }
}
