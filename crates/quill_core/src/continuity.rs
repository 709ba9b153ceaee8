//! Continuity tracking records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The four kinds of tracked story elements.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ElementCategory {
    /// People and creatures
    Characters,
    /// Places
    Locations,
    /// Plot events
    Events,
    /// World rules and constraints
    Rules,
}

/// Accumulated knowledge about one story element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryElementRecord {
    /// Display name as first seen
    pub name: String,
    /// Chapter the element first appeared in
    pub first_seen_chapter: u32,
    /// Most recent chapter the element appeared in
    pub last_seen_chapter: u32,
    /// Latest description
    pub description: String,
    /// Traits and attributes, merged as a set union
    pub attributes: BTreeSet<String>,
    /// Previous descriptions, oldest first
    pub history: Vec<String>,
}

impl StoryElementRecord {
    /// Create a record first seen in `chapter`.
    pub fn new(name: impl Into<String>, chapter: u32, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            first_seen_chapter: chapter,
            last_seen_chapter: chapter,
            description: description.into(),
            attributes: BTreeSet::new(),
            history: Vec::new(),
        }
    }

    /// Merge a new sighting into the record.
    ///
    /// The description is replaced only when the new one is non-empty and
    /// differs; the replaced description moves to `history`. Attributes are
    /// unioned. Merging the same sighting twice leaves the record unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::StoryElementRecord;
    ///
    /// let mut mira = StoryElementRecord::new("Mira", 1, "a young smith");
    /// mira.merge(2, "a master smith", ["brave".to_string()]);
    /// mira.merge(2, "a master smith", ["brave".to_string()]);
    /// assert_eq!(mira.history, vec!["a young smith".to_string()]);
    /// assert_eq!(mira.attributes.len(), 1);
    /// assert_eq!(mira.last_seen_chapter, 2);
    /// ```
    pub fn merge(
        &mut self,
        chapter: u32,
        description: &str,
        attributes: impl IntoIterator<Item = String>,
    ) {
        self.first_seen_chapter = self.first_seen_chapter.min(chapter);
        self.last_seen_chapter = self.last_seen_chapter.max(chapter);
        let description = description.trim();
        if !description.is_empty() && description != self.description {
            if !self.description.is_empty() {
                self.history.push(std::mem::take(&mut self.description));
            }
            self.description = description.to_string();
        }
        self.attributes.extend(
            attributes
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        );
    }
}

/// How serious a continuity issue is.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic
    #[display("low")]
    Low,
    /// Worth fixing
    #[default]
    #[display("medium")]
    Medium,
    /// Contradiction the reader will notice
    #[display("high")]
    High,
}

impl Severity {
    /// Read a free-form severity label, defaulting to medium.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::Severity;
    ///
    /// assert_eq!(Severity::from_label("HIGH"), Severity::High);
    /// assert_eq!(Severity::from_label("严重"), Severity::High);
    /// assert_eq!(Severity::from_label("whatever"), Severity::Medium);
    /// ```
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" | "critical" | "severe" | "高" | "严重" => Severity::High,
            "low" | "minor" | "低" | "轻微" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

/// A single flagged continuity problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    /// Issue category (character, location, timeline, rule, recap)
    #[serde(rename = "type")]
    pub kind: String,
    /// Element the issue concerns
    pub element: String,
    /// What is wrong
    pub issue: String,
    /// How serious it is
    pub severity: Severity,
    /// Suggested fix
    pub suggestion: String,
}

/// Continuity check result for one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityReport {
    /// Chapter number that was checked
    pub chapter_num: u32,
    /// Flagged problems
    pub inconsistencies: Vec<Inconsistency>,
    /// Softer observations
    pub warnings: Vec<String>,
    /// Number of inconsistencies
    pub score: usize,
    /// One-line summary
    pub summary: String,
}

impl ContinuityReport {
    /// Build a report, deriving `score` and `summary` from the findings.
    pub fn new(
        chapter_num: u32,
        inconsistencies: Vec<Inconsistency>,
        warnings: Vec<String>,
    ) -> Self {
        let score = inconsistencies.len();
        let summary = if score == 0 && warnings.is_empty() {
            format!("Chapter {}: no continuity issues", chapter_num)
        } else {
            format!(
                "Chapter {}: {} inconsistencies, {} warnings",
                chapter_num,
                score,
                warnings.len()
            )
        };
        Self {
            chapter_num,
            inconsistencies,
            warnings,
            score,
            summary,
        }
    }

    /// Issues tagged high severity.
    pub fn high_severity(&self) -> impl Iterator<Item = &Inconsistency> {
        self.inconsistencies
            .iter()
            .filter(|i| i.severity == Severity::High)
    }
}

/// Aggregate view over every continuity check run so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuitySummary {
    /// Chapters with element updates
    pub chapters_tracked: usize,
    /// Reports produced
    pub chapters_checked: usize,
    /// Inconsistencies across all reports
    pub total_issues: usize,
    /// High-severity inconsistencies across all reports
    pub high_severity_issues: usize,
    /// Inconsistencies grouped by type
    pub issues_by_type: BTreeMap<String, usize>,
    /// `total_issues / max(chapters_tracked, 1)`
    pub inconsistency_rate: f64,
    /// Tracked elements per category
    pub element_counts: BTreeMap<ElementCategory, usize>,
}
