//! Cross-chapter continuity tracking.

use crate::{Heuristics, ParseMode, Resolved, RetryPolicy, head_chars, parse_structured};
use quill_core::{
    ContinuityConfig, ContinuityReport, ContinuitySummary, ElementCategory, Inconsistency,
    QuillConfig, Role, Severity, StoryElementRecord,
};
use quill_error::{ParseError, ParseErrorKind};
use quill_interface::{Handler, RoleRegistry};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

/// Characters of chapter content sent with an extraction or check request.
const REQUEST_CONTENT_CHARS: usize = 2000;

/// Longest local event name kept as a record key.
const EVENT_NAME_CHARS: usize = 60;

/// Identity of the chapter being tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    /// 1-based chapter number
    pub chapter_num: u32,
    /// Chapter title
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(default, alias = "title")]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "traits", alias = "features")]
    attributes: Vec<String>,
}

/// Extraction reply: a bare list, or lists keyed by category name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawElements {
    Bare(Vec<RawElement>),
    Keyed(BTreeMap<String, Value>),
}

impl RawElements {
    /// Elements filed under `category`; other categories in the reply are ignored.
    fn into_category(
        self,
        category: ElementCategory,
        raw: &str,
    ) -> Result<Vec<RawElement>, ParseError> {
        match self {
            RawElements::Bare(items) => Ok(items),
            RawElements::Keyed(mut lists) => match lists.remove(&category.to_string()) {
                Some(value) => serde_json::from_value(value).map_err(|e| {
                    ParseError::new(ParseErrorKind::SchemaMismatch(e.to_string()), raw)
                }),
                None => {
                    debug!(%category, "Reply has no list for this category");
                    Ok(Vec::new())
                }
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    element: String,
    #[serde(default)]
    issue: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    suggestion: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawWarning {
    Text(String),
    Detailed {
        #[serde(default, rename = "type")]
        kind: String,
        #[serde(default)]
        description: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawCheck {
    #[serde(default)]
    inconsistencies: Vec<RawIssue>,
    #[serde(default)]
    warnings: Vec<RawWarning>,
}

/// Normalized lookup key for element names.
///
/// # Examples
///
/// ```
/// use quill_narrative::normalize_key;
///
/// assert_eq!(normalize_key("  Old   Tom "), "old tom");
/// ```
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `text` mentions `key` as a whole word.
///
/// Han ideographs carry no word boundaries, so keys edged by them match
/// anywhere on that side.
fn mentions(text: &str, key: &str) -> bool {
    let (Some(first), Some(last)) = (key.chars().next(), key.chars().last()) else {
        return false;
    };
    let boundary = |c: char| if needs_word_boundary(c) { r"\b" } else { "" };
    let pattern = format!("{}{}{}", boundary(first), regex::escape(key), boundary(last));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

fn needs_word_boundary(c: char) -> bool {
    c.is_alphanumeric()
        && !matches!(
            c as u32,
            0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2CEAF
        )
}

/// Running model of story elements across chapters.
#[derive(Debug, Clone)]
pub struct ContinuityTracker {
    config: ContinuityConfig,
    archivist: Handler,
    retry: RetryPolicy,
    heuristics: Heuristics,
    elements: BTreeMap<ElementCategory, BTreeMap<String, StoryElementRecord>>,
    snapshots: BTreeMap<u32, String>,
    reports: Vec<ContinuityReport>,
}

impl ContinuityTracker {
    /// Create a tracker using the archivist role for AI extraction and checks.
    pub fn new(config: &QuillConfig, registry: &RoleRegistry) -> Self {
        Self {
            config: config.continuity.clone(),
            archivist: registry.resolve(Role::Archivist),
            retry: RetryPolicy::from_config(&config.retry),
            heuristics: Heuristics::new(),
            elements: ElementCategory::iter().map(|c| (c, BTreeMap::new())).collect(),
            snapshots: BTreeMap::new(),
            reports: Vec::new(),
        }
    }

    /// Forget every element, snapshot and report.
    pub fn reset(&mut self) {
        for records in self.elements.values_mut() {
            records.clear();
        }
        self.snapshots.clear();
        self.reports.clear();
    }

    /// Records of one category, keyed by normalized name.
    pub fn elements(
        &self,
        category: ElementCategory,
    ) -> Option<&BTreeMap<String, StoryElementRecord>> {
        self.elements.get(&category)
    }

    /// Look up a record by display or normalized name.
    pub fn record(&self, category: ElementCategory, name: &str) -> Option<&StoryElementRecord> {
        self.elements.get(&category)?.get(&normalize_key(name))
    }

    /// Reports produced so far, in check order.
    pub fn reports(&self) -> &[ContinuityReport] {
        &self.reports
    }

    /// Merge the elements of a new chapter into the model.
    ///
    /// Re-running with the same chapter is idempotent: records are keyed by
    /// normalized name and merged, never duplicated.
    #[instrument(skip(self, content), fields(chapter = info.chapter_num))]
    pub async fn update_for_chapter(&mut self, content: &str, info: &ChapterInfo) {
        let chapter = info.chapter_num;
        self.snapshots.insert(chapter, content.to_string());

        let excerpt = head_chars(content, REQUEST_CONTENT_CHARS);
        let (characters, locations, events, rules) = tokio::join!(
            self.extract(ElementCategory::Characters, excerpt),
            self.extract(ElementCategory::Locations, excerpt),
            self.extract(ElementCategory::Events, excerpt),
            self.extract(ElementCategory::Rules, excerpt),
        );

        for (category, resolved) in [
            (ElementCategory::Characters, characters),
            (ElementCategory::Locations, locations),
            (ElementCategory::Events, events),
            (ElementCategory::Rules, rules),
        ] {
            if resolved.is_fallback() {
                self.extract_locally(category, content, chapter);
                continue;
            }
            for raw in resolved.value {
                self.upsert(category, &raw.name, chapter, &raw.description, raw.attributes);
            }
        }

        debug!(
            characters = self.count(ElementCategory::Characters),
            locations = self.count(ElementCategory::Locations),
            events = self.count(ElementCategory::Events),
            rules = self.count(ElementCategory::Rules),
            "Continuity model updated"
        );
    }

    async fn extract(&self, category: ElementCategory, excerpt: &str) -> Resolved<Vec<RawElement>> {
        let prompt = format!(
            "Extract the {} from the chapter below. Respond with JSON: \
             {{\"{}\": [{{\"name\": string, \"description\": string, \"attributes\": [string]}}]}}\
             \n\n[Chapter]\n{}",
            category, category, excerpt
        );
        self.retry
            .resolve(
                Role::Archivist,
                &self.archivist,
                &prompt,
                |text| {
                    let raw: RawElements = parse_structured(text, ParseMode::Lenient)?;
                    Ok(raw
                        .into_category(category, text)?
                        .into_iter()
                        .filter(|e| !e.name.trim().is_empty())
                        .collect())
                },
                Vec::new,
            )
            .await
    }

    fn extract_locally(&mut self, category: ElementCategory, content: &str, chapter: u32) {
        match category {
            ElementCategory::Characters => {
                for name in self.heuristics.candidate_names(content) {
                    let description = format!("{}, first mentioned in chapter {}", name, chapter);
                    self.upsert_sighting(category, &name, chapter, &description);
                }
            }
            ElementCategory::Events => {
                for sentence in self.heuristics.candidate_events(content) {
                    let name = head_chars(&sentence, EVENT_NAME_CHARS).to_string();
                    self.upsert_sighting(category, &name, chapter, &sentence);
                }
            }
            ElementCategory::Locations | ElementCategory::Rules => {}
        }
    }

    /// Record a sighting, using `description` only when the element is new.
    fn upsert_sighting(
        &mut self,
        category: ElementCategory,
        name: &str,
        chapter: u32,
        description: &str,
    ) {
        let key = normalize_key(name);
        let records = self.elements.entry(category).or_default();
        match records.get_mut(&key) {
            Some(record) => record.merge(chapter, "", Vec::new()),
            None => {
                records.insert(key, StoryElementRecord::new(name.trim(), chapter, description));
            }
        }
    }

    fn upsert(
        &mut self,
        category: ElementCategory,
        name: &str,
        chapter: u32,
        description: &str,
        attributes: Vec<String>,
    ) {
        let key = normalize_key(name);
        if key.is_empty() {
            return;
        }
        let records = self.elements.entry(category).or_default();
        match records.get_mut(&key) {
            Some(record) => record.merge(chapter, description, attributes),
            None => {
                let mut record = StoryElementRecord::new(name.trim(), chapter, description.trim());
                record.merge(chapter, "", attributes);
                records.insert(key, record);
            }
        }
    }

    fn count(&self, category: ElementCategory) -> usize {
        self.elements.get(&category).map(BTreeMap::len).unwrap_or(0)
    }

    /// Check a new chapter against everything seen before it.
    ///
    /// Run this before [`update_for_chapter`](Self::update_for_chapter) for the
    /// same chapter so that the recap rule compares against prior sightings.
    #[instrument(skip(self, content), fields(chapter = chapter_num))]
    pub async fn check_continuity(&mut self, content: &str, chapter_num: u32) -> ContinuityReport {
        let prior = self
            .snapshots
            .range(..chapter_num)
            .map(|(num, text)| {
                format!("Chapter {}: {}", num, head_chars(text, self.config.prior_summary_chars))
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Check the new chapter for continuity against the story so far. Identify \
             contradictions or inconsistencies. Respond with JSON: {{\"inconsistencies\": \
             [{{\"type\": \"character|location|event|timeline|rule\", \"element\": string, \
             \"issue\": string, \"severity\": \"low|medium|high\", \"suggestion\": string}}], \
             \"warnings\": [{{\"type\": string, \"description\": string}}]}}\n\n\
             [Story so far]\n{}\n\n[New chapter]\n{}",
            prior,
            head_chars(content, REQUEST_CONTENT_CHARS)
        );

        let resolved = self
            .retry
            .resolve(
                Role::Archivist,
                &self.archivist,
                &prompt,
                |text| parse_structured::<RawCheck>(text, ParseMode::Lenient),
                || RawCheck {
                    inconsistencies: Vec::new(),
                    warnings: Vec::new(),
                },
            )
            .await;

        let mut inconsistencies: Vec<Inconsistency> = resolved
            .value
            .inconsistencies
            .into_iter()
            .filter(|raw| !raw.issue.trim().is_empty() || !raw.element.trim().is_empty())
            .map(|raw| Inconsistency {
                kind: if raw.kind.is_empty() { "unknown".to_string() } else { raw.kind },
                element: raw.element,
                issue: raw.issue,
                severity: Severity::from_label(&raw.severity),
                suggestion: raw.suggestion,
            })
            .collect();
        let warnings: Vec<String> = resolved
            .value
            .warnings
            .into_iter()
            .map(|w| match w {
                RawWarning::Text(text) => text,
                RawWarning::Detailed { kind, description } if kind.is_empty() => description,
                RawWarning::Detailed { kind, description } => format!("{}: {}", kind, description),
            })
            .filter(|w| !w.trim().is_empty())
            .collect();

        if inconsistencies.is_empty() {
            inconsistencies = self.recap_check(content, chapter_num);
        }

        let report = ContinuityReport::new(chapter_num, inconsistencies, warnings);
        let high = report.high_severity().count();
        if high > 0 {
            warn!(high_severity = high, "High severity continuity issues detected");
        }
        info!(issues = report.score, warnings = report.warnings.len(), "Continuity checked");
        self.reports.push(report.clone());
        report
    }

    /// Characters absent for more than one chapter must come back with a recap.
    ///
    /// A reappearance counts as recapped when any known attribute of the
    /// character is mentioned in the same chapter.
    pub fn recap_check(&self, content: &str, chapter_num: u32) -> Vec<Inconsistency> {
        let lower = content.to_lowercase();
        let Some(characters) = self.elements.get(&ElementCategory::Characters) else {
            return Vec::new();
        };
        characters
            .iter()
            .filter(|(_, record)| record.last_seen_chapter + 1 < chapter_num)
            .filter(|(key, _)| mentions(&lower, key))
            .filter(|(_, record)| {
                !record
                    .attributes
                    .iter()
                    .any(|a| lower.contains(&a.to_lowercase()))
            })
            .map(|(_, record)| Inconsistency {
                kind: "character".to_string(),
                element: record.name.clone(),
                issue: format!(
                    "{} returns after last appearing in chapter {} without any recap",
                    record.name, record.last_seen_chapter
                ),
                severity: Severity::Medium,
                suggestion: format!(
                    "Briefly reintroduce {} when they reappear",
                    record.name
                ),
            })
            .collect()
    }

    /// Aggregate view over every check so far.
    pub fn summary(&self) -> ContinuitySummary {
        let mut issues_by_type: BTreeMap<String, usize> = BTreeMap::new();
        let mut high_severity_issues = 0;
        for issue in self.reports.iter().flat_map(|r| r.inconsistencies.iter()) {
            *issues_by_type.entry(issue.kind.clone()).or_insert(0) += 1;
            if issue.severity == Severity::High {
                high_severity_issues += 1;
            }
        }
        let total_issues: usize = issues_by_type.values().sum();
        let chapters_tracked = self.snapshots.len();
        ContinuitySummary {
            chapters_tracked,
            chapters_checked: self.reports.len(),
            total_issues,
            high_severity_issues,
            issues_by_type,
            inconsistency_rate: total_issues as f64 / chapters_tracked.max(1) as f64,
            element_counts: self
                .elements
                .iter()
                .map(|(category, records)| (*category, records.len()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ContinuityTracker {
        ContinuityTracker::new(&QuillConfig::default(), &RoleRegistry::new())
    }

    #[tokio::test]
    async fn test_local_extraction_is_idempotent() {
        let mut tracker = tracker();
        let info = ChapterInfo {
            chapter_num: 1,
            title: "Opening".to_string(),
        };
        let content = "Mira climbed the tower. Mira lit the lamp. A storm appeared at sea.";
        tracker.update_for_chapter(content, &info).await;
        tracker.update_for_chapter(content, &info).await;

        let characters = tracker.elements(ElementCategory::Characters).unwrap();
        assert_eq!(characters.len(), 1);
        let mira = tracker.record(ElementCategory::Characters, "MIRA").unwrap();
        assert!(mira.history.is_empty());
        assert_eq!(tracker.elements(ElementCategory::Events).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recap_rule_flags_long_absence() {
        let mut tracker = tracker();
        let first = ChapterInfo {
            chapter_num: 1,
            title: "One".to_string(),
        };
        tracker
            .update_for_chapter("Tomas rowed out. Tomas never looked back.", &first)
            .await;

        let report = tracker
            .check_continuity("At dawn Tomas knocked on the door.", 3)
            .await;
        assert_eq!(report.score, 1);
        assert_eq!(report.inconsistencies[0].element, "Tomas");

        let report = tracker.check_continuity("Tomas knocked.", 2).await;
        assert_eq!(report.score, 0);
    }

    #[tokio::test]
    async fn test_recap_rule_matches_whole_names_only() {
        let mut tracker = tracker();
        let first = ChapterInfo {
            chapter_num: 1,
            title: "One".to_string(),
        };
        tracker.update_for_chapter("Tom rowed out. Tom never looked back.", &first).await;
        assert!(tracker.record(ElementCategory::Characters, "tom").is_some());

        assert!(tracker.recap_check("Tomorrow the tide turns.", 4).is_empty());
        assert_eq!(tracker.recap_check("Then Tom, soaked, came home.", 4).len(), 1);
    }

    #[test]
    fn test_mentions_word_boundaries() {
        assert!(mentions("old tom waved", "old tom"));
        assert!(!mentions("the tomb was sealed", "tom"));
        assert!(!mentions("atom", "tom"));
        assert!(mentions("李伟走进了渡口", "李伟"));
        assert!(!mentions("anything", ""));
    }

    #[test]
    fn test_keyed_reply_is_filed_by_category() {
        let reply = r#"{"characters": [{"name": "Li Wei"}], "locations": [{"name": "The Ferry"}]}"#;
        let parse = |category| {
            parse_structured::<RawElements>(reply, ParseMode::Lenient)
                .unwrap()
                .into_category(category, reply)
                .unwrap()
        };
        assert_eq!(parse(ElementCategory::Characters)[0].name, "Li Wei");
        assert_eq!(parse(ElementCategory::Locations)[0].name, "The Ferry");
        assert!(parse(ElementCategory::Rules).is_empty());

        let bare: RawElements =
            parse_structured(r#"[{"name": "Dock"}]"#, ParseMode::Lenient).unwrap();
        assert_eq!(bare.into_category(ElementCategory::Events, "").unwrap().len(), 1);

        let wrong: RawElements =
            parse_structured(r#"{"events": "none"}"#, ParseMode::Lenient).unwrap();
        assert!(wrong.into_category(ElementCategory::Events, "").is_err());
    }

    #[tokio::test]
    async fn test_summary_rate() {
        let mut tracker = tracker();
        let info = ChapterInfo {
            chapter_num: 1,
            title: "One".to_string(),
        };
        tracker
            .update_for_chapter("Tomas rowed out. Tomas never looked back.", &info)
            .await;
        tracker.check_continuity("Tomas returns.", 3).await;

        let summary = tracker.summary();
        assert_eq!(summary.total_issues, 1);
        assert_eq!(summary.chapters_checked, 1);
        assert_eq!(summary.inconsistency_rate, 1.0);
        assert_eq!(summary.issues_by_type.get("character"), Some(&1));
        assert_eq!(summary.element_counts[&ElementCategory::Characters], 1);
    }
}
