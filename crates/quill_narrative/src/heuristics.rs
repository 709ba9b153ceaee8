//! Local text heuristics used when no generator can answer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const EVENT_MARKERS: &[&str] = &[
    "出现", "发生", "导致", "引起", "改变", "决定", " appeared", " happened", " caused",
    " led to", " changed", " decided", " discovered",
];

const STOP_WORDS: &[&str] = &[
    "The", "And", "But", "Then", "When", "She", "Her", "His", "They", "Their", "There", "This",
    "That", "What", "Where", "With", "From", "After", "Before", "Chapter", "Yes", "Not", "For",
    "You", "Your", "Its", "Our", "Was", "Were", "Had", "Have", "Now", "One", "All", "Who",
];

const OPENING_MARKERS: &[&str] = &[
    "开始", "起初", "从前", "很久以前", "那天", "once upon", "in the beginning", "it began",
    "first", "one day", "long ago",
];
const CONFLICT_MARKERS: &[&str] = &[
    "冲突", "矛盾", "危机", "困难", "挑战", "敌人", "争吵", "conflict", "struggle", "crisis",
    "danger", "enemy", "fight", "threat", "challenge",
];
const RESOLUTION_MARKERS: &[&str] = &[
    "最终", "终于", "结局", "解决", "和解", "从此", "finally", "at last", "in the end",
    "resolved", "ever after", "peace",
];

/// Presence of the three basic story-structure beats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureCheck {
    /// An opening marker was found
    pub has_opening: bool,
    /// A conflict marker was found
    pub has_conflict: bool,
    /// A resolution marker was found
    pub has_resolution: bool,
    /// Share of beats present, scaled to `[0, 100]`
    pub structure_score: f64,
}

/// Pattern-based extraction of names, events and structure.
#[derive(Debug, Clone)]
pub struct Heuristics {
    han_run: Regex,
    capitalized: Regex,
    sentence_break: Regex,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::new()
    }
}

impl Heuristics {
    /// Compile the patterns.
    pub fn new() -> Self {
        Self {
            han_run: Regex::new(r"\p{Han}{2,4}").expect("Valid Han run regex"),
            capitalized: Regex::new(r"\b[A-Z][a-z]{2,}\b").expect("Valid capitalized word regex"),
            sentence_break: Regex::new(r"[。！？.!?\n]+").expect("Valid sentence break regex"),
        }
    }

    /// Words that look like names: Han runs of 2 to 4 characters or
    /// capitalized words, seen more than once. Ordered by first appearance.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_narrative::Heuristics;
    ///
    /// let names = Heuristics::new()
    ///     .candidate_names("Mira lit the lamp. Mira waited. The sea was calm.");
    /// assert_eq!(names, vec!["Mira".to_string()]);
    /// ```
    pub fn candidate_names(&self, text: &str) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        let matches = self
            .han_run
            .find_iter(text)
            .chain(self.capitalized.find_iter(text))
            .map(|m| m.as_str())
            .filter(|w| !STOP_WORDS.contains(w));
        for word in matches {
            let count = counts.entry(word).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }
        order
            .into_iter()
            .filter(|w| counts.get(w).copied().unwrap_or(0) > 1)
            .map(str::to_string)
            .collect()
    }

    /// Sentences containing an event verb.
    pub fn candidate_events(&self, text: &str) -> Vec<String> {
        self.sentence_break
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter(|s| {
                let lower = format!(" {}", s.to_lowercase());
                EVENT_MARKERS.iter().any(|m| lower.contains(m))
            })
            .map(str::to_string)
            .collect()
    }

    /// Keyword check for opening, conflict and resolution beats.
    pub fn structure(&self, text: &str) -> StructureCheck {
        let lower = text.to_lowercase();
        let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
        let has_opening = has(OPENING_MARKERS);
        let has_conflict = has(CONFLICT_MARKERS);
        let has_resolution = has(RESOLUTION_MARKERS);
        let present = [has_opening, has_conflict, has_resolution]
            .iter()
            .filter(|b| **b)
            .count();
        StructureCheck {
            has_opening,
            has_conflict,
            has_resolution,
            structure_score: present as f64 / 3.0 * 100.0,
        }
    }
}
