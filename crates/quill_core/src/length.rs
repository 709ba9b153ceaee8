//! Content length measurement.

use serde::{Deserialize, Serialize};

/// How content length is counted against targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthMetric {
    /// Unicode scalar values
    #[default]
    Chars,
    /// CJK ideographs and CJK punctuation only
    Cjk,
}

impl LengthMetric {
    /// Measure `text` with this metric.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::LengthMetric;
    ///
    /// assert_eq!(LengthMetric::Chars.measure("龙 ab"), 4);
    /// assert_eq!(LengthMetric::Cjk.measure("龙 ab，"), 2);
    /// ```
    pub fn measure(&self, text: &str) -> usize {
        match self {
            LengthMetric::Chars => text.chars().count(),
            LengthMetric::Cjk => text.chars().filter(|c| is_cjk(*c)).count(),
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2CEAF
        | 0xF900..=0xFAFF
        | 0x3000..=0x303F
        | 0xFF00..=0xFFEF)
}
