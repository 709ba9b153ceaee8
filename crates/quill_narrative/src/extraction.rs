//! Structured data extraction from generated text.
//!
//! Generated responses often wrap JSON in markdown code blocks or surround it
//! with explanation. Callers pick a [`ParseMode`] explicitly and must handle
//! the [`ParseError`] branch; nothing here silently defaults to an empty value.

use quill_error::{ParseError, ParseErrorKind};
use serde::de::DeserializeOwned;

/// How hard to look for structured content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseMode {
    /// The whole response (or its single fenced block) must be the document.
    Strict,
    /// Best-effort scan: fenced block, then every balanced `{...}` / `[...]`.
    Lenient,
}

/// Most candidate start positions inspected by a lenient scan.
const MAX_LENIENT_CANDIDATES: usize = 32;

/// Parse `response` into `T`.
///
/// # Errors
///
/// - [`ParseErrorKind::NoStructuredContent`] when no JSON candidate exists
/// - [`ParseErrorKind::Malformed`] when candidates exist but none is valid JSON
/// - [`ParseErrorKind::SchemaMismatch`] when JSON was found but has the wrong shape
///
/// # Examples
///
/// ```
/// use quill_narrative::{parse_structured, ParseMode};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Verdict {
///     score: u32,
/// }
///
/// let response = "Here is my verdict:\n```json\n{\"score\": 85}\n```\nThanks!";
/// let verdict: Verdict = parse_structured(response, ParseMode::Lenient).unwrap();
/// assert_eq!(verdict.score, 85);
///
/// assert!(parse_structured::<Verdict>("Verdict: {\"score\": 85}", ParseMode::Strict).is_err());
/// ```
pub fn parse_structured<T>(response: &str, mode: ParseMode) -> Result<T, ParseError>
where
    T: DeserializeOwned,
{
    match mode {
        ParseMode::Strict => parse_strict(response),
        ParseMode::Lenient => parse_lenient(response),
    }
}

fn parse_strict<T: DeserializeOwned>(response: &str) -> Result<T, ParseError> {
    let trimmed = response.trim();
    let document = if trimmed.starts_with("```") {
        extract_from_code_block(trimmed)
            .ok_or_else(|| ParseError::new(ParseErrorKind::NoStructuredContent, response))?
    } else {
        trimmed.to_string()
    };
    if document.is_empty() {
        return Err(ParseError::new(ParseErrorKind::NoStructuredContent, response));
    }
    decode(&document, response)
}

fn parse_lenient<T: DeserializeOwned>(response: &str) -> Result<T, ParseError> {
    let mut first_error: Option<ParseError> = None;

    for candidate in candidates(response) {
        match decode(&candidate, response) {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(
                    error = %e.kind,
                    candidate_preview = %candidate.chars().take(100).collect::<String>(),
                    "Rejected structured candidate"
                );
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error
        .unwrap_or_else(|| ParseError::new(ParseErrorKind::NoStructuredContent, response)))
}

fn decode<T: DeserializeOwned>(document: &str, response: &str) -> Result<T, ParseError> {
    serde_json::from_str(document).map_err(|e| {
        let kind = match e.classify() {
            serde_json::error::Category::Data => ParseErrorKind::SchemaMismatch(e.to_string()),
            _ => ParseErrorKind::Malformed(e.to_string()),
        };
        ParseError::new(kind, response)
    })
}

/// Candidate JSON documents in the order a lenient parse tries them.
fn candidates(response: &str) -> Vec<String> {
    let mut found = Vec::new();
    if let Some(block) = extract_from_code_block(response) {
        if block.starts_with('{') || block.starts_with('[') {
            found.push(block);
        }
    }
    for (start, _) in response
        .char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .take(MAX_LENIENT_CANDIDATES)
    {
        if let Some(candidate) = extract_balanced(&response[start..]) {
            if !found.contains(&candidate) {
                found.push(candidate);
            }
        }
    }
    found
}

/// Extract content from the first markdown code block.
///
/// A `json` language tag is preferred; an untagged or differently tagged
/// block is used otherwise. An unterminated block runs to the end of input.
fn extract_from_code_block(response: &str) -> Option<String> {
    if let Some(start) = response.find("```json") {
        let content_start = start + "```json".len();
        let content = match response[content_start..].find("```") {
            Some(end) => &response[content_start..content_start + end],
            None => &response[content_start..],
        };
        return Some(content.trim().to_string());
    }

    let start = response.find("```")?;
    let content_start = start + 3;
    let skip_to = response[content_start..]
        .find('\n')
        .map(|n| content_start + n + 1)
        .unwrap_or(content_start);
    let content = match response[skip_to..].find("```") {
        Some(end) => &response[skip_to..skip_to + end],
        None => &response[skip_to..],
    };
    Some(content.trim().to_string())
}

/// Extract the balanced `{...}` or `[...]` starting at the first character.
fn extract_balanced(text: &str) -> Option<String> {
    let open = text.chars().next()?;
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(text[..i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Decision {
        should_end: bool,
    }

    #[test]
    fn test_lenient_from_code_block() {
        let response = "Thinking...\n```json\n{\"should_end\": true}\n```";
        let d: Decision = parse_structured(response, ParseMode::Lenient).unwrap();
        assert!(d.should_end);
    }

    #[test]
    fn test_lenient_skips_bad_candidate() {
        let response = "Scene {not json} then {\"should_end\": false} end";
        let d: Decision = parse_structured(response, ParseMode::Lenient).unwrap();
        assert!(!d.should_end);
    }

    #[test]
    fn test_lenient_handles_braces_inside_strings() {
        let response = r#"{"should_end": true, "note": "a } inside \"quotes\""}"#;
        let d: Decision = parse_structured(response, ParseMode::Lenient).unwrap();
        assert!(d.should_end);
    }

    #[test]
    fn test_lenient_keeps_multibyte_text_intact() {
        let response = "结论：{\"should_end\": true}。";
        let d: Decision = parse_structured(response, ParseMode::Lenient).unwrap();
        assert!(d.should_end);
    }

    #[test]
    fn test_no_structured_content() {
        let err = parse_structured::<Decision>("plain prose only", ParseMode::Lenient).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NoStructuredContent);
        assert_eq!(err.raw, "plain prose only");
    }

    #[test]
    fn test_schema_mismatch_is_reported() {
        let err = parse_structured::<Decision>("{\"should_end\": \"maybe\"}", ParseMode::Strict)
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::SchemaMismatch(_)));
    }

    #[test]
    fn test_strict_rejects_surrounding_prose() {
        let err = parse_structured::<Decision>("Sure: {\"should_end\": true}", ParseMode::Strict)
            .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::Malformed(_)));
    }

    #[test]
    fn test_strict_accepts_single_fenced_block() {
        let d: Decision =
            parse_structured("```json\n{\"should_end\": true}\n```", ParseMode::Strict).unwrap();
        assert!(d.should_end);
    }
}
