//! Tolerant JSON recovery for generative model output
//!
//! Model responses are supposed to be JSON but routinely arrive wrapped in
//! markdown fences or surrounded by commentary. `parse_model_json` tries a
//! fixed sequence of extraction strategies and returns the first value that
//! parses:
//! 1. Strict parse of the whole payload
//! 2. Strict parse of the first fenced code block (optionally tagged `json`)
//! 3. Outermost object/array bracket span
//!
//! Total failure is reported as `None`, never as an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fenced block pattern is valid")
});

/// Extract a JSON value from raw model text.
///
/// Returns `None` for absent or empty input and when no strategy yields
/// valid JSON.
pub fn parse_model_json(raw: Option<&str>) -> Option<Value> {
    let text = match raw {
        Some(text) if !text.is_empty() => text,
        _ => return None,
    };

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    debug!("Strict parse failed ({} bytes), trying fenced block", text.len());

    if let Some(inner) = fenced_block(text) {
        match serde_json::from_str::<Value>(inner) {
            Ok(value) => return Some(value),
            Err(e) => debug!("Fenced block is not valid JSON: {}", e),
        }
    }

    if let Some(span) = bracket_span(text) {
        return match serde_json::from_str::<Value>(span) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to parse JSON from bracket span: {}", e);
                None
            }
        };
    }

    warn!("No JSON found in model output ({} bytes)", text.len());
    None
}

/// Recover JSON and deserialize it into `T`.
pub fn parse_model_json_as<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    let value = parse_model_json(raw)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Recovered JSON does not match expected shape: {}", e);
            None
        }
    }
}

/// Inner content of the first fenced code block, if it is non-empty
fn fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|inner| !inner.is_empty())
}

/// Span from the first opening bracket to the last matching closer.
///
/// Whichever of `{` and `[` appears first decides the closer. The span is
/// inclusive on both ends and only returned when the closer comes after the
/// opener.
fn bracket_span(text: &str) -> Option<&str> {
    let first_brace = text.find('{');
    let first_bracket = text.find('[');

    let (start, end) = match (first_brace, first_bracket) {
        (Some(brace), Some(bracket)) if brace < bracket => (brace, text.rfind('}')),
        (Some(brace), None) => (brace, text.rfind('}')),
        (_, Some(bracket)) => (bracket, text.rfind(']')),
        (None, None) => return None,
    };

    match end {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => None,
    }
}
