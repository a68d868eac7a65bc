//! Quiz question normalization
//!
//! Models return question sets in many shapes: a bare array or an object
//! with a `questions` field, options as a list, a `choices` list or a
//! letter-keyed object, and the correct answer as an index, a letter, the
//! option text or something close to it. Every shape is mapped onto
//! `QuizQuestion`, whose correct answer is always one of its options.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::debug;

use super::coerce::value_text;
use crate::recovery::parse_model_json;

pub const QUESTION_PLACEHOLDER: &str = "Question unavailable";
pub const EXPLANATION_PLACEHOLDER: &str = "No explanation provided.";
pub const FALLBACK_OPTIONS: [&str; 2] = ["True", "False"];

/// A normalized multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

impl QuizQuestion {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Text of the correct option, always an element of `options()`
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Whether `answer` is literally the correct option
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

/// Top-level shapes a question set arrives in
enum QuizPayload<'a> {
    Questions(&'a [Value]),
    Unrecognized,
}

impl<'a> QuizPayload<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => QuizPayload::Questions(items),
            Value::Object(map) => match map.get("questions") {
                Some(Value::Array(items)) => QuizPayload::Questions(items),
                _ => QuizPayload::Unrecognized,
            },
            _ => QuizPayload::Unrecognized,
        }
    }
}

/// Shapes the option list arrives in
enum RawOptions<'a> {
    List(&'a [Value]),
    Keyed(&'a Map<String, Value>),
    Absent,
}

impl<'a> RawOptions<'a> {
    fn classify(item: &'a Map<String, Value>) -> Self {
        match (item.get("options"), item.get("choices")) {
            (Some(Value::Array(list)), _) => RawOptions::List(list),
            (_, Some(Value::Array(list))) => RawOptions::List(list),
            (Some(Value::Object(keyed)), _) => RawOptions::Keyed(keyed),
            (_, Some(Value::Object(keyed))) => RawOptions::Keyed(keyed),
            _ => RawOptions::Absent,
        }
    }

    fn into_texts(self) -> Vec<String> {
        let values: Vec<&Value> = match self {
            RawOptions::List(list) => list.iter().collect(),
            RawOptions::Keyed(keyed) => keyed.values().collect(),
            RawOptions::Absent => Vec::new(),
        };

        let mut options: Vec<String> = Vec::with_capacity(values.len());
        for text in values.into_iter().filter_map(value_text) {
            if text.trim().is_empty() || options.contains(&text) {
                continue;
            }
            options.push(text);
        }
        options
    }
}

/// Shapes the correct answer arrives in
enum RawAnswer<'a> {
    Number(&'a Number),
    Text(String),
    Absent,
}

impl<'a> RawAnswer<'a> {
    fn classify(item: &'a Map<String, Value>) -> Self {
        let value = ["correctAnswer", "correct_answer", "answer"]
            .iter()
            .find_map(|key| item.get(*key).filter(|v| !v.is_null()));

        match value {
            Some(Value::Number(n)) => RawAnswer::Number(n),
            Some(other) => value_text(other).map_or(RawAnswer::Absent, RawAnswer::Text),
            None => RawAnswer::Absent,
        }
    }
}

/// Normalize a recovered model value into quiz questions.
///
/// Accepts an array of items or an object with a `questions` array; any
/// other shape yields an empty list. Never fails.
pub fn normalize_questions(raw: &Value) -> Vec<QuizQuestion> {
    match QuizPayload::classify(raw) {
        QuizPayload::Questions(items) => items.iter().map(normalize_item).collect(),
        QuizPayload::Unrecognized => {
            debug!("Quiz payload has no question list");
            Vec::new()
        }
    }
}

/// Recover, normalize and optionally truncate a raw quiz payload.
pub fn normalize_quiz_output(raw: Option<&str>, limit: Option<usize>) -> Vec<QuizQuestion> {
    let Some(value) = parse_model_json(raw) else {
        return Vec::new();
    };

    let mut questions = normalize_questions(&value);
    if let Some(limit) = limit {
        questions.truncate(limit);
    }
    questions
}

fn normalize_item(item: &Value) -> QuizQuestion {
    let empty = Map::new();
    let item = item.as_object().unwrap_or(&empty);

    let mut options = RawOptions::classify(item).into_texts();
    if options.len() < 2 {
        options = FALLBACK_OPTIONS.iter().map(|s| s.to_string()).collect();
    }

    let correct_answer = resolve_answer(&RawAnswer::classify(item), &options);

    QuizQuestion {
        question: text_or(item.get("question"), QUESTION_PLACEHOLDER),
        options,
        correct_answer,
        explanation: text_or(item.get("explanation"), EXPLANATION_PLACEHOLDER),
    }
}

fn text_or(value: Option<&Value>, placeholder: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Pick the option the raw answer refers to.
///
/// Rules, first match wins: numeric index, letter A-D, exact text,
/// case-insensitive text, substring either way, first option.
/// `options` must be non-empty.
fn resolve_answer(answer: &RawAnswer<'_>, options: &[String]) -> String {
    let text = match answer {
        RawAnswer::Number(n) => {
            if let Some(option) = index_of_number(n).and_then(|i| options.get(i)) {
                return option.clone();
            }
            n.to_string()
        }
        RawAnswer::Text(text) => text.clone(),
        RawAnswer::Absent => return first_option(options),
    };

    if let Some(option) = letter_index(&text).and_then(|i| options.get(i)) {
        return option.clone();
    }

    if let Some(option) = options.iter().find(|opt| **opt == text) {
        return option.clone();
    }

    let folded = text.to_lowercase();
    if let Some(option) = options.iter().find(|opt| opt.to_lowercase() == folded) {
        return option.clone();
    }

    if let Some(option) = options
        .iter()
        .find(|opt| opt.contains(text.as_str()) || text.contains(opt.as_str()))
    {
        return option.clone();
    }

    first_option(options)
}

/// Non-negative integral number as an index (`2` and `2.0` both qualify)
fn index_of_number(n: &Number) -> Option<usize> {
    if let Some(i) = n.as_u64() {
        return usize::try_from(i).ok();
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => Some(f as usize),
        _ => None,
    }
}

/// Zero-based index of a single letter A-D, case-insensitive
fn letter_index(text: &str) -> Option<usize> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => match c.to_ascii_uppercase() {
            letter @ 'A'..='D' => Some(letter as usize - 'A' as usize),
            _ => None,
        },
        _ => None,
    }
}

fn first_option(options: &[String]) -> String {
    options
        .first()
        .cloned()
        .unwrap_or_else(|| FALLBACK_OPTIONS[0].to_string())
}
