// Integration tests for quiz normalization
//
// Whatever shape the model returns, every normalized question has at least
// two options and a correct answer that is one of them.

mod common;

use common::strategies::{json_value, raw_answer, raw_options};
use luminous_core::normalize::quiz::{EXPLANATION_PLACEHOLDER, QUESTION_PLACEHOLDER};
use luminous_core::normalize::{normalize_questions, normalize_quiz_output, QuizQuestion};
use proptest::prelude::*;
use serde_json::json;

fn assert_answer_invariant(questions: &[QuizQuestion]) {
    for q in questions {
        assert!(q.options().len() >= 2, "too few options: {:?}", q.options());
        assert!(
            q.options().iter().any(|o| o == q.correct_answer()),
            "{:?} not in {:?}",
            q.correct_answer(),
            q.options()
        );
    }
}

proptest! {
    #[test]
    fn prop_correct_answer_is_an_option(options in raw_options(), answer in raw_answer()) {
        let raw = json!([{ "question": "Q", "options": options, "correctAnswer": answer }]);
        let questions = normalize_questions(&raw);
        prop_assert_eq!(questions.len(), 1);
        assert_answer_invariant(&questions);
    }

    #[test]
    fn prop_arbitrary_payloads_keep_invariant(raw in json_value()) {
        assert_answer_invariant(&normalize_questions(&raw));
    }
}

#[test]
fn test_numeric_index_resolves() {
    let raw = json!([{ "question": "Q", "options": ["A", "B", "C", "D"], "correctAnswer": 2, "explanation": "E" }]);
    let questions = normalize_questions(&raw);
    assert_eq!(questions[0].correct_answer(), "C");
    assert_eq!(questions[0].explanation(), "E");
}

#[test]
fn test_letter_resolves_case_insensitively() {
    let raw = json!([{ "question": "Q", "options": ["X", "Y", "Z", "W"], "correctAnswer": "b" }]);
    assert_eq!(normalize_questions(&raw)[0].correct_answer(), "Y");
}

#[test]
fn test_keyed_options_with_letter_answer() {
    let raw = r#"[{"question":"2+2?","options":{"a":"3","b":"4"},"correctAnswer":"B","explanation":"math"}]"#;
    let questions = normalize_quiz_output(Some(raw), None);

    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].question(), "2+2?");
    assert_eq!(questions[0].options(), ["3", "4"]);
    assert_eq!(questions[0].correct_answer(), "4");
    assert!(questions[0].is_correct("4"));
    assert!(!questions[0].is_correct("3"));
}

#[test]
fn test_text_matching_rules() {
    let raw = json!({
        "questions": [
            { "question": "exact", "options": ["Paris", "Rome"], "correctAnswer": "Rome" },
            { "question": "case", "options": ["Paris", "Rome"], "correctAnswer": "rOME" },
            { "question": "padded", "options": ["Rome", "Paris"], "correctAnswer": "  rome " },
            { "question": "substring", "options": ["The Louvre", "The Prado"], "correctAnswer": "Prado" },
            { "question": "superstring", "options": ["Madrid", "Lisbon"], "correctAnswer": "It is Lisbon" },
            { "question": "nothing", "options": ["Madrid", "Lisbon"], "correctAnswer": "Oslo" }
        ]
    });
    let answers: Vec<String> = normalize_questions(&raw)
        .iter()
        .map(|q| q.correct_answer().to_string())
        .collect();
    assert_eq!(answers, ["Rome", "Rome", "Rome", "The Prado", "Lisbon", "Madrid"]);
}

#[test]
fn test_out_of_range_index_falls_through() {
    let raw = json!([{ "question": "Q", "options": ["A", "B"], "correctAnswer": 7 }]);
    assert_eq!(normalize_questions(&raw)[0].correct_answer(), "A");

    let raw = json!([{ "question": "Q", "options": ["yes", "no"], "correctAnswer": "D" }]);
    assert_eq!(normalize_questions(&raw)[0].correct_answer(), "yes");
}

#[test]
fn test_answer_aliases_and_choices() {
    let raw = json!([
        { "question": "Q1", "choices": ["one", "two"], "answer": "two" },
        { "question": "Q2", "options": ["one", "two"], "correct_answer": 1 }
    ]);
    let questions = normalize_questions(&raw);
    assert_eq!(questions[0].options(), ["one", "two"]);
    assert_eq!(questions[0].correct_answer(), "two");
    assert_eq!(questions[1].correct_answer(), "two");
}

#[test]
fn test_degenerate_options_fall_back_to_true_false() {
    let raw = json!([
        { "question": "Q", "options": ["only"], "correctAnswer": "false" },
        { "question": "Q", "options": [null, " ", "same", "same"] },
        { "question": "Q" }
    ]);
    for q in normalize_questions(&raw) {
        assert_eq!(q.options(), ["True", "False"]);
    }
    assert_eq!(normalize_questions(&raw)[0].correct_answer(), "False");
}

#[test]
fn test_placeholders_for_missing_text() {
    let raw = json!([{ "options": ["a", "b"] }, "not an object"]);
    let questions = normalize_questions(&raw);
    assert_eq!(questions.len(), 2);
    for q in &questions {
        assert_eq!(q.question(), QUESTION_PLACEHOLDER);
        assert_eq!(q.explanation(), EXPLANATION_PLACEHOLDER);
    }
    assert_answer_invariant(&questions);
}

#[test]
fn test_unrecognized_payloads_are_empty() {
    assert!(normalize_questions(&json!({ "items": [] })).is_empty());
    assert!(normalize_questions(&json!("text")).is_empty());
    assert!(normalize_quiz_output(Some("no json"), None).is_empty());
    assert!(normalize_quiz_output(None, Some(3)).is_empty());
}

#[test]
fn test_limit_truncates() {
    let raw = r#"```json
{"questions": [
  {"question": "1", "options": ["a", "b"], "correctAnswer": 0},
  {"question": "2", "options": ["a", "b"], "correctAnswer": 1},
  {"question": "3", "options": ["a", "b"], "correctAnswer": "a"}
]}
```"#;
    let questions = normalize_quiz_output(Some(raw), Some(2));
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[1].correct_answer(), "b");
    assert_eq!(normalize_quiz_output(Some(raw), None).len(), 3);
}

#[test]
fn test_serializes_camel_case() {
    let raw = json!([{ "question": "Q", "options": ["a", "b"], "correctAnswer": 1, "explanation": "E" }]);
    let value = serde_json::to_value(&normalize_questions(&raw)[0]).unwrap();
    assert_eq!(
        value,
        json!({ "question": "Q", "options": ["a", "b"], "correctAnswer": "b", "explanation": "E" })
    );
}
