use serde::Serialize;
use serde_json::{Map, Value};

use super::coerce::{as_object_or_empty, object_list, string_field, string_field_or, string_list};
use crate::recovery::parse_model_json;

pub const UNTITLED_ROADMAP: &str = "Untitled Roadmap";
pub const TRANSLATION_UNAVAILABLE: &str = "Translation unavailable.";

/// A structured result coerced from loosely-typed model JSON.
///
/// `from_value` never fails: missing scalars become empty strings (or a
/// documented default) and list fields are always present.
pub trait ModelResult: Sized {
    fn from_value(value: &Value) -> Self;

    /// Recover JSON from raw model text and coerce it.
    ///
    /// `None` only when no JSON could be recovered.
    fn from_model_output(raw: Option<&str>) -> Option<Self> {
        parse_model_json(raw).map(|value| Self::from_value(&value))
    }
}

/// Dictionary lookup for a single word
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub word: String,
    pub phonetic: String,
    pub definition: String,
    pub translations: Vec<WordTranslation>,
    pub examples: Vec<String>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordTranslation {
    pub lang: String,
    pub text: String,
}

impl ModelResult for DictionaryEntry {
    fn from_value(value: &Value) -> Self {
        let map = as_object_or_empty(value);
        Self {
            word: string_field(&map, "word"),
            phonetic: string_field(&map, "phonetic"),
            definition: string_field(&map, "definition"),
            translations: object_list(&map, "translations", |t| WordTranslation {
                lang: string_field(t, "lang"),
                text: string_field(t, "text"),
            }),
            examples: string_list(&map, "examples"),
            synonyms: string_list(&map, "synonyms"),
            antonyms: string_list(&map, "antonyms"),
        }
    }
}

/// Study guide extracted from an uploaded document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuide {
    pub summary: String,
    pub key_points: Vec<String>,
    pub vocabulary: Vec<VocabularyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyItem {
    pub term: String,
    pub definition: String,
    pub translation: String,
}

impl ModelResult for StudyGuide {
    fn from_value(value: &Value) -> Self {
        let map = as_object_or_empty(value);
        Self {
            summary: string_field(&map, "summary"),
            key_points: string_list(&map, "keyPoints"),
            vocabulary: object_list(&map, "vocabulary", |v| VocabularyItem {
                term: string_field(v, "term"),
                definition: string_field(v, "definition"),
                translation: string_field(v, "translation"),
            }),
        }
    }
}

/// Phased learning roadmap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roadmap {
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub phases: Vec<RoadmapPhase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapPhase {
    pub phase_title: String,
    pub duration: String,
    pub description: String,
    pub topics: Vec<String>,
}

impl RoadmapPhase {
    fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            phase_title: string_field(map, "phaseTitle"),
            duration: string_field(map, "duration"),
            description: string_field(map, "description"),
            topics: string_list(map, "topics"),
        }
    }
}

impl ModelResult for Roadmap {
    fn from_value(value: &Value) -> Self {
        let map = as_object_or_empty(value);
        Self {
            title: string_field_or(&map, "title", UNTITLED_ROADMAP),
            description: string_field(&map, "description"),
            difficulty: string_field(&map, "difficulty"),
            phases: object_list(&map, "phases", RoadmapPhase::from_map),
        }
    }
}

/// Translation with optional annotations (empty when the model omits them)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    pub transliteration: String,
    pub cultural_note: String,
    pub detected_language: String,
}

impl TranslationResult {
    /// Result shown when translation failed outright
    pub fn unavailable() -> Self {
        Self {
            translated_text: TRANSLATION_UNAVAILABLE.to_string(),
            transliteration: String::new(),
            cultural_note: String::new(),
            detected_language: String::new(),
        }
    }
}

impl ModelResult for TranslationResult {
    fn from_value(value: &Value) -> Self {
        let map = as_object_or_empty(value);
        Self {
            translated_text: string_field(&map, "translatedText"),
            transliteration: string_field(&map, "transliteration"),
            cultural_note: string_field(&map, "culturalNote"),
            detected_language: string_field(&map, "detectedLanguage"),
        }
    }
}
