//! Normalization of recovered model JSON into typed results
//!
//! - `coerce`: shape guards shared by every result (`ensure_array`, string defaults)
//! - `quiz`: question sets with a guaranteed-valid correct answer
//! - `results`: dictionary, study guide, roadmap and translation shapes

pub mod coerce;
pub mod quiz;
pub mod results;

pub use coerce::ensure_array;
pub use quiz::{normalize_questions, normalize_quiz_output, QuizQuestion};
pub use results::{
    DictionaryEntry, ModelResult, Roadmap, RoadmapPhase, StudyGuide, TranslationResult,
    VocabularyItem, WordTranslation,
};
