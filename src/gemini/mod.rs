//! Gemini model access
//!
//! - `types`: `generateContent` wire types
//! - `client`: `TextModel` trait and the reqwest-backed `GeminiClient`
//! - `tutor`: tutoring operations with graceful fallbacks

pub mod client;
pub mod tutor;
pub mod types;

pub use client::{GeminiClient, GeminiError, TextModel, DEFAULT_BASE_URL};
pub use tutor::{
    ChatReply, ChatRole, ChatTurn, ExamKind, SpeechClip, StudyMaterial, Tutor, TutorModels,
    SPEECH_SAMPLE_RATE,
};
pub use types::{GenerateContentRequest, GenerateContentResponse, GroundingSource};
