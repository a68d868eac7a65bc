use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{error, info, warn};

use super::client::{GeminiError, TextModel};
use super::types::{Content, GenerateContentRequest, GenerationConfig, GroundingSource, Part, Tool};
use crate::audio::pcm;
use crate::normalize::{
    normalize_quiz_output, DictionaryEntry, ModelResult, QuizQuestion, Roadmap, StudyGuide, TranslationResult,
};

pub const CHAT_NO_TEXT: &str = "I'm having trouble connecting to the neural network.";
pub const CHAT_RATE_LIMITED: &str = "I've reached my usage limit for now. This is due to API rate limiting. \
     Please try again in a few minutes or check your API key configuration.";
pub const CHAT_API_KEY: &str = "There seems to be an issue with the API key configuration. \
     Please check that GEMINI_API_KEY is correctly set.";
pub const CHAT_INTERRUPTED: &str = "Connection interrupted. Please try again in a moment.";
pub const FEEDBACK_EMPTY: &str = "Analysis unavailable.";
pub const FEEDBACK_FAILED: &str = "Could not generate feedback.";

/// Sample rate of synthesized speech
pub const SPEECH_SAMPLE_RATE: u32 = 24000;

/// Model names used per kind of request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorModels {
    /// Quick structured answers (translation, dictionary, roadmaps)
    pub fast: String,
    /// Chat and question generation
    pub smart: String,
    /// Speech synthesis
    pub audio: String,
    pub voice: String,
}

impl Default for TutorModels {
    fn default() -> Self {
        Self {
            fast: "gemini-2.5-flash".to_string(),
            smart: "gemini-2.5-flash".to_string(),
            audio: "gemini-2.5-flash".to_string(),
            voice: "Puck".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One prior message of a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

impl ChatReply {
    fn fallback(text: &str) -> Self {
        Self {
            text: text.to_string(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamKind {
    Weekly,
    Monthly,
}

impl ExamKind {
    pub fn question_count(self) -> usize {
        match self {
            ExamKind::Weekly => 10,
            ExamKind::Monthly => 25,
        }
    }

    pub fn difficulty(self) -> &'static str {
        match self {
            ExamKind::Weekly => "Medium",
            ExamKind::Monthly => "Hard",
        }
    }
}

impl fmt::Display for ExamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExamKind::Weekly => "weekly",
            ExamKind::Monthly => "monthly",
        })
    }
}

/// Uploaded document to build a study guide from
#[derive(Debug, Clone)]
pub struct StudyMaterial {
    pub mime_type: String,
    /// Base64 file contents
    pub data: String,
}

/// Decoded speech ready for an `AudioOutput`
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SpeechClip {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Tutoring features backed by a text model
///
/// Every operation degrades to a documented fallback instead of failing.
pub struct Tutor<M: TextModel> {
    model: M,
    models: TutorModels,
}

impl<M: TextModel> Tutor<M> {
    pub fn new(model: M, models: TutorModels) -> Self {
        Self { model, models }
    }

    pub fn models(&self) -> &TutorModels {
        &self.models
    }

    async fn generate_text(&self, model: &str, request: GenerateContentRequest) -> Result<Option<String>, GeminiError> {
        let response = self.model.generate(model, &request).await?;
        Ok(response.text())
    }

    pub async fn translate(&self, text: &str, target_lang: &str, tone: &str) -> TranslationResult {
        let prompt = format!(
            "Translate the following text into {target_lang}.\n\
             Tone: {tone}.\n\
             Input Text: \"{text}\"\n\n\
             Return JSON object."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "translatedText": { "type": "STRING" },
                "transliteration": { "type": "STRING", "nullable": true },
                "culturalNote": { "type": "STRING", "nullable": true },
                "detectedLanguage": { "type": "STRING", "nullable": true }
            }
        });
        let request = GenerateContentRequest::prompt(prompt).with_config(GenerationConfig::json(schema).without_thinking());

        match self.generate_text(&self.models.fast, request).await {
            Ok(text) => TranslationResult::from_model_output(text.as_deref()).unwrap_or_else(|| {
                warn!("Translation response had no JSON");
                TranslationResult::unavailable()
            }),
            Err(e) => {
                error!("Translation failed: {}", e);
                TranslationResult::unavailable()
            }
        }
    }

    pub async fn chat(&self, message: &str, history: &[ChatTurn], use_search: bool, target_lang: &str) -> ChatReply {
        let system_instruction = format!(
            "You are Luminous, an AI tutor.\n\
             Your expertise covers:\n\
             1. Language learning (Specializing in {target_lang}).\n\
             2. General academic subjects including Math, Science, Programming, History, and Social Studies.\n\n\
             Be helpful, concise, and encourage the student.\n\
             If the user asks for translations, provide them and explain the grammar.\n\
             If the user asks about a complex topic, explain it clearly in {target_lang} (or in English if appropriate).\n\
             Do not limit yourself to only language teaching if the user asks about other subjects.\n\
             If search is available, use it to find real-time info about culture or news."
        );

        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| {
                let parts = vec![Part::text(turn.content.clone())];
                match turn.role {
                    ChatRole::User => Content::user(parts),
                    ChatRole::Model => Content::model(parts),
                }
            })
            .collect();
        contents.push(Content::user(vec![Part::text(message)]));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::instruction(system_instruction)),
            generation_config: None,
            tools: if use_search { vec![Tool::google_search()] } else { Vec::new() },
        };

        match self.model.generate(&self.models.smart, &request).await {
            Ok(response) => ChatReply {
                text: response.text().unwrap_or_else(|| CHAT_NO_TEXT.to_string()),
                sources: response.grounding_sources(),
            },
            Err(e) => {
                error!("Chat failed: {}", e);
                match e {
                    GeminiError::RateLimited => ChatReply::fallback(CHAT_RATE_LIMITED),
                    GeminiError::InvalidApiKey(_) => ChatReply::fallback(CHAT_API_KEY),
                    _ => ChatReply::fallback(CHAT_INTERRUPTED),
                }
            }
        }
    }

    /// Multiple-choice quiz, at most `count` questions; empty on failure
    pub async fn generate_quiz(&self, topic: &str, lang: &str, count: usize) -> Vec<QuizQuestion> {
        let prompt = format!(
            "You are an expert tutor. Generate a high-quality multiple-choice quiz about \"{topic}\" in {lang}.\n\n\
             Requirements:\n\
             - Create exactly {count} questions.\n\
             - Each question MUST have exactly 4 distinct options.\n\
             - One option is the correct answer.\n\
             - Provide a clear, educational explanation for the answer.\n\
             - Return STRICT JSON format matching the schema."
        );
        self.questions(prompt, count, "Quiz").await
    }

    pub async fn generate_exam(&self, subject: &str, kind: ExamKind, lang: &str) -> Vec<QuizQuestion> {
        let count = kind.question_count();
        let prompt = format!(
            "Generate {difficulty} {kind} exam for \"{subject}\" in {lang}.\n\
             Count: Exactly {count} questions.\n\
             Format: Strict JSON object with \"questions\" array.\n\
             Ensure high accuracy and variety.",
            difficulty = kind.difficulty(),
        );
        self.questions(prompt, count, "Exam").await
    }

    async fn questions(&self, prompt: String, count: usize, label: &str) -> Vec<QuizQuestion> {
        let request = GenerateContentRequest::prompt(prompt).with_config(GenerationConfig::json(question_schema()));

        match self.generate_text(&self.models.smart, request).await {
            Ok(text) => {
                let questions = normalize_quiz_output(text.as_deref(), Some(count));
                info!("{} generated: {} questions", label, questions.len());
                questions
            }
            Err(e) => {
                error!("{} generation failed: {}", label, e);
                Vec::new()
            }
        }
    }

    /// Short feedback on a finished exam; `answers` maps question index to the chosen option
    pub async fn exam_feedback(
        &self,
        questions: &[QuizQuestion],
        answers: &HashMap<usize, String>,
        subject: &str,
        kind: ExamKind,
        lang: &str,
    ) -> String {
        let summary = questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let answer = answers.get(&i).map(String::as_str).unwrap_or("Skipped");
                format!("Q: {} | Correct: {} | User Answer: {}", q.question(), q.correct_answer(), answer)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Analyze {kind} exam results. Subject: {subject}. Lang: {lang}.\n\
             Provide concise constructive feedback (max 100 words).\n\
             Data: {summary}"
        );
        let request = GenerateContentRequest::prompt(prompt).with_config(GenerationConfig::default().without_thinking());

        match self.generate_text(&self.models.fast, request).await {
            Ok(text) => text.unwrap_or_else(|| FEEDBACK_EMPTY.to_string()),
            Err(e) => {
                error!("Exam feedback failed: {}", e);
                FEEDBACK_FAILED.to_string()
            }
        }
    }

    pub async fn study_guide(&self, material: &StudyMaterial, lang: &str) -> Option<StudyGuide> {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "summary": { "type": "STRING" },
                "keyPoints": { "type": "ARRAY", "items": { "type": "STRING" } },
                "vocabulary": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "term": { "type": "STRING" },
                            "definition": { "type": "STRING" },
                            "translation": { "type": "STRING" }
                        }
                    }
                }
            }
        });
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::inline(material.mime_type.clone(), material.data.clone()),
                Part::text(format!("Analyze content. Target Lang: {lang}. Return JSON study guide.")),
            ])],
            generation_config: Some(GenerationConfig::json(schema).without_thinking()),
            ..GenerateContentRequest::default()
        };

        self.structured(&self.models.fast, request, "Study guide").await
    }

    pub async fn roadmap(&self, topic: &str, difficulty: &str, lang: &str) -> Option<Roadmap> {
        let prompt = format!(
            "Act as an expert career and education counselor. Create a detailed, step-by-step learning roadmap for the topic: \"{topic}\".\n\
             Difficulty Level: {difficulty}.\n\
             Language: {lang}.\n\n\
             Requirements:\n\
             - Break it down into logical phases.\n\
             - Include duration for each phase.\n\
             - List key topics to master in each phase.\n\
             - Provide a comprehensive description."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "description": { "type": "STRING" },
                "difficulty": { "type": "STRING" },
                "phases": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "phaseTitle": { "type": "STRING" },
                            "duration": { "type": "STRING" },
                            "description": { "type": "STRING" },
                            "topics": { "type": "ARRAY", "items": { "type": "STRING" } }
                        }
                    }
                }
            }
        });
        let request = GenerateContentRequest::prompt(prompt).with_config(GenerationConfig::json(schema).without_thinking());

        self.structured(&self.models.fast, request, "Roadmap").await
    }

    pub async fn lookup_word(&self, word: &str, lang: &str) -> Option<DictionaryEntry> {
        let prompt = format!(
            "Act as a comprehensive dictionary.\n\
             Word: \"{word}\"\n\
             User Language: {lang}\n\n\
             Tasks:\n\
             1. Define the word clearly in {lang}.\n\
             2. Provide the phonetic transcription.\n\
             3. Translate the word into 5 diverse major languages (e.g. Spanish, French, German, Hindi, Japanese, Chinese).\n\
             4. Provide 3 distinct example sentences showing usage in {lang}.\n\
             5. List synonyms and antonyms.\n\n\
             Return the result as a valid JSON object matching the schema."
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "word": { "type": "STRING" },
                "phonetic": { "type": "STRING" },
                "definition": { "type": "STRING" },
                "translations": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "lang": { "type": "STRING" },
                            "text": { "type": "STRING" }
                        }
                    }
                },
                "examples": { "type": "ARRAY", "items": { "type": "STRING" } },
                "synonyms": { "type": "ARRAY", "items": { "type": "STRING" } },
                "antonyms": { "type": "ARRAY", "items": { "type": "STRING" } }
            }
        });
        let request = GenerateContentRequest::prompt(prompt).with_config(GenerationConfig::json(schema).without_thinking());

        self.structured(&self.models.fast, request, "Dictionary").await
    }

    async fn structured<T: ModelResult>(&self, model: &str, request: GenerateContentRequest, label: &str) -> Option<T> {
        match self.generate_text(model, request).await {
            Ok(text) => {
                let result = T::from_model_output(text.as_deref());
                if result.is_none() {
                    warn!("{} response had no JSON", label);
                }
                result
            }
            Err(e) => {
                error!("{} failed: {}", label, e);
                None
            }
        }
    }

    /// Read `text` aloud; `None` when no audio came back
    pub async fn synthesize_speech(&self, text: &str, lang: &str) -> Option<SpeechClip> {
        let prompt = format!(
            "Read the following {lang} text clearly and naturally. Do not translate it, just read it as is. Text: \"{text}\""
        );
        let request = GenerateContentRequest::prompt(prompt).with_config(GenerationConfig::speech(&self.models.voice));

        let response = match self.model.generate(&self.models.audio, &request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Speech synthesis failed: {}", e);
                return None;
            }
        };

        let Some(inline) = response.inline_data() else {
            warn!("Speech response carried no audio");
            return None;
        };

        match pcm::decode_base64(&inline.data) {
            Ok(bytes) => Some(SpeechClip {
                samples: pcm::pcm16_to_f32(&pcm::bytes_to_pcm16(&bytes)),
                sample_rate: SPEECH_SAMPLE_RATE,
            }),
            Err(e) => {
                warn!("Undecodable speech audio: {:#}", e);
                None
            }
        }
    }
}

fn question_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "questions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": { "type": "STRING", "description": "The quiz question text" },
                        "options": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "An array of 4 possible answer strings"
                        },
                        "correctAnswer": {
                            "type": "STRING",
                            "description": "The string text of the correct option, must match one of the options exactly"
                        },
                        "explanation": { "type": "STRING", "description": "Explanation why the answer is correct" }
                    },
                    "required": ["question", "options", "correctAnswer", "explanation"]
                }
            }
        }
    })
}
