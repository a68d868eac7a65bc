// Integration tests for tutoring operations
//
// A scripted TextModel replays canned responses and records each request,
// so the tests check both the request shape and the graceful fallbacks.

use luminous_core::audio::pcm;
use luminous_core::gemini::tutor::{
    CHAT_API_KEY, CHAT_INTERRUPTED, CHAT_NO_TEXT, CHAT_RATE_LIMITED, FEEDBACK_EMPTY, FEEDBACK_FAILED,
};
use luminous_core::gemini::{
    ChatRole, ChatTurn, ExamKind, GeminiError, GenerateContentRequest, GenerateContentResponse,
    StudyMaterial, TextModel, Tutor, TutorModels, SPEECH_SAMPLE_RATE,
};
use luminous_core::normalize::results::TRANSLATION_UNAVAILABLE;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type Reply = Result<GenerateContentResponse, GeminiError>;

#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait::async_trait]
impl TextModel for ScriptedModel {
    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Reply {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), serde_json::to_value(request).unwrap()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GeminiError::Transport("no scripted reply".into())))
    }
}

fn text_reply(text: &str) -> Reply {
    Ok(serde_json::from_value(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    }))
    .unwrap())
}

fn tutor(replies: Vec<Reply>) -> (Tutor<ScriptedModel>, Arc<Mutex<Vec<(String, Value)>>>) {
    let model = ScriptedModel {
        replies: Mutex::new(replies.into()),
        requests: Arc::default(),
    };
    let requests = Arc::clone(&model.requests);
    let models = TutorModels {
        fast: "fast-model".to_string(),
        smart: "smart-model".to_string(),
        audio: "tts-model".to_string(),
        voice: "Kore".to_string(),
    };
    (Tutor::new(model, models), requests)
}

#[tokio::test]
async fn test_translate_parses_fenced_reply() {
    let (tutor, requests) = tutor(vec![text_reply(
        "```json\n{\"translatedText\": \"Guten Morgen\", \"detectedLanguage\": \"English\"}\n```",
    )]);

    let result = tutor.translate("Good morning", "German", "formal").await;
    assert_eq!(result.translated_text, "Guten Morgen");
    assert_eq!(result.detected_language, "English");
    assert_eq!(result.cultural_note, "");

    let requests = requests.lock().unwrap();
    let (model, body) = &requests[0];
    assert_eq!(model, "fast-model");
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
    assert!(body["contents"][0]["parts"][0]["text"].as_str().unwrap().contains("German"));
}

#[tokio::test]
async fn test_translate_falls_back() {
    let (tutor, _) = tutor(vec![text_reply("Sorry, I can't."), Err(GeminiError::RateLimited)]);

    assert_eq!(tutor.translate("hi", "French", "casual").await.translated_text, TRANSLATION_UNAVAILABLE);
    assert_eq!(tutor.translate("hi", "French", "casual").await.translated_text, TRANSLATION_UNAVAILABLE);
}

#[tokio::test]
async fn test_chat_sends_history_and_search_tool() {
    let reply = serde_json::from_value(json!({
        "candidates": [{
            "content": { "parts": [{ "text": "Hola " }, { "text": "amigo" }] },
            "groundingMetadata": {
                "groundingChunks": [
                    { "web": { "uri": "https://example.org/a", "title": "A" } },
                    { "retrievedContext": {} }
                ]
            }
        }]
    }))
    .unwrap();
    let (tutor, requests) = tutor(vec![Ok(reply)]);
    let history = vec![
        ChatTurn { role: ChatRole::User, content: "Hi".into() },
        ChatTurn { role: ChatRole::Model, content: "Hello!".into() },
    ];

    let answer = tutor.chat("Say hello in Spanish", &history, true, "Spanish").await;
    assert_eq!(answer.text, "Hola amigo");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].uri, "https://example.org/a");

    let requests = requests.lock().unwrap();
    let (model, body) = &requests[0];
    assert_eq!(model, "smart-model");
    let roles: Vec<&str> = body["contents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["user", "model", "user"]);
    assert_eq!(body["tools"], json!([{ "googleSearch": {} }]));
    assert!(body["systemInstruction"]["parts"][0]["text"].as_str().unwrap().contains("Spanish"));
}

#[tokio::test]
async fn test_chat_fallback_messages() {
    let empty: GenerateContentResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
    let (tutor, requests) = tutor(vec![
        Err(GeminiError::RateLimited),
        Err(GeminiError::InvalidApiKey("API_KEY_INVALID".into())),
        Err(GeminiError::Http { status: 500, message: "boom".into() }),
        Ok(empty),
    ]);

    assert_eq!(tutor.chat("q", &[], false, "English").await.text, CHAT_RATE_LIMITED);
    assert_eq!(tutor.chat("q", &[], false, "English").await.text, CHAT_API_KEY);
    assert_eq!(tutor.chat("q", &[], false, "English").await.text, CHAT_INTERRUPTED);
    assert_eq!(tutor.chat("q", &[], false, "English").await.text, CHAT_NO_TEXT);

    assert!(requests.lock().unwrap()[0].1.get("tools").is_none());
}

#[tokio::test]
async fn test_quiz_is_normalized_and_truncated() {
    let reply = json!({
        "questions": [
            { "question": "1?", "options": ["a", "b", "c", "d"], "correctAnswer": "c" },
            { "question": "2?", "options": ["a", "b", "c", "d"], "correctAnswer": 3 },
            { "question": "3?", "options": ["a", "b", "c", "d"], "correctAnswer": "B" }
        ]
    });
    let (tutor, _) = tutor(vec![text_reply(&reply.to_string()), Err(GeminiError::Transport("down".into()))]);

    let questions = tutor.generate_quiz("Algebra", "English", 2).await;
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[1].correct_answer(), "d");

    assert!(tutor.generate_quiz("Algebra", "English", 2).await.is_empty());
}

#[tokio::test]
async fn test_exam_prompt_uses_kind() {
    let (tutor, requests) = tutor(vec![text_reply("[]")]);

    assert!(tutor.generate_exam("Chemistry", ExamKind::Monthly, "English").await.is_empty());

    let requests = requests.lock().unwrap();
    let prompt = requests[0].1["contents"][0]["parts"][0]["text"].as_str().unwrap().to_string();
    assert!(prompt.contains("Hard monthly exam"));
    assert!(prompt.contains("Exactly 25 questions"));
}

#[tokio::test]
async fn test_exam_feedback_summarizes_answers() {
    let quiz = json!([
        { "question": "2+2?", "options": ["3", "4"], "correctAnswer": "4" },
        { "question": "3+3?", "options": ["6", "7"], "correctAnswer": "6" }
    ]);
    let questions = luminous_core::normalize::normalize_questions(&quiz);
    let answers = HashMap::from([(0, "3".to_string())]);

    let (tutor, requests) = tutor(vec![
        text_reply("Review addition."),
        Ok(GenerateContentResponse::default()),
        Err(GeminiError::Decode("bad".into())),
    ]);

    let feedback = tutor.exam_feedback(&questions, &answers, "Math", ExamKind::Weekly, "English").await;
    assert_eq!(feedback, "Review addition.");

    let prompt = requests.lock().unwrap()[0].1["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(prompt.contains("Q: 2+2? | Correct: 4 | User Answer: 3"));
    assert!(prompt.contains("Q: 3+3? | Correct: 6 | User Answer: Skipped"));

    let empty = tutor.exam_feedback(&questions, &answers, "Math", ExamKind::Weekly, "English").await;
    assert_eq!(empty, FEEDBACK_EMPTY);
    let failed = tutor.exam_feedback(&questions, &answers, "Math", ExamKind::Weekly, "English").await;
    assert_eq!(failed, FEEDBACK_FAILED);
}

#[tokio::test]
async fn test_structured_results() {
    let (tutor, requests) = tutor(vec![
        text_reply(r#"{"summary": "Cells", "keyPoints": ["nucleus"], "vocabulary": []}"#),
        text_reply(r#"{"phases": [{"phaseTitle": "Start"}]}"#),
        text_reply(r#"{"word": "luz", "synonyms": ["claridad"]}"#),
        text_reply("no idea"),
    ]);

    let material = StudyMaterial { mime_type: "application/pdf".into(), data: "JVBERi0=".into() };
    let guide = tutor.study_guide(&material, "Spanish").await.unwrap();
    assert_eq!(guide.key_points, ["nucleus"]);

    let roadmap = tutor.roadmap("Rust", "beginner", "English").await.unwrap();
    assert_eq!(roadmap.title, "Untitled Roadmap");
    assert_eq!(roadmap.phases[0].phase_title, "Start");

    let entry = tutor.lookup_word("luz", "Spanish").await.unwrap();
    assert_eq!(entry.synonyms, ["claridad"]);

    assert!(tutor.lookup_word("zzz", "Spanish").await.is_none());

    let requests = requests.lock().unwrap();
    assert_eq!(
        requests[0].1["contents"][0]["parts"][0]["inlineData"],
        json!({ "mimeType": "application/pdf", "data": "JVBERi0=" })
    );
}

#[tokio::test]
async fn test_speech_is_decoded_to_floats() {
    let audio = pcm::encode_base64(&pcm::pcm16_to_bytes(&[0, 16384, -16384]));
    let reply = serde_json::from_value(json!({
        "candidates": [{ "content": { "parts": [{ "inlineData": { "mimeType": "audio/pcm", "data": audio } }] } }]
    }))
    .unwrap();
    let (tutor, requests) = tutor(vec![Ok(reply), text_reply("no audio here")]);

    let clip = tutor.synthesize_speech("Bonjour", "French").await.unwrap();
    assert_eq!(clip.sample_rate, SPEECH_SAMPLE_RATE);
    assert_eq!(clip.samples, vec![0.0, 0.5, -0.5]);

    assert!(tutor.synthesize_speech("Bonjour", "French").await.is_none());

    let requests = requests.lock().unwrap();
    let (model, body) = &requests[0];
    assert_eq!(model, "tts-model");
    assert_eq!(body["generationConfig"]["responseModalities"], json!(["AUDIO"]));
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
}
