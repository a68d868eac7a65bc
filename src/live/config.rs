use serde::{Deserialize, Serialize};

use super::messages::{ClientMessage, LiveSetup};
use crate::audio::AudioBackendConfig;

/// Configuration for a live interpretation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSessionConfig {
    /// Unique session identifier (e.g., "live-<uuid>")
    pub session_id: String,

    /// First conversation language, e.g. "English"
    pub source_language: String,

    /// Second conversation language, e.g. "Spanish"
    pub target_language: String,

    /// Live model name, without the `models/` prefix
    pub model: String,

    /// Prebuilt voice used for spoken output
    pub voice: String,

    /// Microphone frames are sent at this rate
    pub input_sample_rate: u32,

    /// Model audio arrives at this rate
    pub output_sample_rate: u32,

    /// Samples per outbound frame
    pub frame_samples: usize,

    /// Capture device buffer size in milliseconds
    pub capture_buffer_ms: u64,
}

impl Default for LiveSessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            source_language: "English".to_string(),
            target_language: "Spanish".to_string(),
            model: "gemini-2.5-flash".to_string(),
            voice: "Puck".to_string(),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: 4096,
            capture_buffer_ms: 100,
        }
    }
}

impl LiveSessionConfig {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            ..Self::default()
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Interpreter instruction for the two configured languages
    pub fn system_instruction(&self) -> String {
        let (a, b) = (&self.source_language, &self.target_language);
        format!(
            "You are a helpful simultaneous interpreter. \
             You will hear a conversation involving two languages: {a} and {b}. \
             If you hear {a}, translate it to {b}. \
             If you hear {b}, translate it to {a}. \
             Output only the translated audio. Do not include your own thoughts or conversational fillers."
        )
    }

    pub fn setup_message(&self) -> ClientMessage {
        ClientMessage::Setup(LiveSetup::interpreter(
            &self.model,
            &self.voice,
            self.system_instruction(),
        ))
    }

    pub fn capture_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.input_sample_rate,
            buffer_duration_ms: self.capture_buffer_ms,
        }
    }
}
