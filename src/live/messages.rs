use serde::{Deserialize, Serialize};

use super::error::LiveError;
use super::stats::TranscriptDirection;
use crate::audio::AudioFrame;
use crate::gemini::types::{Content, InlineData, SpeechConfig};

/// Message sent to the live endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(LiveSetup),
    RealtimeInput(RealtimeInput),
}

impl ClientMessage {
    /// Wrap a PCM16 frame as a realtime media chunk
    pub fn realtime_audio(frame: &AudioFrame) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: frame.mime_type(),
                data: frame.to_base64(),
            }],
        })
    }

    pub fn to_json(&self) -> Result<String, LiveError> {
        serde_json::to_string(self).map_err(|e| LiveError::Protocol(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveSetup {
    /// Fully qualified model name, `models/<name>`
    pub model: String,
    pub generation_config: LiveGenerationConfig,
    pub system_instruction: Content,
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
}

impl LiveSetup {
    /// Audio-out setup with transcription of both directions
    pub fn interpreter(model: &str, voice: &str, instruction: String) -> Self {
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };

        Self {
            model,
            generation_config: LiveGenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig::voice(voice),
            },
            system_instruction: Content::instruction(instruction),
            input_audio_transcription: TranscriptionConfig {},
            output_audio_transcription: TranscriptionConfig {},
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveGenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

/// Empty object enabling transcription
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TranscriptionConfig {}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// Base64-encoded PCM bytes tagged `audio/pcm;rate=N`
pub type MediaChunk = InlineData;

/// Message received from the live endpoint
///
/// Every field is optional; a single message may carry several of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transcription {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<TurnPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPart {
    pub inline_data: Option<MediaChunk>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    pub time_left: Option<String>,
}

/// One unit of work demultiplexed from a server message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SetupComplete,
    Transcript {
        direction: TranscriptDirection,
        text: String,
    },
    /// Base64 PCM16 audio
    Audio { data: String },
    Interrupted,
    TurnComplete,
    GoAway { time_left: Option<String> },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, LiveError> {
        serde_json::from_str(text).map_err(|e| LiveError::Protocol(e.to_string()))
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, LiveError> {
        serde_json::from_slice(bytes).map_err(|e| LiveError::Protocol(e.to_string()))
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    /// Events in handling order: transcripts before audio, turn markers last
    pub fn into_events(self) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(ServerEvent::SetupComplete);
        }

        if let Some(content) = self.server_content {
            let transcripts = [
                (TranscriptDirection::Input, content.input_transcription),
                (TranscriptDirection::Output, content.output_transcription),
            ];
            for (direction, transcription) in transcripts {
                if let Some(text) = transcription.and_then(|t| t.text).filter(|t| !t.is_empty()) {
                    events.push(ServerEvent::Transcript { direction, text });
                }
            }

            if let Some(turn) = content.model_turn {
                events.extend(
                    turn.parts
                        .into_iter()
                        .filter_map(|part| part.inline_data)
                        .filter(|chunk| !chunk.data.is_empty())
                        .map(|chunk| ServerEvent::Audio { data: chunk.data }),
                );
            }

            if content.interrupted {
                events.push(ServerEvent::Interrupted);
            }
            if content.turn_complete {
                events.push(ServerEvent::TurnComplete);
            }
        }

        if let Some(go_away) = self.go_away {
            events.push(ServerEvent::GoAway {
                time_left: go_away.time_left,
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setup_wire_shape() {
        let setup = ClientMessage::Setup(LiveSetup::interpreter("gemini-live", "Puck", "Interpret.".into()));
        let value = serde_json::to_value(&setup).unwrap();
        assert_eq!(
            value,
            json!({
                "setup": {
                    "model": "models/gemini-live",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {
                            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Puck" } }
                        }
                    },
                    "systemInstruction": { "parts": [{ "text": "Interpret." }] },
                    "inputAudioTranscription": {},
                    "outputAudioTranscription": {}
                }
            })
        );
    }

    #[test]
    fn test_model_prefix_not_doubled() {
        let setup = LiveSetup::interpreter("models/x", "Puck", String::new());
        assert_eq!(setup.model, "models/x");
    }

    #[test]
    fn test_realtime_audio_chunk() {
        let frame = AudioFrame {
            samples: vec![1, -2],
            sample_rate: 16000,
            timestamp_ms: 0,
        };
        let value = serde_json::to_value(ClientMessage::realtime_audio(&frame)).unwrap();
        assert_eq!(
            value,
            json!({
                "realtimeInput": {
                    "mediaChunks": [{ "mimeType": "audio/pcm;rate=16000", "data": "AQD+/w==" }]
                }
            })
        );
    }

    #[test]
    fn test_events_in_handling_order() {
        let msg = ServerMessage::parse(
            r#"{"serverContent":{
                "outputTranscription":{"text":"hola"},
                "inputTranscription":{"text":"hello"},
                "modelTurn":{"parts":[{"inlineData":{"mimeType":"audio/pcm;rate=24000","data":"AAA="}}]},
                "turnComplete":true}}"#,
        )
        .unwrap();

        assert_eq!(
            msg.into_events(),
            vec![
                ServerEvent::Transcript {
                    direction: TranscriptDirection::Input,
                    text: "hello".into()
                },
                ServerEvent::Transcript {
                    direction: TranscriptDirection::Output,
                    text: "hola".into()
                },
                ServerEvent::Audio { data: "AAA=".into() },
                ServerEvent::TurnComplete,
            ]
        );
    }

    #[test]
    fn test_setup_complete_and_empty_fragments() {
        let msg = ServerMessage::parse(r#"{"setupComplete":{}}"#).unwrap();
        assert!(msg.is_setup_complete());
        assert_eq!(msg.into_events(), vec![ServerEvent::SetupComplete]);

        let msg = ServerMessage::parse(r#"{"serverContent":{"inputTranscription":{"text":""}}}"#).unwrap();
        assert!(msg.into_events().is_empty());
    }

    #[test]
    fn test_malformed_is_protocol_error() {
        assert!(matches!(ServerMessage::parse("{oops"), Err(LiveError::Protocol(_))));
        assert!(ServerMessage::parse_bytes(br#"{"goAway":{"timeLeft":"5s"}}"#).is_ok());
    }
}
