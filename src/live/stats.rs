use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Opening,
    Active,
    Closing,
    Errored,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Opening => "opening",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Which side of the conversation a transcript fragment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptDirection {
    /// What the speaker said
    Input,
    /// What the model said back
    Output,
}

/// A single transcript fragment, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    pub direction: TranscriptDirection,
    pub timestamp: DateTime<Utc>,
}

/// Statistics about a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub state: SessionState,

    /// When the session was started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Microphone frames sent upstream
    pub frames_sent: u64,

    /// Model audio buffers handed to the output device
    pub audio_buffers_scheduled: u64,

    /// Seconds of model audio scheduled
    pub scheduled_audio_secs: f64,

    pub transcript_events_count: usize,
}
