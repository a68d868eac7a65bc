use thiserror::Error;

/// Failures surfaced through a live session's error callback
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiveError {
    /// Capture device could not be opened or started (e.g. permission denied)
    #[error("microphone unavailable: {0}")]
    Microphone(String),

    #[error("audio output unavailable: {0}")]
    AudioOutput(String),

    /// Connecting or the setup exchange failed
    #[error("live handshake failed: {0}")]
    Handshake(String),

    #[error("live stream error: {0}")]
    Stream(String),

    #[error("live stream closed by server{}", .0.as_deref().map(|r| format!(": {}", r)).unwrap_or_default())]
    StreamClosed(Option<String>),

    /// Malformed message from the server
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl LiveError {
    /// Errors raised before the session reached Active
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            LiveError::Microphone(_) | LiveError::AudioOutput(_) | LiveError::Handshake(_)
        )
    }
}
