//! Realtime interpretation sessions
//!
//! This module provides the `LiveSession` controller that manages:
//! - Microphone capture, re-chunked into fixed PCM16 frames
//! - The duplex stream to the live model (setup handshake, realtime input)
//! - Gapless scheduling of model audio on the output device
//! - Transcript collection and session state

mod config;
mod error;
mod messages;
mod schedule;
mod session;
mod stats;
mod transport;
mod websocket;

pub use config::LiveSessionConfig;
pub use error::LiveError;
pub use messages::{
    ClientMessage, GoAway, LiveSetup, MediaChunk, ModelTurn, RealtimeInput, ServerContent,
    ServerEvent, ServerMessage, Transcription, TurnPart,
};
pub use schedule::{PlaybackSchedule, ScheduledBuffer};
pub use session::{LiveCallbacks, LiveSession, SessionResources, StopHandle};
pub use stats::{SessionState, SessionStats, TranscriptDirection, TranscriptEvent};
pub use transport::{LinkPeer, LiveConnector, LiveLink};
pub use websocket::{GeminiLiveConnector, DEFAULT_LIVE_ENDPOINT};
