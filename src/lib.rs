pub mod audio;
pub mod config;
pub mod gemini;
pub mod http;
pub mod live;
pub mod normalize;
pub mod recovery;

pub use audio::{
    AudioBackendConfig, AudioBackendFactory, AudioDevices, AudioFile, AudioFrame, AudioInput,
    AudioOutput, AudioSink, AudioSource, DeviceSelection, WavFileInput, WavRecorderOutput,
};
pub use config::Config;
pub use gemini::{GeminiClient, GeminiError, TextModel, Tutor};
pub use http::{create_router, AppState, LiveRuntime};
pub use live::{
    GeminiLiveConnector, LiveCallbacks, LiveError, LiveSession, LiveSessionConfig,
    SessionResources, SessionState, SessionStats, TranscriptDirection, TranscriptEvent,
};
pub use normalize::{
    normalize_quiz_output, DictionaryEntry, ModelResult, QuizQuestion, Roadmap, StudyGuide,
    TranslationResult,
};
pub use recovery::{parse_model_json, parse_model_json_as};
