pub mod backend;
pub mod file;
pub mod framing;
pub mod pcm;
pub mod recorder;

#[cfg(feature = "cpal")]
pub mod cpal;

pub use backend::{
    pcm_mime_type, AudioBackendConfig, AudioBackendFactory, AudioDevices, AudioFrame, AudioInput,
    AudioOutput, AudioSink, AudioSource, CaptureBuffer, DeviceSelection,
};
pub use file::{AudioFile, WavFileInput};
pub use framing::FrameAccumulator;
pub use recorder::WavRecorderOutput;
