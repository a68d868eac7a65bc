use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::pcm;

/// Block of captured microphone samples (mono, f32)
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    /// Mono float samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Audio frame on the wire (16-bit PCM, mono)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// PCM16 samples
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    pub fn from_f32(samples: &[f32], sample_rate: u32, timestamp_ms: u64) -> Self {
        Self {
            samples: pcm::f32_to_pcm16(samples),
            sample_rate,
            timestamp_ms,
        }
    }

    /// Decode a base64 PCM16 payload
    pub fn from_base64(data: &str, sample_rate: u32) -> Result<Self> {
        let bytes = pcm::decode_base64(data)?;
        Ok(Self {
            samples: pcm::bytes_to_pcm16(&bytes),
            sample_rate,
            timestamp_ms: 0,
        })
    }

    pub fn to_base64(&self) -> String {
        pcm::encode_base64(&pcm::pcm16_to_bytes(&self.samples))
    }

    pub fn to_f32(&self) -> Vec<f32> {
        pcm::pcm16_to_f32(&self.samples)
    }

    /// MIME descriptor for this frame, e.g. `audio/pcm;rate=16000`
    pub fn mime_type(&self) -> String {
        pcm_mime_type(self.sample_rate)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}

/// Configuration for a capture device
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will resample if needed)
    pub target_sample_rate: u32,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // Live input rate
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

/// Audio capture device
///
/// Implementations:
/// - `WavFileInput`: streams a WAV file at real-time pace
/// - `CpalMicrophone` (feature `cpal`): default system microphone
#[async_trait::async_trait]
pub trait AudioInput: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive mono capture buffers.
    /// Permission prompts and device errors surface here.
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBuffer>>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if the device is currently capturing
    fn is_capturing(&self) -> bool;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Audio playback device with its own clock
///
/// `current_time` is expressed in seconds of the device's output timeline;
/// `play_at` places samples on that timeline.
#[async_trait::async_trait]
pub trait AudioOutput: Send + Sync {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Current position of the output clock in seconds
    fn current_time(&self) -> f64;

    /// Queue mono samples to start playing at `start_at` seconds
    fn play_at(&mut self, samples: &[f32], start_at: f64) -> Result<()>;

    /// Stop playback and release the device
    async fn close(&mut self) -> Result<()>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Opens the capture and playback devices of a session
#[async_trait::async_trait]
pub trait AudioDevices: Send + Sync {
    async fn open_input(&self, config: &AudioBackendConfig) -> Result<Box<dyn AudioInput>>;

    async fn open_output(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>>;
}

/// Audio source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Microphone input (requires the `cpal` feature)
    Microphone,
    /// WAV file input (for testing/batch processing)
    File(String),
}

/// Audio sink type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSink {
    /// Default speaker (requires the `cpal` feature)
    Speaker,
    /// WAV file output
    WavFile(String),
}

/// Audio device factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create a capture device for the given source
    pub fn create_input(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioInput>> {
        match source {
            AudioSource::Microphone => {
                #[cfg(feature = "cpal")]
                {
                    let backend = super::cpal::CpalMicrophone::new(config)?;
                    Ok(Box::new(backend))
                }

                #[cfg(not(feature = "cpal"))]
                {
                    let _ = config;
                    anyhow::bail!("Microphone capture requires the `cpal` feature")
                }
            }

            AudioSource::File(path) => {
                let backend = super::file::WavFileInput::open(&path, config)
                    .with_context(|| format!("Failed to open input file {}", path))?;
                Ok(Box::new(backend))
            }
        }
    }

    /// Create a playback device for the given sink
    pub fn create_output(sink: AudioSink, sample_rate: u32) -> Result<Box<dyn AudioOutput>> {
        match sink {
            AudioSink::Speaker => {
                #[cfg(feature = "cpal")]
                {
                    let backend = super::cpal::CpalSpeaker::open(sample_rate)?;
                    Ok(Box::new(backend))
                }

                #[cfg(not(feature = "cpal"))]
                {
                    let _ = sample_rate;
                    anyhow::bail!("Speaker playback requires the `cpal` feature")
                }
            }

            AudioSink::WavFile(path) => {
                let backend = super::recorder::WavRecorderOutput::create(&path, sample_rate)
                    .with_context(|| format!("Failed to create output file {}", path))?;
                Ok(Box::new(backend))
            }
        }
    }
}

/// Fixed source/sink pair, opened through `AudioBackendFactory`
#[derive(Debug, Clone)]
pub struct DeviceSelection {
    pub source: AudioSource,
    pub sink: AudioSink,
}

impl DeviceSelection {
    pub fn new(source: AudioSource, sink: AudioSink) -> Self {
        Self { source, sink }
    }

    /// Microphone in, speaker out
    pub fn hardware() -> Self {
        Self::new(AudioSource::Microphone, AudioSink::Speaker)
    }
}

#[async_trait::async_trait]
impl AudioDevices for DeviceSelection {
    async fn open_input(&self, config: &AudioBackendConfig) -> Result<Box<dyn AudioInput>> {
        AudioBackendFactory::create_input(self.source.clone(), config.clone())
    }

    async fn open_output(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>> {
        AudioBackendFactory::create_output(self.sink.clone(), sample_rate)
    }
}
