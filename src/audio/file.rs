use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackendConfig, AudioInput, CaptureBuffer};
use super::pcm;

/// Decoded WAV file, downmixed to mono floats
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Int => {
                if spec.bits_per_sample != 16 {
                    bail!("Unsupported integer WAV depth: {} bits", spec.bits_per_sample);
                }
                let samples = reader
                    .into_samples::<i16>()
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?;
                pcm::pcm16_to_f32(&samples)
            }
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        let samples = pcm::downmix_to_mono(&interleaved, spec.channels);
        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Mono samples at `target_rate`
    pub fn resampled(&self, target_rate: u32) -> Vec<f32> {
        pcm::resample_linear(&self.samples, self.sample_rate, target_rate)
    }
}

/// Capture device that plays a WAV file into the session as if spoken
pub struct WavFileInput {
    name: String,
    config: AudioBackendConfig,
    samples: Vec<f32>,
    realtime: bool,
    task: Option<JoinHandle<()>>,
}

impl WavFileInput {
    pub fn open(path: impl AsRef<Path>, config: AudioBackendConfig) -> Result<Self> {
        let file = AudioFile::open(path)?;
        let samples = file.resampled(config.target_sample_rate);
        Ok(Self {
            name: format!("WAV file {}", file.path),
            config,
            samples,
            realtime: true,
            task: None,
        })
    }

    /// Emit buffers as fast as the receiver accepts them instead of at real-time pace
    pub fn without_pacing(mut self) -> Self {
        self.realtime = false;
        self
    }
}

#[async_trait::async_trait]
impl AudioInput for WavFileInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBuffer>> {
        if self.task.is_some() {
            bail!("Already capturing");
        }

        let sample_rate = self.config.target_sample_rate;
        let buffer_ms = self.config.buffer_duration_ms.max(1);
        let buffer_len = (sample_rate as u64 * buffer_ms / 1000).max(1) as usize;
        let samples = self.samples.clone();
        let realtime = self.realtime;

        let (tx, rx) = mpsc::channel(100);

        info!("Starting {} ({} buffers of {}ms)", self.name, samples.len().div_ceil(buffer_len), buffer_ms);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(buffer_ms));
            for (index, chunk) in samples.chunks(buffer_len).enumerate() {
                if realtime {
                    ticker.tick().await;
                }

                let buffer = CaptureBuffer {
                    samples: chunk.to_vec(),
                    sample_rate,
                    timestamp_ms: index as u64 * buffer_ms,
                };
                if tx.send(buffer).await.is_err() {
                    debug!("Capture receiver dropped");
                    return;
                }
            }
            debug!("WAV input exhausted");
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            info!("Stopping {}", self.name);
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
