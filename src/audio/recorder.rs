use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::pcm;

/// Playback device that records the scheduled output timeline to a WAV file
///
/// The clock runs on wall time since creation. Gaps between scheduled buffers
/// are written as silence so the file lines up with what a speaker would play.
pub struct WavRecorderOutput {
    name: String,
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    started: Instant,
    samples_written: u64,
}

impl WavRecorderOutput {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        info!("Recording output to {} at {}Hz", path.display(), sample_rate);

        Ok(Self {
            name: format!("WAV recorder {}", path.display()),
            path,
            writer: Some(writer),
            sample_rate,
            started: Instant::now(),
            samples_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples written so far, silence included
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    fn write_samples(&mut self, samples: impl IntoIterator<Item = i16>) -> Result<()> {
        let writer = self.writer.as_mut().context("Recorder already closed")?;
        for sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
            self.samples_written += 1;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl super::backend::AudioOutput for WavRecorderOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn play_at(&mut self, samples: &[f32], start_at: f64) -> Result<()> {
        let start_sample = (start_at.max(0.0) * self.sample_rate as f64).round() as u64;
        if start_sample > self.samples_written {
            let gap = start_sample - self.samples_written;
            debug!("Padding {} samples of silence", gap);
            self.write_samples(std::iter::repeat(0i16).take(gap as usize))?;
        }

        self.write_samples(pcm::f32_to_pcm16(samples))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
            info!(
                "Output recording complete: {} ({:.1}s)",
                self.path.display(),
                self.samples_written as f64 / self.sample_rate.max(1) as f64
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for WavRecorderOutput {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::AudioOutput;

    #[tokio::test]
    async fn test_gaps_are_padded_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut output = WavRecorderOutput::create(&path, 1000).unwrap();
        output.play_at(&[0.5; 100], 0.0).unwrap();
        output.play_at(&[0.5; 100], 0.2).unwrap();
        output.close().await.unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 300);
        assert!(samples[..100].iter().all(|&s| s > 0));
        assert!(samples[100..200].iter().all(|&s| s == 0));
        assert!(samples[200..].iter().all(|&s| s > 0));
    }

    #[tokio::test]
    async fn test_overlapping_buffers_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut output = WavRecorderOutput::create(&path, 1000).unwrap();
        output.play_at(&[0.1; 50], 0.0).unwrap();
        output.play_at(&[0.1; 50], 0.01).unwrap();
        assert_eq!(output.samples_written(), 100);

        output.close().await.unwrap();
        assert!(output.play_at(&[0.1], 1.0).is_err());
    }
}
