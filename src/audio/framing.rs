use super::backend::AudioFrame;

/// Re-chunks capture buffers of arbitrary length into fixed-size PCM16 frames.
///
/// Leftover samples are held until the next push completes a frame.
#[derive(Debug)]
pub struct FrameAccumulator {
    frame_samples: usize,
    sample_rate: u32,
    pending: Vec<f32>,
    frames_emitted: u64,
}

impl FrameAccumulator {
    pub fn new(frame_samples: usize, sample_rate: u32) -> Self {
        let frame_samples = frame_samples.max(1);
        Self {
            frame_samples,
            sample_rate,
            pending: Vec::with_capacity(frame_samples),
            frames_emitted: 0,
        }
    }

    /// Append samples and return every frame completed by them
    pub fn push(&mut self, samples: &[f32]) -> Vec<AudioFrame> {
        self.pending.extend_from_slice(samples);

        let complete = self.pending.len() / self.frame_samples;
        if complete == 0 {
            return Vec::new();
        }

        let mut frames = Vec::with_capacity(complete);
        for chunk in self.pending.chunks_exact(self.frame_samples) {
            frames.push(AudioFrame::from_f32(chunk, self.sample_rate, self.frame_timestamp_ms()));
            self.frames_emitted += 1;
        }
        self.pending.drain(..complete * self.frame_samples);

        frames
    }

    /// Samples waiting for the next frame
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    fn frame_timestamp_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames_emitted * self.frame_samples as u64 * 1000 / self.sample_rate as u64
    }
}
