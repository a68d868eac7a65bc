//! Default system microphone and speaker via cpal
//!
//! cpal streams are not `Send`, so each device owns its stream on a dedicated
//! thread and shares samples with the async side through channels and a queue.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::backend::{AudioBackendConfig, AudioInput, AudioOutput, CaptureBuffer};
use super::pcm;

const DEVICE_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default input device, delivering mono buffers at the configured rate
pub struct CpalMicrophone {
    name: String,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalMicrophone {
    pub fn new(config: AudioBackendConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No audio input device available"))?;
        let name = device.name().unwrap_or_else(|_| "Unknown microphone".to_string());

        Ok(Self {
            name,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioInput for CpalMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBuffer>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(100);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<()>>();

        let target_rate = self.config.target_sample_rate;
        let capturing = Arc::clone(&self.capturing);

        let thread = std::thread::spawn(move || {
            let stream = match build_input_stream(tx, target_rate) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(anyhow!("Failed to start input stream: {}", e)));
                return;
            }

            capturing.store(true, Ordering::SeqCst);
            let _ = ready_tx.send(Ok(()));

            // Hold the stream until stop is requested or the handle is dropped
            let _ = stop_rx.recv();
            drop(stream);
            capturing.store(false, Ordering::SeqCst);
        });

        let ready = tokio::task::spawn_blocking(move || ready_rx.recv_timeout(DEVICE_OPEN_TIMEOUT))
            .await
            .context("Microphone startup task failed")?;

        match ready {
            Ok(Ok(())) => {
                info!("Microphone capture started: {} at {}Hz", self.name, target_rate);
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                Ok(rx)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => bail!("Timed out opening microphone"),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("Microphone shutdown task failed")?
                .map_err(|_| anyhow!("Microphone thread panicked"))?;
            info!("Microphone capture stopped: {}", self.name);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn build_input_stream(tx: mpsc::Sender<CaptureBuffer>, target_rate: u32) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No audio input device available"))?;
    let supported = device
        .default_input_config()
        .context("Failed to get default input config")?;

    let device_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let started = Instant::now();
    debug!("Input device config: {}Hz, {} channels, {:?}", device_rate, channels, supported.sample_format());

    let deliver = move |interleaved: Vec<f32>| {
        let mono = pcm::downmix_to_mono(&interleaved, channels);
        let samples = pcm::resample_linear(&mono, device_rate, target_rate);
        let buffer = CaptureBuffer {
            samples,
            sample_rate: target_rate,
            timestamp_ms: started.elapsed().as_millis() as u64,
        };
        if tx.try_send(buffer).is_err() {
            debug!("Capture channel full or closed, dropping buffer");
        }
    };

    let config: cpal::StreamConfig = supported.config();
    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| deliver(data.to_vec()),
            |err| error!("Input stream error: {}", err),
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| deliver(pcm::pcm16_to_f32(data)),
            |err| error!("Input stream error: {}", err),
            None,
        ),
        other => bail!("Unsupported input sample format: {:?}", other),
    }
    .context("Failed to build input stream (microphone permission denied?)")?;

    Ok(stream)
}

/// Default output device with a sample-counting clock
///
/// Buffers are resampled to the device rate and queued; silence fills the gap
/// when a buffer is scheduled past the end of the queue.
pub struct CpalSpeaker {
    name: String,
    sample_rate: u32,
    device_rate: u32,
    queue: Arc<Mutex<VecDeque<f32>>>,
    played: Arc<AtomicU64>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalSpeaker {
    pub fn open(sample_rate: u32) -> Result<Self> {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let played = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(String, u32)>>();

        let thread_queue = Arc::clone(&queue);
        let thread_played = Arc::clone(&played);
        let thread = std::thread::spawn(move || {
            let (stream, name, device_rate) = match build_output_stream(thread_queue, thread_played) {
                Ok(opened) => opened,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(anyhow!("Failed to start output stream: {}", e)));
                return;
            }

            let _ = ready_tx.send(Ok((name, device_rate)));
            let _ = stop_rx.recv();
            drop(stream);
        });

        let (name, device_rate) = ready_rx
            .recv_timeout(DEVICE_OPEN_TIMEOUT)
            .map_err(|_| anyhow!("Timed out opening speaker"))??;

        info!("Speaker opened: {} ({}Hz device, {}Hz input)", name, device_rate, sample_rate);

        Ok(Self {
            name,
            sample_rate,
            device_rate,
            queue,
            played,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

#[async_trait::async_trait]
impl AudioOutput for CpalSpeaker {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.played.load(Ordering::SeqCst) as f64 / self.device_rate as f64
    }

    fn play_at(&mut self, samples: &[f32], start_at: f64) -> Result<()> {
        let resampled = pcm::resample_linear(samples, self.sample_rate, self.device_rate);
        let start_frame = (start_at.max(0.0) * self.device_rate as f64).round() as u64;

        let mut queue = self
            .queue
            .lock()
            .map_err(|_| anyhow!("Playback queue poisoned"))?;
        let queued_end = self.played.load(Ordering::SeqCst) + queue.len() as u64;
        if start_frame > queued_end {
            queue.extend(std::iter::repeat(0.0).take((start_frame - queued_end) as usize));
        }
        queue.extend(resampled);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Speaker thread panicked");
            }
            info!("Speaker closed: {}", self.name);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn build_output_stream(
    queue: Arc<Mutex<VecDeque<f32>>>,
    played: Arc<AtomicU64>,
) -> Result<(cpal::Stream, String, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("No audio output device available"))?;
    let name = device.name().unwrap_or_else(|_| "Unknown speaker".to_string());
    let supported = device
        .default_output_config()
        .context("Failed to get default output config")?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        bail!("Unsupported output sample format: {:?}", supported.sample_format());
    }

    let device_rate = supported.sample_rate().0;
    let channels = supported.channels().max(1) as usize;
    let config: cpal::StreamConfig = supported.config();

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                // Mono source fanned out to every channel
                match queue.try_lock() {
                    Ok(mut queue) => {
                        for frame in data.chunks_mut(channels) {
                            let sample = queue.pop_front().unwrap_or(0.0);
                            frame.iter_mut().for_each(|s| *s = sample);
                        }
                    }
                    Err(_) => data.iter_mut().for_each(|s| *s = 0.0),
                }
                played.fetch_add(frames as u64, Ordering::SeqCst);
            },
            |err| error!("Output stream error: {}", err),
            None,
        )
        .context("Failed to build output stream")?;

    Ok((stream, name, device_rate))
}
