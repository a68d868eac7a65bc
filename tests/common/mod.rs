// Shared fakes for live session tests
//
// FakeDevices hands out a channel-fed microphone and an output with a manual
// clock; FakeConnector hands the transport end of each link to the test.

#![allow(dead_code)]

pub mod strategies;

use anyhow::{bail, Result};
use luminous_core::audio::{AudioBackendConfig, AudioDevices, AudioInput, AudioOutput, CaptureBuffer};
use luminous_core::live::{ClientMessage, LinkPeer, LiveConnector, LiveError, LiveLink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(5);

/// What the fake devices observed
#[derive(Default)]
pub struct DeviceProbe {
    pub capture: Mutex<Option<mpsc::Sender<CaptureBuffer>>>,
    pub input_opened: AtomicBool,
    pub input_stopped: AtomicBool,
    pub output_closed: AtomicBool,
    pub clock: Mutex<f64>,
    /// (start_at, sample count) per play_at call
    pub plays: Mutex<Vec<(f64, usize)>>,
}

impl DeviceProbe {
    pub fn set_clock(&self, seconds: f64) {
        *self.clock.lock().unwrap() = seconds;
    }

    pub fn plays(&self) -> Vec<(f64, usize)> {
        self.plays.lock().unwrap().clone()
    }

    pub fn capture_sender(&self) -> mpsc::Sender<CaptureBuffer> {
        self.capture.lock().unwrap().clone().expect("capture not started")
    }

    pub fn input_stopped(&self) -> bool {
        self.input_stopped.load(Ordering::SeqCst)
    }

    pub fn output_closed(&self) -> bool {
        self.output_closed.load(Ordering::SeqCst)
    }
}

#[derive(Default, Clone)]
pub struct FakeDevices {
    pub probe: Arc<DeviceProbe>,
    /// Error returned by `AudioInput::start`, e.g. a denied permission
    pub start_error: Option<String>,
    pub output_error: Option<String>,
    /// How long `AudioInput::start` takes before returning
    pub start_delay: Option<Duration>,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start(message: &str) -> Self {
        Self {
            start_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn slow_start(delay: Duration) -> Self {
        Self {
            start_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing_output(message: &str) -> Self {
        Self {
            output_error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

struct FakeInput {
    probe: Arc<DeviceProbe>,
    start_error: Option<String>,
    start_delay: Option<Duration>,
    capturing: bool,
}

#[async_trait::async_trait]
impl AudioInput for FakeInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBuffer>> {
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.start_error {
            bail!("{}", message);
        }
        let (tx, rx) = mpsc::channel(64);
        *self.probe.capture.lock().unwrap() = Some(tx);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        self.probe.capture.lock().unwrap().take();
        self.probe.input_stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "fake microphone"
    }
}

struct FakeOutput {
    probe: Arc<DeviceProbe>,
    sample_rate: u32,
}

#[async_trait::async_trait]
impl AudioOutput for FakeOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        *self.probe.clock.lock().unwrap()
    }

    fn play_at(&mut self, samples: &[f32], start_at: f64) -> Result<()> {
        self.probe.plays.lock().unwrap().push((start_at, samples.len()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.probe.output_closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake speaker"
    }
}

#[async_trait::async_trait]
impl AudioDevices for FakeDevices {
    async fn open_input(&self, _config: &AudioBackendConfig) -> Result<Box<dyn AudioInput>> {
        self.probe.input_opened.store(true, Ordering::SeqCst);
        Ok(Box::new(FakeInput {
            probe: Arc::clone(&self.probe),
            start_error: self.start_error.clone(),
            start_delay: self.start_delay,
            capturing: false,
        }))
    }

    async fn open_output(&self, sample_rate: u32) -> Result<Box<dyn AudioOutput>> {
        if let Some(message) = &self.output_error {
            bail!("{}", message);
        }
        Ok(Box::new(FakeOutput {
            probe: Arc::clone(&self.probe),
            sample_rate,
        }))
    }
}

/// Transport end of an accepted connection plus the setup it was opened with
pub struct Accepted {
    pub setup: ClientMessage,
    pub peer: LinkPeer,
}

pub enum ConnectBehavior {
    Accept,
    Fail(LiveError),
    /// Never completes the handshake
    Hang,
}

pub struct FakeConnector {
    behavior: ConnectBehavior,
    accepted: mpsc::UnboundedSender<Accepted>,
}

impl FakeConnector {
    pub fn new(behavior: ConnectBehavior) -> (Self, mpsc::UnboundedReceiver<Accepted>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        (Self { behavior, accepted }, rx)
    }
}

#[async_trait::async_trait]
impl LiveConnector for FakeConnector {
    async fn connect(&self, setup: ClientMessage) -> Result<LiveLink, LiveError> {
        match &self.behavior {
            ConnectBehavior::Accept => {
                let (link, peer) = LiveLink::pair(64);
                let _ = self.accepted.send(Accepted { setup, peer });
                Ok(link)
            }
            ConnectBehavior::Fail(e) => Err(e.clone()),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Poll `check` until it holds or `WAIT` elapses
pub async fn eventually<F: FnMut() -> bool>(mut check: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
