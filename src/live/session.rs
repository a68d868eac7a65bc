use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::LiveSessionConfig;
use super::error::LiveError;
use super::messages::{ClientMessage, ServerEvent, ServerMessage};
use super::schedule::PlaybackSchedule;
use super::stats::{SessionState, SessionStats, TranscriptDirection, TranscriptEvent};
use super::transport::{LiveConnector, LiveLink};
use crate::audio::{pcm, AudioDevices, AudioFrame, AudioInput, AudioOutput, CaptureBuffer, FrameAccumulator};

type TranscriptCallback = dyn Fn(&str, TranscriptDirection) + Send + Sync;
type ErrorCallback = dyn Fn(&LiveError) + Send + Sync;

/// Transcript and error callbacks of a session
#[derive(Clone)]
pub struct LiveCallbacks {
    on_transcript: Arc<TranscriptCallback>,
    on_error: Arc<ErrorCallback>,
}

impl LiveCallbacks {
    pub fn new<T, E>(on_transcript: T, on_error: E) -> Self
    where
        T: Fn(&str, TranscriptDirection) + Send + Sync + 'static,
        E: Fn(&LiveError) + Send + Sync + 'static,
    {
        Self {
            on_transcript: Arc::new(on_transcript),
            on_error: Arc::new(on_error),
        }
    }

    /// Callbacks that only log
    pub fn logging() -> Self {
        Self::new(
            |text, direction| info!("[{:?}] {}", direction, text),
            |err| error!("Live session error: {}", err),
        )
    }
}

/// Devices and transport a session opens on start
#[derive(Clone)]
pub struct SessionResources {
    pub devices: Arc<dyn AudioDevices>,
    pub connector: Arc<dyn LiveConnector>,
}

impl SessionResources {
    pub fn new(devices: Arc<dyn AudioDevices>, connector: Arc<dyn LiveConnector>) -> Self {
        Self { devices, connector }
    }
}

thread_local! {
    static IN_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// Open/closed switch in front of the user callbacks
///
/// Callbacks run while holding `delivery`, and `close` takes it after flipping
/// `open`, so once `close` returns no callback is running or will run. A
/// callback that closes its own gate skips the wait.
#[derive(Debug)]
struct CallbackGate {
    open: AtomicBool,
    delivery: StdMutex<()>,
}

impl CallbackGate {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            delivery: StdMutex::new(()),
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        if !IN_CALLBACK.with(Cell::get) {
            drop(self.delivery.lock().unwrap_or_else(|e| e.into_inner()));
        }
    }

    /// Run `callback` if open; with `last`, the gate closes as it is delivered
    fn deliver(&self, last: bool, callback: impl FnOnce()) -> bool {
        let _delivering = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
        let was_open = if last {
            self.open.swap(false, Ordering::SeqCst)
        } else {
            self.open.load(Ordering::SeqCst)
        };
        if !was_open {
            return false;
        }

        let _scope = CallbackScope::enter();
        callback();
        true
    }
}

/// Marks the current thread as inside a callback until dropped
struct CallbackScope;

impl CallbackScope {
    fn enter() -> Self {
        IN_CALLBACK.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        IN_CALLBACK.with(|flag| flag.set(false));
    }
}

/// Cloneable, idempotent stop trigger
///
/// Stopping closes the callback gate before anything else and waits out a
/// callback already in flight, so no callback fires after `stop` returns.
#[derive(Clone, Debug)]
pub struct StopHandle {
    gate: Arc<CallbackGate>,
    cancel: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        self.gate.close();
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

struct Shared {
    config: LiveSessionConfig,
    started_at: DateTime<Utc>,
    state: watch::Sender<SessionState>,
    gate: Arc<CallbackGate>,
    callbacks: LiveCallbacks,
    transcript: Mutex<Vec<TranscriptEvent>>,
    frames_sent: AtomicU64,
    buffers_scheduled: AtomicU64,
    scheduled_audio_us: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        info!("Live session {}: {}", self.config.session_id, state);
        self.state.send_replace(state);
    }

    fn accepting(&self) -> bool {
        self.gate.is_open()
    }

    /// Deliver `err` unless the gate is already closed; closes it either way
    fn report_error(&self, err: &LiveError) {
        if !self.gate.deliver(true, || (self.callbacks.on_error)(err)) {
            debug!("Suppressed error after stop: {}", err);
        }
    }

    async fn record_transcript(&self, direction: TranscriptDirection, text: String) {
        if !self.gate.deliver(false, || (self.callbacks.on_transcript)(&text, direction)) {
            return;
        }
        self.transcript.lock().await.push(TranscriptEvent {
            text,
            direction,
            timestamp: Utc::now(),
        });
    }
}

/// Realtime interpretation session: microphone up, model audio and transcripts down
pub struct LiveSession {
    shared: Arc<Shared>,
    stop: StopHandle,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl LiveSession {
    /// Start a session and return immediately; must be called inside a tokio runtime
    ///
    /// Opening happens in the background. Failures are delivered once through
    /// the error callback and the session returns to Idle.
    pub fn start(config: LiveSessionConfig, resources: SessionResources, callbacks: LiveCallbacks) -> Self {
        info!(
            "Starting live session {} ({} <-> {})",
            config.session_id, config.source_language, config.target_language
        );

        let gate = Arc::new(CallbackGate::new());
        let cancel = CancellationToken::new();
        let (state, _) = watch::channel(SessionState::Opening);

        let shared = Arc::new(Shared {
            config,
            started_at: Utc::now(),
            state,
            gate: Arc::clone(&gate),
            callbacks,
            transcript: Mutex::new(Vec::new()),
            frames_sent: AtomicU64::new(0),
            buffers_scheduled: AtomicU64::new(0),
            scheduled_audio_us: AtomicU64::new(0),
        });

        let supervisor = tokio::spawn(supervise(Arc::clone(&shared), resources, cancel.clone()));

        Self {
            shared,
            stop: StopHandle { gate, cancel },
            supervisor: Mutex::new(Some(supervisor)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.shared.config.session_id
    }

    pub fn config(&self) -> &LiveSessionConfig {
        &self.shared.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request stop without waiting for teardown
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Wait until the session has torn down
    pub async fn stopped(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|state| *state == SessionState::Idle).await;
    }

    /// Stop, wait for teardown and return final stats
    pub async fn shutdown(&self) -> SessionStats {
        self.stop();

        let supervisor = self.supervisor.lock().await.take();
        if let Some(task) = supervisor {
            if let Err(e) = task.await {
                error!("Live session task panicked: {}", e);
            }
        }

        self.get_stats().await
    }

    pub async fn transcript(&self) -> Vec<TranscriptEvent> {
        self.shared.transcript.lock().await.clone()
    }

    pub async fn get_stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.shared.started_at);
        let transcript_events_count = self.shared.transcript.lock().await.len();

        SessionStats {
            session_id: self.shared.config.session_id.clone(),
            state: self.state(),
            started_at: self.shared.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.shared.frames_sent.load(Ordering::SeqCst),
            audio_buffers_scheduled: self.shared.buffers_scheduled.load(Ordering::SeqCst),
            scheduled_audio_secs: self.shared.scheduled_audio_us.load(Ordering::SeqCst) as f64 / 1_000_000.0,
            transcript_events_count,
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

/// Resources acquired so far; teardown releases whatever is present
#[derive(Default)]
struct Opened {
    input: Option<Box<dyn AudioInput>>,
    capture: Option<mpsc::Receiver<CaptureBuffer>>,
    output: Option<Box<dyn AudioOutput>>,
    link: Option<LiveLink>,
}

async fn supervise(shared: Arc<Shared>, resources: SessionResources, cancel: CancellationToken) {
    let mut opened = Opened::default();

    let opening = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = open(&shared, &resources, &mut opened) => Some(result),
    };

    let capture_task = match opening {
        None => {
            info!("Live session {} stopped while opening", shared.config.session_id);
            None
        }
        Some(Err(e)) => {
            warn!("Live session {} failed to open: {}", shared.config.session_id, e);
            shared.set_state(SessionState::Errored);
            shared.report_error(&e);
            None
        }
        Some(Ok(())) => run_active(&shared, &mut opened, &cancel).await,
    };

    shared.set_state(SessionState::Closing);
    cancel.cancel();
    teardown(opened, capture_task).await;
    shared.set_state(SessionState::Idle);
}

async fn open(shared: &Shared, resources: &SessionResources, opened: &mut Opened) -> Result<(), LiveError> {
    let config = &shared.config;

    // Held in `opened` before starting so a stop mid-start still stops it
    let input = opened.input.insert(
        resources
            .devices
            .open_input(&config.capture_config())
            .await
            .map_err(|e| LiveError::Microphone(format!("{:#}", e)))?,
    );
    let capture = input
        .start()
        .await
        .map_err(|e| LiveError::Microphone(format!("{:#}", e)))?;
    debug!("Capture started on {}", input.name());
    opened.capture = Some(capture);

    let output = resources
        .devices
        .open_output(config.output_sample_rate)
        .await
        .map_err(|e| LiveError::AudioOutput(format!("{:#}", e)))?;
    debug!("Playback opened on {}", output.name());
    opened.output = Some(output);

    let link = resources.connector.connect(config.setup_message()).await?;
    opened.link = Some(link);

    Ok(())
}

/// Runs until stop or a fatal stream error; returns the capture task for teardown
async fn run_active(shared: &Arc<Shared>, opened: &mut Opened, cancel: &CancellationToken) -> Option<JoinHandle<()>> {
    let (Some(link), Some(output), Some(capture)) =
        (opened.link.as_mut(), opened.output.as_mut(), opened.capture.take())
    else {
        return None;
    };

    shared.set_state(SessionState::Active);

    let capture_task = tokio::spawn(capture_loop(Arc::clone(shared), capture, link.sender()));

    let mut schedule = PlaybackSchedule::new();
    let failure = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break None,

            inbound = link.recv() => match inbound {
                Some(Ok(message)) => handle_message(shared, message, &mut **output, &mut schedule).await,
                Some(Err(LiveError::Protocol(e))) => warn!("Skipping malformed live message: {}", e),
                Some(Err(e)) => break Some(e),
                None => break Some(LiveError::StreamClosed(None)),
            },
        }
    };

    if let Some(e) = failure {
        warn!("Live session {} stream failed: {}", shared.config.session_id, e);
        shared.set_state(SessionState::Errored);
        shared.report_error(&e);
    }

    Some(capture_task)
}

async fn handle_message(
    shared: &Shared,
    message: ServerMessage,
    output: &mut dyn AudioOutput,
    schedule: &mut PlaybackSchedule,
) {
    for event in message.into_events() {
        // Late messages after stop are discarded
        if !shared.accepting() {
            return;
        }

        match event {
            ServerEvent::Transcript { direction, text } => shared.record_transcript(direction, text).await,
            ServerEvent::Audio { data } => play(shared, &data, output, schedule),
            // Queued audio keeps playing; the cursor only moves forward
            ServerEvent::Interrupted => debug!("Model turn interrupted"),
            ServerEvent::TurnComplete => debug!("Model turn complete"),
            ServerEvent::GoAway { time_left } => warn!("Live server going away (time left: {:?})", time_left),
            ServerEvent::SetupComplete => debug!("Duplicate setup acknowledgement"),
        }
    }
}

fn play(shared: &Shared, data: &str, output: &mut dyn AudioOutput, schedule: &mut PlaybackSchedule) {
    let frame = match AudioFrame::from_base64(data, shared.config.output_sample_rate) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Skipping undecodable audio chunk: {:#}", e);
            return;
        }
    };
    if frame.samples.is_empty() {
        return;
    }

    let samples = frame.to_f32();
    let slot = schedule.schedule_samples(output.current_time(), samples.len(), frame.sample_rate);
    if let Err(e) = output.play_at(&samples, slot.start) {
        warn!("Playback failed on {}: {:#}", output.name(), e);
        return;
    }

    shared.buffers_scheduled.fetch_add(1, Ordering::SeqCst);
    shared
        .scheduled_audio_us
        .fetch_add((slot.duration * 1_000_000.0).round() as u64, Ordering::SeqCst);
}

async fn capture_loop(shared: Arc<Shared>, mut capture: mpsc::Receiver<CaptureBuffer>, sender: mpsc::Sender<ClientMessage>) {
    let rate = shared.config.input_sample_rate;
    let mut frames = FrameAccumulator::new(shared.config.frame_samples, rate);

    while let Some(buffer) = capture.recv().await {
        let samples = if buffer.sample_rate == rate {
            buffer.samples
        } else {
            pcm::resample_linear(&buffer.samples, buffer.sample_rate, rate)
        };

        for frame in frames.push(&samples) {
            if !shared.accepting() {
                return;
            }
            if sender.send(ClientMessage::realtime_audio(&frame)).await.is_err() {
                debug!("Live link closed, capture loop exiting");
                return;
            }
            shared.frames_sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    info!("Capture stream ended for {}", shared.config.session_id);
}

async fn teardown(opened: Opened, capture_task: Option<JoinHandle<()>>) {
    if let Some(task) = capture_task {
        task.abort();
        let _ = task.await;
    }

    let Opened { input, capture, output, link } = opened;
    drop(capture);

    if let Some(mut input) = input {
        if let Err(e) = input.stop().await {
            warn!("Failed to stop {}: {:#}", input.name(), e);
        }
    }

    if let Some(mut output) = output {
        if let Err(e) = output.close().await {
            warn!("Failed to close {}: {:#}", output.name(), e);
        }
    }

    if let Some(link) = link {
        if let Err(e) = link.close().await {
            warn!("Failed to close live link: {:#}", e);
        }
    }

    debug!("Live session resources released");
}
