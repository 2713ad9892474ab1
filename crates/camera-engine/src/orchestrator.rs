//! Tick loop driving the camera and the session controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use camera_capture::{CaptureResult, Frame, FrameSource};
use camera_encoder::VideoWriterFactory;
use camera_ipc::{ErrorKind, SessionCommand, SessionConfig, SessionEvent, SessionState};

use crate::controller::{FrameOutcome, SessionController};
use crate::preview::PreviewSlot;
use crate::SessionError;

/// How often recording stats are logged.
const STATS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Opens the camera described by the config.
pub type SourceOpener =
    Box<dyn FnMut(&SessionConfig) -> CaptureResult<Box<dyn FrameSource>> + Send>;

/// The camera engine: owns the frame source and the session controller.
///
/// Everything runs on the thread that calls [`Engine::run`]. Commands are
/// handled between ticks, so the recording output is never shared.
pub struct Engine {
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
    config: SessionConfig,
    opener: SourceOpener,
    source: Option<Box<dyn FrameSource>>,
    controller: SessionController,
    state: Arc<RwLock<SessionState>>,
    preview: PreviewSlot,
    last_frame: Option<Frame>,
    consecutive_failures: u32,
    reopen_attempt: u32,
    next_reopen: Option<Instant>,
    last_stats_log: Instant,
    shut_down: bool,
}

impl Engine {
    /// Create a new engine. The camera is opened when [`Engine::run`] starts.
    pub fn new(
        config: SessionConfig,
        opener: SourceOpener,
        factory: Box<dyn VideoWriterFactory>,
        command_rx: Receiver<SessionCommand>,
        event_tx: Sender<SessionEvent>,
    ) -> Self {
        Self {
            command_rx,
            event_tx,
            controller: SessionController::new(config.clone(), factory),
            config,
            opener,
            source: None,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            preview: PreviewSlot::new(),
            last_frame: None,
            consecutive_failures: 0,
            reopen_attempt: 0,
            next_reopen: None,
            last_stats_log: Instant::now(),
            shut_down: false,
        }
    }

    /// Publish preview frames into a slot the UI already holds.
    pub fn with_preview(mut self, preview: PreviewSlot) -> Self {
        self.preview = preview;
        self
    }

    /// Mirror the session state into a handle the UI already holds.
    pub fn with_state_handle(mut self, state: Arc<RwLock<SessionState>>) -> Self {
        *state.write() = self.controller.state();
        self.state = state;
        self
    }

    /// Slot the UI reads preview frames from.
    pub fn preview(&self) -> PreviewSlot {
        self.preview.clone()
    }

    /// Shared view of the session state.
    pub fn state_handle(&self) -> Arc<RwLock<SessionState>> {
        Arc::clone(&self.state)
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Check if the camera is currently open.
    pub fn has_device(&self) -> bool {
        self.source.is_some()
    }

    /// Run the engine (blocking) until shutdown or the command channel closes.
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("Engine starting");
        self.open_device();
        self.send_event(SessionEvent::Ready);

        let command_rx = self.command_rx.clone();
        let ticker = crossbeam_channel::tick(self.config.tick_interval());

        loop {
            select! {
                recv(command_rx) -> msg => match msg {
                    Ok(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => {
                        info!("Command channel disconnected, shutting down");
                        break;
                    }
                },
                recv(ticker) -> _ => self.tick(),
            }
        }

        self.shutdown();
        info!("Engine stopped");
    }

    /// Handle a command. Returns false if the engine should stop.
    pub fn handle_command(&mut self, command: SessionCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            SessionCommand::Capture => self.capture(),
            SessionCommand::StartRecording => self.start_recording(),
            SessionCommand::StopRecording => self.stop_recording(),
            SessionCommand::ToggleRecording => {
                if self.controller.state().has_session() {
                    self.stop_recording();
                } else {
                    self.start_recording();
                }
            }
            SessionCommand::Pause => self.pause(),
            SessionCommand::Resume => self.resume(),
            SessionCommand::TogglePause => match self.controller.state() {
                SessionState::Recording => self.pause(),
                SessionState::Paused => self.resume(),
                SessionState::Idle => debug!("Not recording, ignoring pause toggle"),
            },
            SessionCommand::GetState => {
                let current = self.controller.state();
                self.send_event(SessionEvent::StateChanged {
                    previous: current,
                    current,
                });
            }
            SessionCommand::Shutdown => return false,
        }

        true
    }

    /// Open the configured camera, reporting failure to the UI.
    pub fn open_device(&mut self) {
        if self.source.is_some() {
            return;
        }

        match (self.opener)(&self.config) {
            Ok(source) => self.device_opened(source),
            Err(e) => {
                let err = SessionError::from(e);
                error!("Camera open failed: {}", err);
                self.report_error(&err);
                self.schedule_reopen(Instant::now());
            }
        }
    }

    /// One pull/preview/write cycle.
    pub fn tick(&mut self) {
        if self.source.is_none() {
            self.try_reopen(Instant::now());
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };

        match source.next_frame() {
            Ok(frame) => {
                if self.consecutive_failures > 0 {
                    debug!(failures = self.consecutive_failures, "Camera delivering frames again");
                }
                self.consecutive_failures = 0;
                self.preview.publish(frame.clone());

                let outcome = self.controller.on_frame(&frame);
                if let FrameOutcome::Rejected { message, first } = outcome {
                    warn!("Video output rejected frame: {}", message);
                    if first {
                        self.send_event(SessionEvent::error(
                            ErrorKind::EncodeFailed,
                            format!("Failed to write video frame: {message}"),
                        ));
                    }
                }
                self.last_frame = Some(frame);
            }
            Err(e) => self.capture_failed(SessionError::from(e)),
        }

        if self.controller.state().has_session()
            && self.last_stats_log.elapsed() >= STATS_LOG_INTERVAL
        {
            self.controller.log_stats();
            self.last_stats_log = Instant::now();
        }
    }

    /// Finalize any recording and release the camera.
    #[instrument(name = "engine_shutdown", skip(self))]
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        info!("Shutting down");
        self.stop_recording();
        if let Some(mut source) = self.source.take() {
            source.close();
        }
        self.send_event(SessionEvent::Shutdown);
    }

    fn capture(&mut self) {
        match self.controller.capture(self.last_frame.as_ref()) {
            Ok(path) => self.send_event(SessionEvent::StillSaved { path }),
            Err(e) => {
                warn!("Capture failed: {}", e);
                self.report_error(&e);
            }
        }
    }

    fn start_recording(&mut self) {
        let previous = self.controller.state();
        match self.controller.start(self.last_frame.as_ref()) {
            Ok(recording) => {
                self.last_stats_log = Instant::now();
                self.send_event(SessionEvent::RecordingStarted {
                    path: recording.path,
                    width: recording.width,
                    height: recording.height,
                    fps: recording.fps,
                });
            }
            Err(e) => {
                warn!("Start recording failed: {}", e);
                self.report_error(&e);
            }
        }
        self.publish_state(previous);
    }

    fn stop_recording(&mut self) {
        let previous = self.controller.state();
        match self.controller.stop() {
            Ok(Some(summary)) => self.send_event(SessionEvent::RecordingSaved { summary }),
            Ok(None) => {}
            Err(e) => self.report_error(&e),
        }
        self.publish_state(previous);
    }

    fn pause(&mut self) {
        let previous = self.controller.state();
        self.controller.pause();
        self.publish_state(previous);
    }

    fn resume(&mut self) {
        let previous = self.controller.state();
        self.controller.resume();
        self.publish_state(previous);
    }

    fn device_opened(&mut self, source: Box<dyn FrameSource>) {
        let (width, height) = source.dimensions();
        let index = source.device_index();
        info!(index, width, height, "Camera ready");

        self.source = Some(source);
        self.consecutive_failures = 0;
        self.reopen_attempt = 0;
        self.next_reopen = None;
        self.send_event(SessionEvent::DeviceOpened { index, width, height });
    }

    fn capture_failed(&mut self, err: SessionError) {
        self.consecutive_failures += 1;
        self.controller.record_capture_failure();

        if self.consecutive_failures == 1 {
            warn!("Frame read failed: {}", err);
            self.report_error(&err);
        }

        if self.consecutive_failures >= self.config.lost_after_failures {
            let message = format!(
                "no frames for {} consecutive ticks: {}",
                self.consecutive_failures, err
            );
            error!("Camera lost: {}", message);
            if let Some(mut source) = self.source.take() {
                source.close();
            }
            self.consecutive_failures = 0;
            self.send_event(SessionEvent::DeviceLost { message });
            self.schedule_reopen(Instant::now());
        }
    }

    fn schedule_reopen(&mut self, now: Instant) {
        self.reopen_attempt += 1;
        let delay = self.config.reopen.delay_for_attempt(self.reopen_attempt);
        debug!(attempt = self.reopen_attempt, ?delay, "Camera reopen scheduled");
        self.next_reopen = Some(now + delay);
    }

    fn try_reopen(&mut self, now: Instant) {
        match self.next_reopen {
            Some(at) if at <= now => {}
            _ => return,
        }

        match (self.opener)(&self.config) {
            Ok(source) => self.device_opened(source),
            Err(e) => {
                debug!(attempt = self.reopen_attempt, "Camera reopen failed: {}", e);
                self.schedule_reopen(now);
            }
        }
    }

    fn publish_state(&self, previous: SessionState) {
        let current = self.controller.state();
        *self.state.write() = current;

        if previous != current {
            debug!(
                previous = %previous.name(),
                current = %current.name(),
                "State transition"
            );
            self.send_event(SessionEvent::StateChanged { previous, current });
        }
    }

    fn report_error(&self, err: &SessionError) {
        self.send_event(SessionEvent::error(err.kind(), err.to_string()));
    }

    fn send_event(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
