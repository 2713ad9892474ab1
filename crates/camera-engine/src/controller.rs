//! The capture/record/pause state machine.
//!
//! The controller knows nothing about cameras, timers or widgets. The tick
//! loop feeds it frames and user commands; it decides which frames reach the
//! video output and owns that output from `start` until `stop`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use camera_capture::Frame;
use camera_encoder::{save_still, VideoWriter, VideoWriterConfig, VideoWriterFactory};
use camera_ipc::{RecordingSummary, SessionConfig, SessionState};

use crate::naming::{self, STILL_PREFIX, VIDEO_PREFIX};
use crate::stats::SessionStats;
use crate::{SessionError, SessionResult};

/// Public description of the open recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRecording {
    /// Output file.
    pub path: PathBuf,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Frame rate stamped on the output.
    pub fps: u32,
}

/// What `on_frame` did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Appended to the output.
    Written,

    /// Discarded because the recording is paused.
    Paused,

    /// Discarded because no recording is open.
    Idle,

    /// The output rejected the frame. `first` is set for the first rejection
    /// of the session.
    Rejected { message: String, first: bool },
}

/// One open video output.
struct RecordingSession {
    writer: Box<dyn VideoWriter>,
    info: ActiveRecording,
    paused: bool,
    stats: SessionStats,
}

/// Enforces the one-recording-at-a-time state machine.
pub struct SessionController {
    config: SessionConfig,
    factory: Box<dyn VideoWriterFactory>,
    session: Option<RecordingSession>,
}

impl SessionController {
    /// Create an idle controller.
    pub fn new(config: SessionConfig, factory: Box<dyn VideoWriterFactory>) -> Self {
        Self {
            config,
            factory,
            session: None,
        }
    }

    /// Current state, derived from the open session.
    pub fn state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Idle,
            Some(session) if session.paused => SessionState::Paused,
            Some(_) => SessionState::Recording,
        }
    }

    /// The open recording, if any.
    pub fn active(&self) -> Option<&ActiveRecording> {
        self.session.as_ref().map(|s| &s.info)
    }

    /// Frames written to the open recording.
    pub fn frames_written(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.writer.frames_written())
            .unwrap_or(0)
    }

    /// Open a recording sized to `frame`.
    ///
    /// Rejected while a recording is open. On failure the state stays Idle.
    #[instrument(name = "start_recording", skip(self, frame))]
    pub fn start(&mut self, frame: Option<&Frame>) -> SessionResult<ActiveRecording> {
        if self.session.is_some() {
            debug!("Recording already open, rejecting start");
            return Err(SessionError::AlreadyRecording);
        }
        let frame = frame.ok_or(SessionError::NoFrameAvailable)?;

        naming::ensure_output_dir(&self.config.output_dir).map_err(|e| {
            SessionError::EncoderInitFailed(format!(
                "cannot create {}: {}",
                self.config.output_dir.display(),
                e
            ))
        })?;
        let path = naming::unique_path(
            &self.config.output_dir,
            VIDEO_PREFIX,
            &naming::now(),
            &self.config.video_extension,
        );

        let writer_config = VideoWriterConfig {
            path: path.clone(),
            width: frame.width,
            height: frame.height,
            fps: self.config.video_fps,
            codec: self.config.video_codec.clone(),
            tag: self.config.video_tag.clone(),
        };
        let writer = self
            .factory
            .create(&writer_config)
            .map_err(|e| SessionError::EncoderInitFailed(e.to_string()))?;

        let info = ActiveRecording {
            path,
            width: frame.width,
            height: frame.height,
            fps: self.config.video_fps,
        };
        info!(
            path = %info.path.display(),
            width = info.width,
            height = info.height,
            writer = writer.name(),
            "Recording started"
        );

        self.session = Some(RecordingSession {
            writer,
            info: info.clone(),
            paused: false,
            stats: SessionStats::new(Instant::now()),
        });
        Ok(info)
    }

    /// Pause the open recording. Returns false if nothing changed.
    pub fn pause(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if !session.paused => {
                session.paused = true;
                session.stats.pause(Instant::now());
                info!("Recording paused");
                true
            }
            _ => false,
        }
    }

    /// Resume a paused recording. Returns false if nothing changed.
    pub fn resume(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if session.paused => {
                session.paused = false;
                session.stats.resume(Instant::now());
                info!("Recording resumed");
                true
            }
            _ => false,
        }
    }

    /// Finalize and release the open recording.
    ///
    /// Returns `Ok(None)` when idle. When a recording is open it is always
    /// released and the state is always Idle afterwards, even if finalizing
    /// reports an error.
    #[instrument(name = "stop_recording", skip(self))]
    pub fn stop(&mut self) -> SessionResult<Option<RecordingSummary>> {
        let Some(mut session) = self.session.take() else {
            debug!("No recording open, ignoring stop");
            return Ok(None);
        };

        let now = Instant::now();
        session.stats.resume(now);
        let frames_written = session.writer.frames_written();
        let summary = session.stats.summary(
            now,
            session.info.path.clone(),
            (session.info.width, session.info.height),
            session.info.fps,
            frames_written,
        );

        match session.writer.finish() {
            Ok(_) => {
                info!(
                    path = %summary.path.display(),
                    frames = summary.frames_written,
                    skipped = summary.frames_skipped,
                    paused_ms = summary.paused_ms,
                    "Recording saved"
                );
                Ok(Some(summary))
            }
            Err(e) => {
                warn!(path = %summary.path.display(), "Recording finalized with error: {}", e);
                Err(SessionError::FinalizeFailed(e.to_string()))
            }
        }
    }

    /// Offer the current tick's frame to the recording.
    pub fn on_frame(&mut self, frame: &Frame) -> FrameOutcome {
        let Some(session) = self.session.as_mut() else {
            return FrameOutcome::Idle;
        };
        if session.paused {
            session.stats.record_skipped();
            return FrameOutcome::Paused;
        }

        match session.writer.write_frame(&frame.data) {
            Ok(()) => FrameOutcome::Written,
            Err(e) => {
                let total = session.stats.record_write_error();
                FrameOutcome::Rejected {
                    message: e.to_string(),
                    first: total == 1,
                }
            }
        }
    }

    /// Note a tick whose frame read failed.
    pub fn record_capture_failure(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.stats.record_capture_failure();
        }
    }

    /// Save `frame` as a still image. Independent of the recording state.
    #[instrument(name = "capture_still", skip(self, frame))]
    pub fn capture(&self, frame: Option<&Frame>) -> SessionResult<PathBuf> {
        let frame = frame.ok_or(SessionError::NoFrameAvailable)?;

        naming::ensure_output_dir(&self.config.output_dir).map_err(|e| {
            SessionError::EncodeFailed(format!(
                "cannot create {}: {}",
                self.config.output_dir.display(),
                e
            ))
        })?;
        let path = naming::unique_path(
            &self.config.output_dir,
            STILL_PREFIX,
            &naming::now(),
            self.config.still_format.extension(),
        );

        save_still(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            self.config.still_format,
        )
        .map_err(|e| SessionError::EncodeFailed(e.to_string()))?;

        info!(path = %path.display(), "Image saved");
        Ok(path)
    }

    /// Log counters for the open recording.
    pub fn log_stats(&self) {
        if let Some(session) = &self.session {
            let now = Instant::now();
            info!(
                "Recording stats: written={}, write_errors={}, paused={:.1}s, elapsed={:.1}s",
                session.writer.frames_written(),
                session.stats.write_errors(),
                session.stats.paused_duration(now).as_secs_f32(),
                session.stats.elapsed(now).as_secs_f32()
            );
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("Controller dropped with an open recording, finalizing");
            if let Err(e) = self.stop() {
                warn!("Failed to finalize recording on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{frame_with, MemoryWriterFactory, WriterLog};
    use camera_capture::{FrameSource, PatternSource};
    use camera_ipc::StillFormat;

    fn new_controller(dir: &std::path::Path) -> (SessionController, WriterLog) {
        let factory = MemoryWriterFactory::new();
        let log = factory.log();
        let config = SessionConfig {
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };
        (SessionController::new(config, Box::new(factory)), log)
    }

    #[test]
    fn test_pause_resume_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());
        let (f1, f2, f3) = (frame_with(1), frame_with(2), frame_with(3));

        controller.start(Some(&f1)).unwrap();
        assert_eq!(controller.on_frame(&f1), FrameOutcome::Written);
        assert!(controller.pause());
        assert_eq!(controller.on_frame(&f2), FrameOutcome::Paused);
        assert!(controller.resume());
        assert_eq!(controller.on_frame(&f3), FrameOutcome::Written);
        let summary = controller.stop().unwrap().unwrap();

        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(log.frames(), vec![f1.data.to_vec(), f3.data.to_vec()]);
        assert_eq!(log.finished(), 1);
        assert_eq!(log.open_now(), 0);
        assert_eq!(summary.frames_written, 2);
        assert_eq!(summary.frames_skipped, 1);
        assert_eq!(summary.pause_count, 1);
    }

    #[test]
    fn test_n_frames_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());
        let mut source = PatternSource::new(4, 4);
        let frames: Vec<Frame> = (0..25).map(|_| source.next_frame().unwrap()).collect();

        controller.start(frames.first()).unwrap();
        for frame in &frames {
            controller.on_frame(frame);
        }
        assert_eq!(controller.frames_written(), 25);
        controller.stop().unwrap();

        let expected: Vec<Vec<u8>> = frames.iter().map(|f| f.data.to_vec()).collect();
        assert_eq!(log.frames(), expected);
    }

    #[test]
    fn test_zero_frame_recording_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());

        controller.start(Some(&frame_with(0))).unwrap();
        let summary = controller.stop().unwrap().unwrap();

        assert_eq!(summary.frames_written, 0);
        assert_eq!(log.opened(), 1);
        assert_eq!(log.finished(), 1);
    }

    #[test]
    fn test_stop_pause_resume_when_idle_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());

        assert!(controller.stop().unwrap().is_none());
        assert!(!controller.pause());
        assert!(!controller.resume());
        assert_eq!(controller.on_frame(&frame_with(1)), FrameOutcome::Idle);
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(log.opened(), 0);
        assert_eq!(log.finished(), 0);
    }

    #[test]
    fn test_start_while_open_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());
        let frame = frame_with(1);

        controller.start(Some(&frame)).unwrap();
        assert!(matches!(
            controller.start(Some(&frame)),
            Err(SessionError::AlreadyRecording)
        ));
        controller.pause();
        assert!(matches!(
            controller.start(Some(&frame)),
            Err(SessionError::AlreadyRecording)
        ));

        assert_eq!(controller.state(), SessionState::Paused);
        assert_eq!(log.opened(), 1);
    }

    #[test]
    fn test_start_without_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());

        assert!(matches!(
            controller.start(None),
            Err(SessionError::NoFrameAvailable)
        ));
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(log.opened(), 0);
    }

    #[test]
    fn test_encoder_init_failure_stays_idle() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::failing();
        let config = SessionConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut controller = SessionController::new(config, Box::new(factory));

        let result = controller.start(Some(&frame_with(1)));

        assert!(matches!(result, Err(SessionError::EncoderInitFailed(_))));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[cfg(unix)]
    #[test]
    fn test_rejected_codec_stays_idle_and_leaves_no_file() {
        let tools = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let binary = crate::testing::stub_encoder(
            tools.path(),
            "echo \"Unknown encoder 'mpeg4'\" >&2\nexit 1",
        );
        let config = SessionConfig {
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        let factory = camera_encoder::FfmpegWriterFactory::new(binary);
        let mut controller = SessionController::new(config, Box::new(factory));

        let result = controller.start(Some(&frame_with(1)));

        match result {
            Err(SessionError::EncoderInitFailed(message)) => {
                assert!(message.contains("Unknown encoder"), "{message}");
            }
            other => panic!("expected EncoderInitFailed, got {other:?}"),
        }
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.active().is_none());
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_finalize_error_still_releases() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryWriterFactory::failing_finish();
        let log = factory.log();
        let config = SessionConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut controller = SessionController::new(config, Box::new(factory));

        controller.start(Some(&frame_with(1))).unwrap();
        let result = controller.stop();

        assert!(matches!(result, Err(SessionError::FinalizeFailed(_))));
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(log.finished(), 1);
        assert_eq!(log.open_now(), 0);
    }

    #[test]
    fn test_rejected_frame_reports_first_failure_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());
        let mut small = PatternSource::new(2, 2);
        let mut large = PatternSource::new(3, 3);

        controller.start(Some(&small.next_frame().unwrap())).unwrap();
        let odd = large.next_frame().unwrap();

        assert!(matches!(
            controller.on_frame(&odd),
            FrameOutcome::Rejected { first: true, .. }
        ));
        assert!(matches!(
            controller.on_frame(&odd),
            FrameOutcome::Rejected { first: false, .. }
        ));
        assert_eq!(controller.on_frame(&small.next_frame().unwrap()), FrameOutcome::Written);

        let summary = controller.stop().unwrap().unwrap();
        assert_eq!(summary.write_errors, 2);
        assert_eq!(log.frames().len(), 1);
    }

    #[test]
    fn test_never_more_than_one_open_session() {
        #[derive(Clone, Copy, Debug)]
        enum Action {
            Start,
            Pause,
            Resume,
            Stop,
            Frame,
        }
        const ACTIONS: [Action; 5] = [
            Action::Start,
            Action::Pause,
            Action::Resume,
            Action::Stop,
            Action::Frame,
        ];
        const DEPTH: u32 = 5;

        let dir = tempfile::tempdir().unwrap();
        let frame = frame_with(9);

        for seed in 0..ACTIONS.len().pow(DEPTH) {
            let (mut controller, log) = new_controller(dir.path());
            let mut n = seed;
            let mut written_while_paused = false;

            for _ in 0..DEPTH {
                let action = ACTIONS[n % ACTIONS.len()];
                n /= ACTIONS.len();

                let before = controller.frames_written();
                let was_paused = controller.state().is_paused();
                match action {
                    Action::Start => {
                        let _ = controller.start(Some(&frame));
                    }
                    Action::Pause => {
                        controller.pause();
                    }
                    Action::Resume => {
                        controller.resume();
                    }
                    Action::Stop => {
                        controller.stop().unwrap();
                        assert_eq!(controller.state(), SessionState::Idle);
                    }
                    Action::Frame => {
                        controller.on_frame(&frame);
                    }
                }
                if was_paused && controller.frames_written() > before {
                    written_while_paused = true;
                }
                assert!(log.max_open() <= 1, "nested session after {seed}");
                assert_eq!(log.open_now() == 1, controller.state().has_session());
            }

            assert!(!written_while_paused);
            controller.stop().unwrap();
            assert_eq!(log.opened(), log.finished());
        }
    }

    #[test]
    fn test_capture_without_frame_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("captures");
        let (controller, _log) = new_controller(&out);

        assert!(matches!(
            controller.capture(None),
            Err(SessionError::NoFrameAvailable)
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_capture_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("captures");
        let (controller, _log) = new_controller(&out);
        let mut source = PatternSource::new(16, 9);
        source.next_frame().unwrap();
        let frame = source.next_frame().unwrap();

        let path = controller.capture(Some(&frame)).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("capture_"));
        assert!(name.ends_with(".png"));
        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 9));
        assert_eq!(decoded.into_raw(), frame.data.to_vec());
    }

    #[test]
    fn test_capture_while_recording_leaves_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, _log) = new_controller(dir.path());
        let frame = frame_with(4);

        controller.start(Some(&frame)).unwrap();
        controller.capture(Some(&frame)).unwrap();

        assert_eq!(controller.state(), SessionState::Recording);
    }

    #[test]
    fn test_bmp_still_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            output_dir: dir.path().to_path_buf(),
            still_format: StillFormat::Bmp,
            ..Default::default()
        };
        let controller = SessionController::new(config, Box::new(MemoryWriterFactory::new()));

        let path = controller.capture(Some(&frame_with(1))).unwrap();

        assert_eq!(path.extension().unwrap(), "bmp");
    }

    #[test]
    fn test_drop_finalizes_open_recording() {
        let dir = tempfile::tempdir().unwrap();
        let (mut controller, log) = new_controller(dir.path());

        controller.start(Some(&frame_with(1))).unwrap();
        controller.pause();
        drop(controller);

        assert_eq!(log.finished(), 1);
        assert_eq!(log.open_now(), 0);
    }
}
