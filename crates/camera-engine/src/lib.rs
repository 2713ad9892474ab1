//! Capture/record session engine for the camera app.
//!
//! [`SessionController`] is the Idle/Recording/Paused state machine.
//! [`Engine`] drives it from a fixed-interval tick, pulling frames from the
//! camera and translating UI commands into controller calls.

mod controller;
mod error;
mod naming;
mod orchestrator;
mod preview;
mod stats;
#[cfg(test)]
mod testing;

pub use controller::{ActiveRecording, FrameOutcome, SessionController};
pub use error::SessionError;
pub use orchestrator::{Engine, SourceOpener};
pub use preview::PreviewSlot;

use crossbeam_channel::{Receiver, Sender};

use camera_encoder::FfmpegWriterFactory;
use camera_ipc::{SessionCommand, SessionConfig, SessionEvent};

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Opener for the physical camera named in the config.
pub fn webcam_opener() -> SourceOpener {
    Box::new(|config: &SessionConfig| {
        camera_capture::open_webcam(
            config.device_index,
            config.requested_width,
            config.requested_height,
        )
    })
}

/// Create an engine for the default camera, recording through ffmpeg.
pub fn create_engine(
    config: SessionConfig,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
) -> Engine {
    Engine::new(
        config,
        webcam_opener(),
        Box::new(FfmpegWriterFactory::default()),
        command_rx,
        event_tx,
    )
}
