//! Error types for session operations.

use thiserror::Error;

use camera_capture::CaptureError;
use camera_ipc::ErrorKind;

/// Errors reported by session actions. None of them change the session state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The camera cannot be opened or stopped responding.
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// A single frame read failed.
    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    /// No frame has been produced yet.
    #[error("No frame captured yet")]
    NoFrameAvailable,

    /// Still image serialization failed.
    #[error("Failed to save image: {0}")]
    EncodeFailed(String),

    /// The video output could not be created.
    #[error("Failed to start recording: {0}")]
    EncoderInitFailed(String),

    /// Start was requested while a recording is open.
    #[error("A recording is already in progress")]
    AlreadyRecording,

    /// The output was released but reported an error while finalizing.
    #[error("Failed to finalize video: {0}")]
    FinalizeFailed(String),
}

impl SessionError {
    /// The category reported to the UI.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            Self::CaptureFailed(_) => ErrorKind::CaptureFailed,
            Self::NoFrameAvailable => ErrorKind::NoFrameAvailable,
            Self::EncodeFailed(_) => ErrorKind::EncodeFailed,
            Self::EncoderInitFailed(_) => ErrorKind::EncoderInitFailed,
            Self::AlreadyRecording => ErrorKind::AlreadyRecording,
            Self::FinalizeFailed(_) => ErrorKind::FinalizeFailed,
        }
    }
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        if err.is_device_unavailable() {
            Self::DeviceUnavailable(err.to_string())
        } else {
            Self::CaptureFailed(err.to_string())
        }
    }
}
