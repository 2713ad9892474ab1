//! Error types for the capture module.

use thiserror::Error;

/// Errors that can occur during capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No camera responded at the given index.
    #[error("Camera {index} unavailable: {message}")]
    DeviceUnavailable { index: u32, message: String },

    /// A single frame read failed.
    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),

    /// Frame conversion error.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),

    /// The source was already closed.
    #[error("Capture source closed")]
    Closed,
}

impl CaptureError {
    /// Returns true if the error concerns opening the device.
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, Self::DeviceUnavailable { .. })
    }
}
