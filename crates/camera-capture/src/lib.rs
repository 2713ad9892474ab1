//! Pull-based webcam frame sources.
//!
//! A [`FrameSource`] hands out one RGB [`Frame`] per call. The caller owns
//! the polling cadence; sources never spawn threads of their own.

mod error;
mod frame;
mod pattern;
mod webcam;

pub use error::CaptureError;
pub use frame::{CaptureTimestamp, Frame, RGB_CHANNELS};
pub use pattern::PatternSource;
pub use webcam::WebcamSource;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// A camera-like producer of frames.
pub trait FrameSource {
    /// Read the next frame.
    fn next_frame(&mut self) -> CaptureResult<Frame>;

    /// Release the device. Safe to call more than once.
    fn close(&mut self);

    /// Check if the device handle is still held.
    fn is_open(&self) -> bool;

    /// Get the frame dimensions.
    fn dimensions(&self) -> (u32, u32);

    /// Get the device index this source was opened with.
    fn device_index(&self) -> u32;
}

/// Open a webcam as a boxed source.
pub fn open_webcam(index: u32, width: u32, height: u32) -> CaptureResult<Box<dyn FrameSource>> {
    let source = WebcamSource::open(index, width, height)?;
    Ok(Box::new(source))
}
