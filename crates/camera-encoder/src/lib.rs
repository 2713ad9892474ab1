//! Still image (PNG) and video (ffmpeg) output.
//!
//! Stills are encoded in-process with the `image` crate. Video is piped as
//! raw RGB frames into an `ffmpeg` child process behind the [`VideoWriter`]
//! trait, so the session logic never names a concrete codec.

mod error;
mod ffmpeg;
mod still;

pub use error::EncoderError;
pub use ffmpeg::{FfmpegWriter, FfmpegWriterFactory};
pub use still::{encode_still, save_still};

use std::path::PathBuf;

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Video output configuration.
#[derive(Debug, Clone)]
pub struct VideoWriterConfig {
    /// Output file.
    pub path: PathBuf,

    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Frames per second stamped on the output.
    pub fps: u32,

    /// ffmpeg codec name.
    pub codec: String,

    /// Optional FourCC tag.
    pub tag: Option<String>,
}

impl VideoWriterConfig {
    /// Size of one packed RGB frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// An open video output. Frames are appended in call order.
pub trait VideoWriter: Send {
    /// Append one packed RGB frame.
    fn write_frame(&mut self, rgb: &[u8]) -> EncoderResult<()>;

    /// Number of frames accepted so far.
    fn frames_written(&self) -> u64;

    /// Flush and close the output, returning the number of frames written.
    fn finish(self: Box<Self>) -> EncoderResult<u64>;

    /// Get writer name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Creates video outputs.
pub trait VideoWriterFactory: Send {
    /// Open a new output.
    fn create(&self, config: &VideoWriterConfig) -> EncoderResult<Box<dyn VideoWriter>>;
}
