//! Captured frame types.

use bytes::Bytes;
use std::time::Instant;

use crate::{CaptureError, CaptureResult};

/// Channels per pixel. Frames are always packed RGB, 8 bits per channel.
pub const RGB_CHANNELS: u32 = 3;

/// Timestamp for a captured frame.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTimestamp {
    /// Monotonic timestamp when the frame was captured.
    pub capture_time: Instant,

    /// Milliseconds since the source was opened.
    pub elapsed_ms: u64,
}

impl CaptureTimestamp {
    /// Create a new capture timestamp.
    pub fn now(start_time: Instant) -> Self {
        let capture_time = Instant::now();
        let elapsed_ms = capture_time.duration_since(start_time).as_millis() as u64;

        Self {
            capture_time,
            elapsed_ms,
        }
    }
}

/// A captured video frame.
///
/// Cloning is cheap: the pixel buffer is reference counted.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Packed RGB pixel data, row-major, no padding.
    pub data: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Capture timestamp.
    pub timestamp: CaptureTimestamp,

    /// Monotonically increasing sequence number.
    pub sequence: u64,
}

impl Frame {
    /// Create a new frame, checking the buffer against the dimensions.
    pub fn new(
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        timestamp: CaptureTimestamp,
        sequence: u64,
    ) -> CaptureResult<Self> {
        let data = data.into();
        let expected = Self::rgb_buffer_size(width, height);
        if width == 0 || height == 0 || data.len() != expected {
            return Err(CaptureError::FrameConversion(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            timestamp,
            sequence,
        })
    }

    /// Calculate expected RGB buffer size for given dimensions.
    pub fn rgb_buffer_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * RGB_CHANNELS as usize
    }

    /// Number of channels per pixel.
    pub fn channels(&self) -> u32 {
        RGB_CHANNELS
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * RGB_CHANNELS as usize
    }

    /// Get the frame dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Read a single pixel, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride() + x as usize * RGB_CHANNELS as usize;
        let px = self.data.get(offset..offset + 3)?;
        Some([px[0], px[1], px[2]])
    }
}
