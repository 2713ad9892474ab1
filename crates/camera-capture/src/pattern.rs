//! Generated frames for running without camera hardware.

use std::time::Instant;

use tracing::debug;

use crate::{CaptureError, CaptureResult, CaptureTimestamp, Frame, FrameSource, RGB_CHANNELS};

/// A source that draws a gradient which shifts by one step per frame.
///
/// Pixel `(x, y)` of frame `n` is `[x + n, y + n, n]`, each wrapping at 256.
pub struct PatternSource {
    index: u32,
    width: u32,
    height: u32,
    start_time: Instant,
    sequence: u64,
    open: bool,
    connected: bool,
}

impl PatternSource {
    /// Create a pattern source with the given frame size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            index: 0,
            width,
            height,
            start_time: Instant::now(),
            sequence: 0,
            open: true,
            connected: true,
        }
    }

    /// Pretend the device was unplugged: subsequent reads fail.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Undo [`PatternSource::disconnect`].
    pub fn reconnect(&mut self) {
        self.connected = true;
    }

    /// The RGB value of pixel `(x, y)` in frame `sequence`.
    pub fn expected_pixel(sequence: u64, x: u32, y: u32) -> [u8; 3] {
        let n = sequence as u32;
        [
            x.wrapping_add(n) as u8,
            y.wrapping_add(n) as u8,
            n as u8,
        ]
    }

    fn render(&self, sequence: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(Frame::rgb_buffer_size(self.width, self.height));
        for y in 0..self.height {
            for x in 0..self.width {
                data.extend_from_slice(&Self::expected_pixel(sequence, x, y));
            }
        }
        debug_assert_eq!(data.len() % RGB_CHANNELS as usize, 0);
        data
    }
}

impl FrameSource for PatternSource {
    fn next_frame(&mut self) -> CaptureResult<Frame> {
        if !self.open {
            return Err(CaptureError::Closed);
        }
        if !self.connected {
            return Err(CaptureError::CaptureFailed("pattern source disconnected".into()));
        }

        let sequence = self.sequence;
        self.sequence += 1;
        Frame::new(
            self.render(sequence),
            self.width,
            self.height,
            CaptureTimestamp::now(self.start_time),
            sequence,
        )
    }

    fn close(&mut self) {
        if self.open {
            debug!(frames = self.sequence, "Pattern source closed");
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn device_index(&self) -> u32 {
        self.index
    }
}
