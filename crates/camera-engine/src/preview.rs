//! Latest-frame handoff to the UI.

use std::sync::Arc;

use parking_lot::Mutex;

use camera_capture::Frame;

/// Holds the most recent frame for the preview renderer.
///
/// The engine overwrites the slot every tick; the UI reads whenever it
/// repaints. Unread frames are simply replaced.
#[derive(Clone, Default)]
pub struct PreviewSlot {
    latest: Arc<Mutex<Option<Frame>>>,
}

impl PreviewSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame.
    pub fn publish(&self, frame: Frame) {
        *self.latest.lock() = Some(frame);
    }

    /// Clone the stored frame without removing it.
    pub fn latest(&self) -> Option<Frame> {
        self.latest.lock().clone()
    }
}
