//! Commands sent from the UI to the engine.

use serde::{Deserialize, Serialize};

/// Commands that the UI can send to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    /// Save the latest frame as a still image.
    Capture,

    /// Start a new recording.
    StartRecording,

    /// Stop and finalize the current recording.
    StopRecording,

    /// Start when idle, stop otherwise (the record button).
    ToggleRecording,

    /// Pause the current recording.
    Pause,

    /// Resume a paused recording.
    Resume,

    /// Pause when recording, resume when paused (the pause button).
    TogglePause,

    /// Request the current session state.
    GetState,

    /// Finalize everything and stop the engine.
    Shutdown,
}
