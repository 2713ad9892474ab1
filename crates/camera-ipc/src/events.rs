//! Events sent from the engine to the UI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::SessionState;
use crate::types::{ErrorKind, RecordingSummary};

/// Events that the engine can send to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Engine is ready to accept commands.
    Ready,

    /// The camera was opened.
    DeviceOpened {
        /// Device index.
        index: u32,

        /// Negotiated frame width.
        width: u32,

        /// Negotiated frame height.
        height: u32,
    },

    /// The camera stopped delivering frames.
    DeviceLost { message: String },

    /// Session state has changed.
    StateChanged {
        /// Previous state.
        previous: SessionState,

        /// Current state.
        current: SessionState,
    },

    /// A still image was written.
    StillSaved { path: PathBuf },

    /// A recording was opened.
    RecordingStarted {
        path: PathBuf,
        width: u32,
        height: u32,
        fps: u32,
    },

    /// A recording was finalized.
    RecordingSaved { summary: RecordingSummary },

    /// An action failed. The session state is unchanged.
    Error { kind: ErrorKind, message: String },

    /// Engine has shut down.
    Shutdown,
}

impl SessionEvent {
    /// Build an error event.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }
}
