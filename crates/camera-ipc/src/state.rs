//! Session state machine types.

use serde::{Deserialize, Serialize};

/// The recording state of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No recording is open.
    #[default]
    Idle,

    /// A recording is open and frames are being written.
    Recording,

    /// A recording is open but frames are discarded.
    Paused,
}

impl SessionState {
    /// Returns true if no recording is open.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if frames are being written.
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Returns true if the recording is paused.
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Returns true if a recording output is open (recording or paused).
    pub fn has_session(&self) -> bool {
        !self.is_idle()
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Recording => "Recording",
            Self::Paused => "Paused",
        }
    }
}
