//! Common types used across IPC messages.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base delay before the first camera reopen attempt.
pub const BASE_REOPEN_DELAY_MS: u64 = 1000;

/// Configuration for a camera session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Camera device index.
    pub device_index: u32,

    /// Requested frame width (the device may negotiate another size).
    pub requested_width: u32,

    /// Requested frame height.
    pub requested_height: u32,

    /// Interval between ticks in milliseconds.
    pub tick_interval_ms: u64,

    /// Frame rate stamped on recorded video.
    pub video_fps: u32,

    /// Directory stills and videos are written to.
    pub output_dir: PathBuf,

    /// Still image format.
    pub still_format: StillFormat,

    /// ffmpeg video codec name.
    pub video_codec: String,

    /// FourCC tag written into the container, if any.
    pub video_tag: Option<String>,

    /// Video file extension.
    pub video_extension: String,

    /// Consecutive failed reads before the device is considered lost.
    pub lost_after_failures: u32,

    /// Backoff for reopening an unavailable camera.
    pub reopen: ReopenPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            requested_width: 640,
            requested_height: 480,
            tick_interval_ms: 20,
            video_fps: 20,
            output_dir: PathBuf::from("captures"),
            still_format: StillFormat::Png,
            video_codec: "mpeg4".to_string(),
            video_tag: Some("XVID".to_string()),
            video_extension: "avi".to_string(),
            lost_after_failures: 50,
            reopen: ReopenPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Lossless still image formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StillFormat {
    #[default]
    Png,
    Bmp,
}

impl StillFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }
}

/// Reopen policy for an unavailable camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReopenPolicy {
    /// Base delay between attempts (exponential backoff applied).
    pub base_delay: Duration,

    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl Default for ReopenPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(BASE_REOPEN_DELAY_MS),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReopenPolicy {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base_delay.saturating_mul(multiplier);
        delay.min(self.max_delay)
    }
}

/// Error categories reported to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The camera cannot be opened or stopped responding.
    DeviceUnavailable,

    /// A single frame read failed.
    CaptureFailed,

    /// A still capture was requested before any frame exists.
    NoFrameAvailable,

    /// Still image serialization failed.
    EncodeFailed,

    /// The video output could not be created.
    EncoderInitFailed,

    /// Start was requested while a recording is already open.
    AlreadyRecording,

    /// The video output reported an error while being finalized.
    FinalizeFailed,
}

impl ErrorKind {
    /// Short title for the UI.
    pub fn title(self) -> &'static str {
        match self {
            Self::DeviceUnavailable => "Camera unavailable",
            Self::CaptureFailed => "Frame capture failed",
            Self::NoFrameAvailable => "No frame captured yet",
            Self::EncodeFailed => "Failed to save image",
            Self::EncoderInitFailed => "Failed to start recording",
            Self::AlreadyRecording => "Already recording",
            Self::FinalizeFailed => "Failed to finalize video",
        }
    }
}

/// Outcome of a finished recording.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingSummary {
    /// Output file.
    pub path: PathBuf,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Frame rate stamped on the output.
    pub fps: u32,

    /// Frames written to the output.
    pub frames_written: u64,

    /// Frames discarded while paused.
    pub frames_skipped: u64,

    /// Frames the output rejected.
    pub write_errors: u64,

    /// Ticks whose frame read failed during the session.
    pub capture_failures: u64,

    /// Number of times the session was paused.
    pub pause_count: u32,

    /// Wall-clock time spent paused, in milliseconds.
    pub paused_ms: u64,

    /// Wall-clock time from start to stop, in milliseconds.
    pub elapsed_ms: u64,
}

impl RecordingSummary {
    /// Playback duration of the output in milliseconds.
    ///
    /// Paused time never reaches the output, so this is derived from the
    /// written frame count alone.
    pub fn output_duration_ms(&self) -> u64 {
        if self.fps == 0 {
            return 0;
        }
        self.frames_written * 1000 / u64::from(self.fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reopen_policy_delays() {
        let policy = ReopenPolicy::default();

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(64), Duration::from_secs(10));
    }

    #[test]
    fn test_default_config_matches_camera_defaults() {
        let config = SessionConfig::default();

        assert_eq!(config.device_index, 0);
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.video_fps, 20);
        assert_eq!(config.still_format.extension(), "png");
        assert_eq!(config.video_extension, "avi");
    }

    #[test]
    fn test_output_duration_ignores_paused_time() {
        let summary = RecordingSummary {
            fps: 20,
            frames_written: 50,
            paused_ms: 30_000,
            elapsed_ms: 32_500,
            ..Default::default()
        };

        assert_eq!(summary.output_duration_ms(), 2500);
    }

    #[test]
    fn test_error_event_serializes_kind() {
        let event = crate::SessionEvent::error(ErrorKind::NoFrameAvailable, "nothing yet");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("NoFrameAvailable"));
        assert!(json.contains("nothing yet"));
    }
}
