//! Per-recording counters.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use camera_ipc::RecordingSummary;

/// Counters for one recording session.
#[derive(Debug)]
pub struct SessionStats {
    started_at: Instant,
    frames_skipped: u64,
    write_errors: u64,
    capture_failures: u64,
    pause_count: u32,
    paused_total: Duration,
    paused_since: Option<Instant>,
}

impl SessionStats {
    /// Start counting at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            started_at: now,
            frames_skipped: 0,
            write_errors: 0,
            capture_failures: 0,
            pause_count: 0,
            paused_total: Duration::ZERO,
            paused_since: None,
        }
    }

    /// Record a frame discarded while paused.
    pub fn record_skipped(&mut self) {
        self.frames_skipped += 1;
    }

    /// Record a frame the output rejected. Returns the running total.
    pub fn record_write_error(&mut self) -> u64 {
        self.write_errors += 1;
        self.write_errors
    }

    /// Record a tick whose frame read failed.
    pub fn record_capture_failure(&mut self) {
        self.capture_failures += 1;
    }

    /// Mark the start of a pause.
    pub fn pause(&mut self, now: Instant) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
            self.pause_count += 1;
        }
    }

    /// Mark the end of a pause.
    pub fn resume(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += now.saturating_duration_since(since);
        }
    }

    /// Total paused time, including an ongoing pause.
    pub fn paused_duration(&self, now: Instant) -> Duration {
        let ongoing = self
            .paused_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        self.paused_total + ongoing
    }

    /// Frames rejected by the output so far.
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Wall-clock time since start.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Build the summary reported when the session ends.
    pub fn summary(
        &self,
        now: Instant,
        path: PathBuf,
        (width, height): (u32, u32),
        fps: u32,
        frames_written: u64,
    ) -> RecordingSummary {
        RecordingSummary {
            path,
            width,
            height,
            fps,
            frames_written,
            frames_skipped: self.frames_skipped,
            write_errors: self.write_errors,
            capture_failures: self.capture_failures,
            pause_count: self.pause_count,
            paused_ms: self.paused_duration(now).as_millis() as u64,
            elapsed_ms: self.elapsed(now).as_millis() as u64,
        }
    }
}
