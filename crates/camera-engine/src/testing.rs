//! Test doubles shared by the engine's unit tests.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use camera_capture::{CaptureTimestamp, Frame};
use camera_encoder::{
    EncoderError, EncoderResult, VideoWriter, VideoWriterConfig, VideoWriterFactory,
};

/// A 4x4 frame with every byte set to `value`.
pub(crate) fn frame_with(value: u8) -> Frame {
    Frame::new(
        vec![value; Frame::rgb_buffer_size(4, 4)],
        4,
        4,
        CaptureTimestamp::now(Instant::now()),
        u64::from(value),
    )
    .unwrap()
}

/// Write an executable shell script standing in for the ffmpeg binary.
#[cfg(unix)]
pub(crate) fn stub_encoder(dir: &std::path::Path, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[derive(Default)]
struct LogInner {
    opened: u32,
    finished: u32,
    open_now: u32,
    max_open: u32,
    frames: Vec<Vec<u8>>,
}

/// Shared record of what the memory writers saw.
#[derive(Clone, Default)]
pub(crate) struct WriterLog(Arc<Mutex<LogInner>>);

impl WriterLog {
    pub(crate) fn opened(&self) -> u32 {
        self.0.lock().opened
    }

    pub(crate) fn finished(&self) -> u32 {
        self.0.lock().finished
    }

    pub(crate) fn open_now(&self) -> u32 {
        self.0.lock().open_now
    }

    pub(crate) fn max_open(&self) -> u32 {
        self.0.lock().max_open
    }

    pub(crate) fn frames(&self) -> Vec<Vec<u8>> {
        self.0.lock().frames.clone()
    }

    fn open(&self) {
        let mut inner = self.0.lock();
        inner.opened += 1;
        inner.open_now += 1;
        inner.max_open = inner.max_open.max(inner.open_now);
    }

    fn release(&self) {
        let mut inner = self.0.lock();
        inner.finished += 1;
        inner.open_now -= 1;
    }
}

/// Factory for in-memory writers.
pub(crate) struct MemoryWriterFactory {
    log: WriterLog,
    fail_create: bool,
    fail_finish: bool,
}

impl MemoryWriterFactory {
    pub(crate) fn new() -> Self {
        Self {
            log: WriterLog::default(),
            fail_create: false,
            fail_finish: false,
        }
    }

    /// Every `create` fails.
    pub(crate) fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new()
        }
    }

    /// Every `finish` fails after releasing.
    pub(crate) fn failing_finish() -> Self {
        Self {
            fail_finish: true,
            ..Self::new()
        }
    }

    pub(crate) fn log(&self) -> WriterLog {
        self.log.clone()
    }
}

impl VideoWriterFactory for MemoryWriterFactory {
    fn create(&self, config: &VideoWriterConfig) -> EncoderResult<Box<dyn VideoWriter>> {
        if self.fail_create {
            return Err(EncoderError::InitFailed("unsupported codec".into()));
        }
        self.log.open();
        Ok(Box::new(MemoryWriter {
            log: self.log.clone(),
            frame_size: config.frame_size(),
            frames_written: 0,
            fail_finish: self.fail_finish,
            released: false,
        }))
    }
}

struct MemoryWriter {
    log: WriterLog,
    frame_size: usize,
    frames_written: u64,
    fail_finish: bool,
    released: bool,
}

impl MemoryWriter {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.release();
        }
    }
}

impl VideoWriter for MemoryWriter {
    fn write_frame(&mut self, rgb: &[u8]) -> EncoderResult<()> {
        if rgb.len() != self.frame_size {
            return Err(EncoderError::InvalidInput("frame size mismatch".into()));
        }
        self.log.0.lock().frames.push(rgb.to_vec());
        self.frames_written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn finish(mut self: Box<Self>) -> EncoderResult<u64> {
        self.release();
        if self.fail_finish {
            return Err(EncoderError::FinishFailed("muxer error".into()));
        }
        Ok(self.frames_written)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.release();
    }
}
