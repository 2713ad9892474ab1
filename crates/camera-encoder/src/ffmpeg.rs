//! Video output through an ffmpeg child process.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{EncoderError, EncoderResult, VideoWriter, VideoWriterConfig, VideoWriterFactory};

/// Quantizer passed to codecs that take `-q:v` (lower is better).
const VIDEO_QUALITY: u32 = 5;

/// How long ffmpeg must stay alive after spawning to count as started.
/// Unknown encoders and bad muxer options make it exit well within this.
const STARTUP_GRACE: Duration = Duration::from_millis(150);

const STARTUP_POLL: Duration = Duration::from_millis(10);

/// Bytes of ffmpeg diagnostics kept for error messages.
const STDERR_TAIL_BYTES: usize = 4096;

/// Build the ffmpeg argument list for a raw RGB stdin input.
fn build_args(config: &VideoWriterConfig) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        format!("{}x{}", config.width, config.height),
        "-r".to_string(),
        config.fps.to_string(),
        "-i".to_string(),
        "-".to_string(), // stdin for video frames
        "-c:v".to_string(),
        config.codec.clone(),
        "-q:v".to_string(),
        VIDEO_QUALITY.to_string(),
    ];

    if let Some(ref tag) = config.tag {
        args.extend(["-vtag".to_string(), tag.clone()]);
    }

    args.push(config.path.to_string_lossy().into_owned());
    args
}

/// Read ffmpeg's stderr to EOF on a helper thread so the child can never
/// stall on a full pipe. Keeps the last [`STDERR_TAIL_BYTES`].
fn drain_stderr(mut pipe: ChildStderr) -> std::io::Result<JoinHandle<String>> {
    thread::Builder::new()
        .name("ffmpeg-stderr".to_string())
        .spawn(move || {
            let mut tail = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match pipe.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        tail.extend_from_slice(&buf[..n]);
                        if tail.len() > STDERR_TAIL_BYTES {
                            let excess = tail.len() - STDERR_TAIL_BYTES;
                            tail.drain(..excess);
                        }
                    }
                }
            }
            String::from_utf8_lossy(&tail).into_owned()
        })
}

fn join_stderr(reader: Option<JoinHandle<String>>) -> String {
    reader
        .map(|handle| handle.join().unwrap_or_default())
        .unwrap_or_default()
}

/// Kill a half-started child and remove its output file.
fn abort_startup(process: &mut Child, path: &Path) {
    let _ = process.kill();
    let _ = process.wait();
    let _ = fs::remove_file(path);
}

/// A video file being written by ffmpeg.
pub struct FfmpegWriter {
    process: Child,
    stdin: Option<ChildStdin>,
    stderr_reader: Option<JoinHandle<String>>,
    frame_size: usize,
    frames_written: u64,
    path: PathBuf,
}

impl FfmpegWriter {
    /// Spawn `binary` writing to `config.path`.
    ///
    /// Fails with [`EncoderError::InitFailed`] if the process cannot be
    /// started or exits during [`STARTUP_GRACE`]. No file is left behind on
    /// failure.
    pub fn spawn(binary: &str, config: &VideoWriterConfig) -> EncoderResult<Self> {
        if config.width == 0 || config.height == 0 || config.fps == 0 {
            return Err(EncoderError::InitFailed(format!(
                "invalid video format {}x{} @ {} fps",
                config.width, config.height, config.fps
            )));
        }

        // Surface an unwritable destination now rather than at the first frame.
        File::create(&config.path).map_err(|e| {
            EncoderError::InitFailed(format!("cannot create {}: {}", config.path.display(), e))
        })?;

        let args = build_args(config);
        debug!(?args, "Starting ffmpeg");

        let mut process = match Command::new(binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(process) => process,
            Err(e) => {
                let _ = fs::remove_file(&config.path);
                return Err(EncoderError::InitFailed(format!("failed to start {binary}: {e}")));
            }
        };

        let (Some(stdin), Some(stderr)) = (process.stdin.take(), process.stderr.take()) else {
            abort_startup(&mut process, &config.path);
            return Err(EncoderError::InitFailed("failed to capture ffmpeg pipes".into()));
        };
        let stderr_reader = match drain_stderr(stderr) {
            Ok(handle) => handle,
            Err(e) => {
                abort_startup(&mut process, &config.path);
                return Err(EncoderError::InitFailed(format!(
                    "failed to start stderr reader: {e}"
                )));
            }
        };

        let deadline = Instant::now() + STARTUP_GRACE;
        loop {
            match process.try_wait() {
                Ok(Some(status)) => {
                    drop(stdin);
                    let stderr = join_stderr(Some(stderr_reader));
                    let _ = fs::remove_file(&config.path);
                    return Err(EncoderError::InitFailed(format!(
                        "{binary} exited during startup with {status}: {}",
                        stderr.trim()
                    )));
                }
                Ok(None) if Instant::now() >= deadline => break,
                Ok(None) => thread::sleep(STARTUP_POLL),
                Err(e) => {
                    drop(stdin);
                    abort_startup(&mut process, &config.path);
                    let _ = join_stderr(Some(stderr_reader));
                    return Err(EncoderError::InitFailed(format!(
                        "failed to poll {binary}: {e}"
                    )));
                }
            }
        }

        info!(
            path = %config.path.display(),
            width = config.width,
            height = config.height,
            fps = config.fps,
            codec = %config.codec,
            "Video output opened"
        );

        Ok(Self {
            process,
            stdin: Some(stdin),
            stderr_reader: Some(stderr_reader),
            frame_size: config.frame_size(),
            frames_written: 0,
            path: config.path.clone(),
        })
    }

    /// Close stdin and wait for ffmpeg. A no-op once finalized.
    fn finalize(&mut self) -> EncoderResult<()> {
        let Some(stdin) = self.stdin.take() else {
            return Ok(());
        };
        // EOF tells ffmpeg to write the trailer.
        drop(stdin);

        let status = self.process.wait();
        let stderr = join_stderr(self.stderr_reader.take());
        let status = status
            .map_err(|e| EncoderError::FinishFailed(format!("failed to wait for ffmpeg: {e}")))?;

        if !status.success() {
            return Err(EncoderError::FinishFailed(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        info!(
            path = %self.path.display(),
            frames = self.frames_written,
            "Video output finalized"
        );
        Ok(())
    }
}

impl VideoWriter for FfmpegWriter {
    fn write_frame(&mut self, rgb: &[u8]) -> EncoderResult<()> {
        if rgb.len() != self.frame_size {
            return Err(EncoderError::InvalidInput(format!(
                "expected {} bytes per frame, got {}",
                self.frame_size,
                rgb.len()
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| EncoderError::Encoding("output already finalized".into()))?;
        stdin
            .write_all(rgb)
            .map_err(|e| EncoderError::Encoding(format!("failed to write frame: {e}")))?;

        self.frames_written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn finish(mut self: Box<Self>) -> EncoderResult<u64> {
        self.finalize()?;
        Ok(self.frames_written)
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finalize() {
            warn!("Video output closed with error: {}", e);
        }
    }
}

/// Creates [`FfmpegWriter`]s using a given ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegWriterFactory {
    binary: String,
}

impl FfmpegWriterFactory {
    /// Use a specific ffmpeg binary.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegWriterFactory {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl VideoWriterFactory for FfmpegWriterFactory {
    fn create(&self, config: &VideoWriterConfig) -> EncoderResult<Box<dyn VideoWriter>> {
        let writer = FfmpegWriter::spawn(&self.binary, config)?;
        Ok(Box::new(writer))
    }
}
