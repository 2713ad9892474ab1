//! Webcam frame source backed by nokhwa.

#[cfg(feature = "native")]
use std::time::Instant;

#[cfg(feature = "native")]
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
    Camera,
};
use tracing::info;
#[cfg(feature = "native")]
use tracing::{debug, warn};

#[cfg(feature = "native")]
use crate::CaptureTimestamp;
use crate::{CaptureError, CaptureResult, Frame, FrameSource};

/// Frame rate requested from the device.
#[cfg(feature = "native")]
const REQUESTED_FPS: u32 = 30;

/// A physical camera.
pub struct WebcamSource {
    #[cfg(feature = "native")]
    camera: Option<Camera>,
    #[cfg(feature = "native")]
    start_time: Instant,
    index: u32,
    width: u32,
    height: u32,
    sequence: u64,
    open: bool,
}

impl WebcamSource {
    /// Open the camera at `index`, asking for a size close to `width`x`height`.
    #[cfg(feature = "native")]
    pub fn open(index: u32, width: u32, height: u32) -> CaptureResult<Self> {
        let unavailable = |message: String| CaptureError::DeviceUnavailable { index, message };

        let format = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::MJPEG,
            REQUESTED_FPS,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| unavailable(format!("create camera: {e}")))?;
        camera
            .open_stream()
            .map_err(|e| unavailable(format!("open stream: {e}")))?;

        // The device may pick a different resolution than requested.
        let actual = camera.resolution();
        info!(
            index,
            width = actual.width(),
            height = actual.height(),
            "Camera opened"
        );

        Ok(Self {
            camera: Some(camera),
            start_time: Instant::now(),
            index,
            width: actual.width(),
            height: actual.height(),
            sequence: 0,
            open: true,
        })
    }

    /// Open the camera (stub for builds without the `native` feature).
    #[cfg(not(feature = "native"))]
    pub fn open(index: u32, _width: u32, _height: u32) -> CaptureResult<Self> {
        Err(CaptureError::DeviceUnavailable {
            index,
            message: "built without native camera support".into(),
        })
    }

    #[cfg(feature = "native")]
    fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                warn!("Failed to stop camera stream: {}", e);
            }
        }
    }

    #[cfg(not(feature = "native"))]
    fn release_camera(&mut self) {}
}

impl FrameSource for WebcamSource {
    #[cfg(feature = "native")]
    fn next_frame(&mut self) -> CaptureResult<Frame> {
        let camera = self.camera.as_mut().ok_or(CaptureError::Closed)?;

        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::FrameConversion(e.to_string()))?;

        let (width, height) = image.dimensions();
        if (width, height) != (self.width, self.height) {
            debug!(width, height, "Camera changed resolution");
            self.width = width;
            self.height = height;
        }

        let sequence = self.sequence;
        self.sequence += 1;
        Frame::new(
            image.into_raw(),
            width,
            height,
            CaptureTimestamp::now(self.start_time),
            sequence,
        )
    }

    #[cfg(not(feature = "native"))]
    fn next_frame(&mut self) -> CaptureResult<Frame> {
        Err(CaptureError::Closed)
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.release_camera();

        info!(index = self.index, frames = self.sequence, "Camera released");
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

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.close();
    }
}
