use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Buffer, Camera};

use crate::capture::domain::frame_source::{drain_for, CaptureError, DeviceId, FrameSource};
use crate::shared::frame::Frame;

/// Webcam capture through `nokhwa`. Frames that are read are decoded to RGB;
/// drained frames are not.
pub struct NokhwaFrameSource {
    camera: Option<Camera>,
    device: DeviceId,
    frames_read: usize,
}

impl NokhwaFrameSource {
    /// Opens the device and starts streaming at its highest frame rate.
    pub fn open(device: &DeviceId) -> Result<Self, CaptureError> {
        let unavailable = |reason: String| CaptureError::DeviceUnavailable {
            device: device.to_string(),
            reason,
        };
        let index = match device {
            DeviceId::Index(i) => CameraIndex::Index(*i),
            DeviceId::Path(p) => CameraIndex::String(p.clone()),
        };
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(index, requested).map_err(|e| unavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| unavailable(e.to_string()))?;

        log::info!(
            "Camera opened: {} ({}x{} @ {} fps)",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height(),
            camera.frame_rate()
        );

        Ok(Self {
            camera: Some(camera),
            device: device.clone(),
            frames_read: 0,
        })
    }

    /// Pulls the next raw buffer without decoding it.
    fn grab(&mut self) -> Result<Buffer, CaptureError> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| CaptureError::CaptureFailed(format!("device {} is closed", self.device)))?;
        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        self.frames_read += 1;
        Ok(buffer)
    }
}

impl FrameSource for NokhwaFrameSource {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let buffer = self.grab()?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        let (width, height) = (image.width(), image.height());
        Ok(Frame::new(image.into_raw(), width, height, 3, self.frames_read - 1))
    }

    /// Discarded frames are grabbed but never decoded.
    fn drain(&mut self, duration: Duration) -> Result<usize, CaptureError> {
        drain_for(duration, || self.grab().map(|_| ()))
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::debug!("Stopping camera stream failed: {e}");
            }
            log::info!("Camera {} released after {} frames", self.device, self.frames_read);
        }
    }
}

impl Drop for NokhwaFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
