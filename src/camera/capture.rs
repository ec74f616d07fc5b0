use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};
use thiserror::Error;

use crate::config::CameraConfig;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("cannot open capture device {device}")]
    Open { device: i32 },
    #[error("capture device error: {0}")]
    Device(#[from] opencv::Error),
}

/// Owned handle to the capture device. Lives on the pipeline thread;
/// the device is released when the handle drops.
pub struct Camera {
    inner: VideoCapture,
    device: i32,
}

impl Camera {
    /// Open and configure the device. Failure here is fatal to startup;
    /// the pipeline must never run without a working source.
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let mut inner = VideoCapture::new(config.device, videoio::CAP_ANY)?;
        if !inner.is_opened()? {
            return Err(CameraError::Open {
                device: config.device,
            });
        }

        inner.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
        inner.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
        inner.set(videoio::CAP_PROP_FPS, config.fps as f64)?;

        tracing::info!(
            device = config.device,
            width = config.width,
            height = config.height,
            fps = config.fps,
            "capture device opened"
        );

        Ok(Self {
            inner,
            device: config.device,
        })
    }

    /// Grab one frame. `Ok(None)` means the device was momentarily not
    /// ready or produced an empty frame; the caller retries.
    pub fn read(&mut self) -> Result<Option<Mat>, CameraError> {
        let mut frame = Mat::default();
        if !self.inner.read(&mut frame)? || frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.inner.release() {
            tracing::warn!(device = self.device, error = %e, "failed to release capture device");
        } else {
            tracing::debug!(device = self.device, "capture device released");
        }
    }
}
