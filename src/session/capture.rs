//! Capture device seam used by the session controller.

use crate::camera::{
    encode_data_url, CameraCapture, CameraError, CameraSettings, FacingMode, Resolution,
};

/// Default JPEG quality for submitted frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// What the session asks of the capture device.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    pub facing: FacingMode,
    /// Ideal size; the device may negotiate something close to it
    pub ideal: Resolution,
    pub audio: bool,
    pub device_index: u32,
    pub mirror: bool,
    /// JPEG quality (1-100) used when encoding frames
    pub jpeg_quality: u8,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            ideal: Resolution::QHD,
            audio: false,
            device_index: 0,
            mirror: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// One encoded still image, produced fresh for a single request.
#[derive(Debug, Clone)]
pub struct FrameSample {
    /// `data:image/jpeg;base64,...`
    pub image: String,
    pub resolution: Resolution,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Permission denied or no matching device. Fatal for the session.
    #[error("Unable to access webcam: {0}")]
    DeviceUnavailable(String),

    /// The device has not produced a sized frame yet.
    #[error("No frame available yet")]
    NoFrameYet,

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

impl From<CameraError> for CaptureError {
    fn from(e: CameraError) -> Self {
        CaptureError::DeviceUnavailable(e.to_string())
    }
}

/// A video source the controller can acquire, sample and release.
///
/// `release` must be idempotent: the controller calls it on every exit path
/// and the teardown hook may call it again.
pub trait CaptureSession {
    /// Open the device. Returns the negotiated resolution.
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<Resolution, CaptureError>;

    /// Encode the current device output.
    fn capture_frame(&mut self) -> Result<FrameSample, CaptureError>;

    /// Stop the device. Returns `true` only when a device was actually stopped.
    fn release(&mut self) -> bool;
}

/// [`CaptureSession`] backed by a local webcam.
#[derive(Debug)]
pub struct CameraSession {
    camera: Option<CameraCapture>,
    jpeg_quality: u8,
}

impl CameraSession {
    pub fn new() -> Self {
        Self {
            camera: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.camera.is_some()
    }
}

impl Default for CameraSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession for CameraSession {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<Resolution, CaptureError> {
        if constraints.audio {
            return Err(CaptureError::DeviceUnavailable(
                "audio capture is not supported".to_string(),
            ));
        }
        if let Some(camera) = &self.camera {
            if let Some(res) = camera.actual_resolution() {
                return Ok(res);
            }
        }

        log::info!(
            "Requesting camera {} (facing {}, ideal {})",
            constraints.device_index,
            constraints.facing.as_str(),
            constraints.ideal
        );

        let mut camera = CameraCapture::open(CameraSettings {
            device_index: constraints.device_index,
            resolution: constraints.ideal,
            fps: 30,
            mirror: constraints.mirror,
        })?;
        let actual = camera.start()?;

        log::info!("Camera stream open at {}", actual);
        self.jpeg_quality = constraints.jpeg_quality;
        self.camera = Some(camera);
        Ok(actual)
    }

    fn capture_frame(&mut self) -> Result<FrameSample, CaptureError> {
        let frame = self
            .camera
            .as_ref()
            .and_then(CameraCapture::latest_frame)
            .filter(|f| f.resolution().is_sized())
            .ok_or(CaptureError::NoFrameYet)?;

        let image = encode_data_url(&frame, self.jpeg_quality)?;
        Ok(FrameSample {
            image,
            resolution: frame.resolution(),
        })
    }

    fn release(&mut self) -> bool {
        match self.camera.take() {
            Some(mut camera) => {
                camera.stop();
                log::info!("Camera released");
                true
            }
            None => false,
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
