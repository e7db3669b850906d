//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

/// A capture device reported by the platform backend.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Backend description (driver, bus, ...)
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 960x540, the ideal size requested for liveness frames.
    pub const QHD: Resolution = Resolution {
        width: 960,
        height: 540,
    };

    /// 640x480 fallback most webcams can deliver.
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    /// True when both dimensions are non-zero.
    pub fn is_sized(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::QHD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Front camera, pointed at the user
    #[default]
    User,
    /// Rear camera
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

/// A decoded RGB frame (3 bytes per pixel, row-major).
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// When the frame was grabbed from the device
    pub timestamp: Instant,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }
}

/// Settings used to open a capture device.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Camera device index
    pub device_index: u32,
    /// Ideal resolution; the device may pick the closest it supports
    pub resolution: Resolution,
    /// Target FPS (actual may vary)
    pub fps: u32,
    /// Mirror horizontally (selfie mode)
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::default(),
            fps: 30,
            mirror: true,
        }
    }
}

/// Errors raised by the device layer.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera device {0} not found")]
    DeviceNotFound(u32),

    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),

    #[error("Capture thread is already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_info_display() {
        let info = CameraInfo {
            index: 1,
            name: "FaceTime HD".to_string(),
            description: "Built-in".to_string(),
        };
        assert_eq!(format!("{}", info), "[1] FaceTime HD (Built-in)");
    }

    #[test]
    fn test_default_resolution_is_ideal_liveness_size() {
        let res = Resolution::default();
        assert_eq!(res, Resolution { width: 960, height: 540 });
        assert_eq!(res.to_string(), "960x540");
    }

    #[test]
    fn test_unsized_resolution() {
        assert!(!Resolution { width: 0, height: 540 }.is_sized());
        assert!(Resolution::VGA.is_sized());
    }

    #[test]
    fn test_facing_mode_default_is_user() {
        assert_eq!(FacingMode::default(), FacingMode::User);
        assert_eq!(FacingMode::User.as_str(), "user");
    }

    #[test]
    fn test_camera_settings_default() {
        let settings = CameraSettings::default();
        assert_eq!(settings.device_index, 0);
        assert_eq!(settings.resolution, Resolution::QHD);
        assert!(settings.mirror);
    }

    #[test]
    fn test_camera_error_display() {
        assert_eq!(
            CameraError::DeviceNotFound(3).to_string(),
            "Camera device 3 not found"
        );
        assert_eq!(
            CameraError::StreamFailed("busy".to_string()).to_string(),
            "Failed to start camera stream: busy"
        );
    }
}
