//! Webcam access for the verification session.
//!
//! - Device enumeration via [`list_devices`]
//! - Background frame grabbing via [`CameraCapture`]
//! - JPEG data-URL encoding via [`encode_data_url`]

mod capture;
mod capture_loop;
mod device;
mod frame_utils;
mod types;

pub use capture::CameraCapture;
pub use device::{find_device, list_devices};
pub use frame_utils::{encode_data_url, mirror_horizontal};
pub use types::{CameraError, CameraInfo, CameraSettings, FacingMode, Frame, Resolution};
