//! Camera device enumeration.

use nokhwa::query;
use nokhwa::utils::ApiBackend;

use super::types::{CameraError, CameraInfo};

/// Capture devices the native backend can see, ordered by index.
///
/// Devices addressed by a string rather than an index (some IP cameras)
/// cannot be selected with `--camera` and are left out.
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let mut cameras: Vec<CameraInfo> = query(ApiBackend::Auto)
        .map_err(|e| CameraError::QueryFailed(e.to_string()))?
        .into_iter()
        .filter_map(|d| {
            let index = d.index().as_index().ok()?;
            Some(CameraInfo {
                index,
                name: d.human_name(),
                description: d.description().to_string(),
            })
        })
        .collect();
    cameras.sort_by_key(|c| c.index);
    Ok(cameras)
}

/// Look up the device a session asked for.
pub fn find_device(index: u32) -> Result<CameraInfo, CameraError> {
    list_devices()?
        .into_iter()
        .find(|c| c.index == index)
        .ok_or(CameraError::DeviceNotFound(index))
}
