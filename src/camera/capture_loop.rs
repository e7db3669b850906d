//! Background grabbing thread.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::frame_utils::{convert_to_rgb, mirror_horizontal};
use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// Open the device, report the negotiated resolution on `ready`, then keep
/// `latest` filled with the newest decoded frame until `stop` is raised.
pub fn run_capture_loop(
    settings: CameraSettings,
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    ready: Sender<Result<Resolution, CameraError>>,
) {
    let index = CameraIndex::Index(settings.device_index);

    let mut camera = match open_camera_with_fallback(&index, &settings) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(CameraError::StreamFailed(e.to_string())));
        return;
    }

    let res = camera.resolution();
    let _ = ready.send(Ok(Resolution {
        width: res.width(),
        height: res.height(),
    }));

    while !stop.load(Ordering::Relaxed) {
        if let Ok(raw_frame) = camera.frame() {
            // Frames that fail to decode are dropped; the next one usually works.
            if let Some(mut frame) = convert_to_rgb(&raw_frame) {
                if settings.mirror {
                    mirror_horizontal(&mut frame);
                }
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(frame);
                }
            }
        }

        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
    log::debug!("camera {} stream stopped", settings.device_index);
}

/// Try the ideal size in the formats webcams commonly expose, then fall back
/// to whatever the device offers.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &CameraSettings,
) -> Result<Camera, CameraError> {
    let ideal = nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let format_attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            ideal,
            NokhwaFrameFormat::MJPEG,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            ideal,
            NokhwaFrameFormat::YUYV,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            ideal,
            NokhwaFrameFormat::NV12,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = String::from("no format accepted");
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = e.to_string(),
        }
    }

    let msg = last_error.to_lowercase();
    if ["permission", "denied", "authorization", "not authorized"]
        .iter()
        .any(|needle| msg.contains(needle))
    {
        Err(CameraError::PermissionDenied)
    } else {
        Err(CameraError::OpenFailed(last_error))
    }
}
