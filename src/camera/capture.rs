//! Camera capture handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use super::capture_loop::run_capture_loop;
use super::device::find_device;
use super::types::{CameraError, CameraSettings, Frame, Resolution};

/// Owns a capture device and the thread that reads from it.
///
/// The device is opened on the background thread by [`start`](Self::start);
/// the newest frame is kept in a single slot and read with
/// [`latest_frame`](Self::latest_frame). Dropping the handle stops the device.
pub struct CameraCapture {
    latest: Arc<Mutex<Option<Frame>>>,
    capture_thread: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    settings: CameraSettings,
    /// Negotiated resolution, known once the stream is running
    actual_resolution: Option<Resolution>,
}

impl std::fmt::Debug for CameraCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCapture")
            .field("settings", &self.settings)
            .field("actual_resolution", &self.actual_resolution)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl CameraCapture {
    /// Check that the device exists. The stream itself is opened by `start()`.
    ///
    /// # Errors
    /// * `CameraError::DeviceNotFound` - no device at `settings.device_index`
    /// * `CameraError::QueryFailed` - the backend could not enumerate devices
    pub fn open(settings: CameraSettings) -> Result<Self, CameraError> {
        let device = find_device(settings.device_index)?;
        log::debug!("Selected {}", device);

        Ok(Self {
            latest: Arc::new(Mutex::new(None)),
            capture_thread: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            settings,
            actual_resolution: None,
        })
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn actual_resolution(&self) -> Option<Resolution> {
        self.actual_resolution
    }

    /// Spawn the grabbing thread and wait until the stream is open.
    ///
    /// # Errors
    /// * `CameraError::AlreadyRunning` - `start()` was already called
    /// * `CameraError::PermissionDenied` / `OpenFailed` / `StreamFailed` -
    ///   the device could not be opened
    pub fn start(&mut self) -> Result<Resolution, CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }

        self.stop_signal.store(false, Ordering::SeqCst);
        let latest = Arc::clone(&self.latest);
        let stop = Arc::clone(&self.stop_signal);
        let settings = self.settings.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        self.capture_thread = Some(std::thread::spawn(move || {
            run_capture_loop(settings, latest, stop, ready_tx);
        }));

        let outcome = ready_rx.recv().unwrap_or_else(|_| {
            Err(CameraError::StreamFailed(
                "capture thread terminated unexpectedly".to_string(),
            ))
        });

        match outcome {
            Ok(resolution) => {
                self.actual_resolution = Some(resolution);
                Ok(resolution)
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    /// Stop the grabbing thread and drop the buffered frame.
    ///
    /// Returns `false` if there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        self.stop_signal.store(true, Ordering::SeqCst);

        let Some(handle) = self.capture_thread.take() else {
            return false;
        };
        let _ = handle.join();

        if let Ok(mut slot) = self.latest.lock() {
            *slot = None;
        }
        true
    }

    /// Newest frame, or `None` if the device has not produced one yet.
    pub fn latest_frame(&self) -> Option<Frame> {
        let slot = self.latest.lock().ok()?;
        slot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
