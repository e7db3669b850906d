//! Capture-and-verify session.
//!
//! A [`SessionController`] acquires the camera through a [`CaptureSession`],
//! submits one frame per tick through a [`Verifier`], turns each answer into a
//! [`StatusView`] for the [`UiSink`], and hands the final [`Outcome`] to a
//! [`Navigator`].

mod capture;
mod client;
mod controller;
mod progress;
mod scheduler;
mod ui;

pub use capture::{
    CameraSession, CaptureConstraints, CaptureError, CaptureSession, FrameSample,
    DEFAULT_JPEG_QUALITY,
};
pub use client::{
    Credentials, VerificationClient, VerificationResult, VerificationState, Verifier,
    VerifyError, CONNECTION_ISSUE_MESSAGE, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT,
    REPORTED_FAILURE_FALLBACK,
};
pub use controller::{
    Outcome, Session, SessionController, SessionPolicy, SessionState, SessionStats,
    CAMERA_ACTIVE_STATUS, CAMERA_UNAVAILABLE_STATUS, DEFAULT_FRAME_INTERVAL,
    DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_SESSION_TIMEOUT, TIMED_OUT_STATUS,
};
pub use progress::{
    compute_completion, format_ear, render_status, snapshot, ProgressSnapshot, StatusView,
    DEFAULT_STATUS, EAR_PLACEHOLDER,
};
pub use scheduler::{Clock, IntervalScheduler, Scheduler, SystemClock};
pub use ui::{
    render_bar, ConsoleUi, InvalidResultUrl, Navigator, ResultNavigator, UiSink,
    DEFAULT_RESULT_URL,
};
