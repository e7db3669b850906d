//! Session state machine.
//!
//! ```text
//! Idle -> Starting -> Polling -> Terminating -> Terminated(outcome)
//!            |                                      ^
//!            +---------- acquire failed ------------+
//! ```
//!
//! A teardown (Ctrl+C, view closed) may interrupt any state except
//! `Terminated`; it releases the device without navigating and leaves the
//! session in `TornDown`.

use std::fmt;
use std::time::{Duration, Instant};

use futures_util::future::{FutureExt, LocalBoxFuture, OptionFuture};
use tokio_util::sync::CancellationToken;

use super::capture::{CaptureConstraints, CaptureError, CaptureSession};
use super::client::{Credentials, VerificationResult, Verifier, VerifyError};
use super::progress::render_status;
use super::scheduler::{Clock, Scheduler};
use super::ui::{Navigator, UiSink};

/// Default tick period.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(200);

/// Consecutive request failures that end the session.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Wall-clock budget for a whole session.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(40);

pub const CAMERA_ACTIVE_STATUS: &str = "Camera active. Keep one centered face and blink naturally.";
pub const CAMERA_UNAVAILABLE_STATUS: &str =
    "Unable to access webcam. Allow camera permission and retry.";
pub const TIMED_OUT_STATUS: &str = "Verification timed out. Please try again.";

/// Terminal result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Verified,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Verified => "verified",
            Outcome::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Polling,
    Terminating,
    Terminated(Outcome),
    /// Released by the teardown hook before reaching an outcome.
    TornDown,
}

impl SessionState {
    /// `Terminated` and `TornDown` are absorbing.
    pub fn is_final(&self) -> bool {
        matches!(self, SessionState::Terminated(_) | SessionState::TornDown)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            SessionState::Terminated(outcome) => Some(*outcome),
            _ => None,
        }
    }
}

/// Failure and timing limits for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub frame_interval: Duration,
    pub max_consecutive_failures: u32,
    pub timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

/// Counters kept for the end-of-session log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u32,
    /// Ticks dropped because a request was still in flight
    pub dropped_ticks: u32,
    /// Ticks skipped because the device had no frame yet
    pub empty_ticks: u32,
    pub requests: u32,
    pub failures: u32,
}

/// Everything one verification view owns: the device, the credentials and
/// the counters. Dropping it releases the device.
pub struct Session<C: CaptureSession> {
    capture: C,
    credentials: Credentials,
    policy: SessionPolicy,
    state: SessionState,
    started_at: Option<Instant>,
    consecutive_failures: u32,
    device_released: bool,
    stats: SessionStats,
}

impl<C: CaptureSession> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<C: CaptureSession> Session<C> {
    pub fn new(capture: C, credentials: Credentials, policy: SessionPolicy) -> Self {
        Self {
            capture,
            credentials,
            policy,
            state: SessionState::Idle,
            started_at: None,
            consecutive_failures: 0,
            device_released: false,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|t0| now.saturating_duration_since(t0))
            .unwrap_or_default()
    }

    fn deadline_passed(&self, now: Instant) -> bool {
        self.elapsed(now) > self.policy.timeout
    }

    /// Stop the device once; later calls do nothing.
    fn release_device(&mut self) -> bool {
        if self.device_released {
            return false;
        }
        self.device_released = true;
        self.capture.release()
    }

    /// Emergency release: stop the device and mark the session torn down.
    /// A session that already has an outcome keeps it.
    pub fn tear_down(&mut self) {
        self.release_device();
        if !self.state.is_final() {
            log::info!("Session torn down in state {:?}", self.state);
            self.state = SessionState::TornDown;
        }
    }
}

impl<C: CaptureSession> Drop for Session<C> {
    fn drop(&mut self) {
        self.release_device();
    }
}

/// Drives a [`Session`] from acquisition to its outcome.
pub struct SessionController<'s, C, V, S, K, U, N>
where
    C: CaptureSession,
{
    session: &'s mut Session<C>,
    verifier: V,
    scheduler: S,
    clock: K,
    ui: U,
    navigator: N,
    constraints: CaptureConstraints,
    teardown: CancellationToken,
}

impl<'s, C, V, S, K, U, N> SessionController<'s, C, V, S, K, U, N>
where
    C: CaptureSession,
    V: Verifier,
    S: Scheduler,
    K: Clock,
    U: UiSink,
    N: Navigator,
{
    pub fn new(
        session: &'s mut Session<C>,
        verifier: V,
        scheduler: S,
        clock: K,
        ui: U,
        navigator: N,
    ) -> Self {
        Self {
            session,
            verifier,
            scheduler,
            clock,
            ui,
            navigator,
            constraints: CaptureConstraints::default(),
            teardown: CancellationToken::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: CaptureConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Teardown hook for the environment, e.g. a token a signal handler
    /// holds. Cancelling it releases the device and ends [`run`](Self::run)
    /// without navigating.
    pub fn with_teardown(mut self, teardown: CancellationToken) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Run the session to a final state.
    ///
    /// Calling it again on a finished session returns the same state without
    /// touching the device or the endpoint.
    pub async fn run(&mut self) -> SessionState {
        if self.session.state == SessionState::Idle {
            self.start();
        }
        if self.session.state == SessionState::Polling {
            self.poll().await;
        }

        let stats = self.session.stats;
        log::info!(
            "Session ended in {:?}: {} ticks, {} requests, {} failures, {} dropped, {} without frame",
            self.session.state,
            stats.ticks,
            stats.requests,
            stats.failures,
            stats.dropped_ticks,
            stats.empty_ticks
        );
        self.session.state
    }

    /// Force the terminal transition. Returns `false` if the session was
    /// already terminating or final.
    pub fn terminate(&mut self, outcome: Outcome) -> bool {
        terminate(
            self.session,
            &mut self.scheduler,
            &mut self.navigator,
            outcome,
        )
    }

    /// Idle -> Starting -> Polling, or straight to Terminated(failed).
    fn start(&mut self) {
        self.session.state = SessionState::Starting;
        self.session.started_at = Some(self.clock.now());

        if self.teardown.is_cancelled() {
            self.session.tear_down();
            return;
        }

        match self.session.capture.acquire(&self.constraints) {
            Ok(resolution) => {
                log::info!(
                    "Polling every {:?} at {}",
                    self.session.policy.frame_interval,
                    resolution
                );
                self.ui.show_status(CAMERA_ACTIVE_STATUS);
                self.scheduler.start();
                self.session.state = SessionState::Polling;
            }
            Err(e) => {
                log::error!("Camera acquisition failed: {}", e);
                self.ui.show_status(CAMERA_UNAVAILABLE_STATUS);
                self.terminate(Outcome::Failed);
            }
        }
    }

    async fn poll(&mut self) {
        let Self {
            session,
            verifier,
            scheduler,
            clock,
            ui,
            navigator,
            teardown,
            ..
        } = self;
        let verifier = &*verifier;

        // At most one request outstanding at any time.
        let mut in_flight: Option<LocalBoxFuture<'_, Result<VerificationResult, VerifyError>>> =
            None;

        while !session.state.is_final() {
            tokio::select! {
                biased;

                _ = teardown.cancelled() => {
                    scheduler.cancel();
                    session.tear_down();
                }

                Some(response) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                    in_flight = None;
                    handle_response(session, scheduler, clock, ui, navigator, response);
                }

                _ = scheduler.tick() => {
                    session.stats.ticks += 1;

                    // Checked before the in-flight guard so a hung request
                    // cannot hold the session past its deadline.
                    if session.deadline_passed(clock.now()) {
                        log::warn!("Session exceeded {:?}", session.policy.timeout);
                        in_flight = None;
                        ui.show_status(TIMED_OUT_STATUS);
                        terminate(session, scheduler, navigator, Outcome::Failed);
                        continue;
                    }

                    if in_flight.is_some() {
                        session.stats.dropped_ticks += 1;
                        log::debug!("Request in flight, dropping tick {}", session.stats.ticks);
                        continue;
                    }

                    match session.capture.capture_frame() {
                        Ok(frame) => {
                            session.stats.requests += 1;
                            let credentials = session.credentials.clone();
                            in_flight = Some(
                                async move { verifier.submit_frame(&frame, &credentials).await }
                                    .boxed_local(),
                            );
                        }
                        Err(CaptureError::NoFrameYet) => {
                            session.stats.empty_ticks += 1;
                            log::debug!("No frame yet, skipping tick {}", session.stats.ticks);
                        }
                        Err(CaptureError::Encode(e)) => {
                            session.stats.empty_ticks += 1;
                            log::warn!("Dropping frame that failed to encode: {}", e);
                        }
                        Err(CaptureError::DeviceUnavailable(reason)) => {
                            log::error!("Camera lost mid-session: {}", reason);
                            ui.show_status(CAMERA_UNAVAILABLE_STATUS);
                            terminate(session, scheduler, navigator, Outcome::Failed);
                        }
                    }
                }
            }
        }
    }
}

fn handle_response<C, S, K, U, N>(
    session: &mut Session<C>,
    scheduler: &mut S,
    clock: &K,
    ui: &mut U,
    navigator: &mut N,
    response: Result<VerificationResult, VerifyError>,
) where
    C: CaptureSession,
    S: Scheduler,
    K: Clock,
    U: UiSink,
    N: Navigator,
{
    match response {
        Ok(result) => {
            session.consecutive_failures = 0;
            ui.show_progress(&render_status(&result));
            if let Some(outcome) = result.outcome() {
                terminate(session, scheduler, navigator, outcome);
            }
        }
        Err(err) => {
            if let Some(reported) = err.reported_result() {
                ui.show_progress(&render_status(reported));
            }
            session.consecutive_failures += 1;
            session.stats.failures += 1;
            log::warn!(
                "Verification request failed ({}/{}): {}",
                session.consecutive_failures,
                session.policy.max_consecutive_failures,
                err
            );
            ui.show_status(&err.user_message());

            if session.consecutive_failures >= session.policy.max_consecutive_failures
                || session.deadline_passed(clock.now())
            {
                terminate(session, scheduler, navigator, Outcome::Failed);
            }
        }
    }
}

/// Terminating -> Terminated(outcome): stop ticking, release the device,
/// then hand the outcome over. Runs at most once per session.
fn terminate<C, S, N>(
    session: &mut Session<C>,
    scheduler: &mut S,
    navigator: &mut N,
    outcome: Outcome,
) -> bool
where
    C: CaptureSession,
    S: Scheduler,
    N: Navigator,
{
    if session.state.is_final() || session.state == SessionState::Terminating {
        return false;
    }

    session.state = SessionState::Terminating;
    scheduler.cancel();
    session.release_device();
    session.state = SessionState::Terminated(outcome);

    log::info!("Session terminated: {}", outcome);
    navigator.navigate(outcome);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_strings() {
        assert_eq!(Outcome::Verified.as_str(), "verified");
        assert_eq!(Outcome::Failed.to_string(), "failed");
    }

    #[test]
    fn test_final_states() {
        assert!(SessionState::Terminated(Outcome::Failed).is_final());
        assert!(SessionState::TornDown.is_final());
        assert!(!SessionState::Terminating.is_final());
        assert!(!SessionState::Polling.is_final());
        assert_eq!(
            SessionState::Terminated(Outcome::Verified).outcome(),
            Some(Outcome::Verified)
        );
        assert_eq!(SessionState::TornDown.outcome(), None);
    }

    #[test]
    fn test_default_policy() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.frame_interval, Duration::from_millis(200));
        assert_eq!(policy.max_consecutive_failures, 5);
        assert_eq!(policy.timeout, Duration::from_secs(40));
    }
}
