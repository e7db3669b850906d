//! End-to-end session runs against a mock verification endpoint.
//!
//! Uses the real HTTP client, interval scheduler, system clock and result
//! navigator; only the camera is replaced.

use std::time::Duration;

use blink_verify::camera::Resolution;
use blink_verify::session::{
    CaptureConstraints, CaptureError, CaptureSession, Credentials, FrameSample,
    IntervalScheduler, Outcome, ResultNavigator, Session, SessionController, SessionPolicy,
    SessionState, StatusView, SystemClock, UiSink, VerificationClient,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StillCamera;

impl CaptureSession for StillCamera {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<Resolution, CaptureError> {
        Ok(constraints.ideal)
    }

    fn capture_frame(&mut self) -> Result<FrameSample, CaptureError> {
        Ok(FrameSample {
            image: "data:image/jpeg;base64,/9j/".to_string(),
            resolution: Resolution::QHD,
        })
    }

    fn release(&mut self) -> bool {
        true
    }
}

struct QuietUi;

impl UiSink for QuietUi {
    fn show_status(&mut self, _text: &str) {}

    fn show_progress(&mut self, _view: &StatusView) {}
}

fn fast_policy() -> SessionPolicy {
    SessionPolicy {
        frame_interval: Duration::from_millis(10),
        ..SessionPolicy::default()
    }
}

#[tokio::test]
async fn test_session_verifies_against_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process_frame"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "state": "in_progress",
            "message": "Open-eye frame captured. Now blink.",
            "open_captured": true,
            "blink_open_seen": true
        })))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/process_frame"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "state": "verified",
            "open_captured": true,
            "closed_captured": true,
            "blink_open_seen": true,
            "blink_closed_seen": true,
            "blink_reopen_seen": true
        })))
        .mount(&mock_server)
        .await;

    let client = VerificationClient::new(format!("{}/process_frame", mock_server.uri())).unwrap();
    let navigator = ResultNavigator::new(&format!("{}/result", mock_server.uri())).unwrap();
    let policy = fast_policy();
    let mut session = Session::new(
        StillCamera,
        Credentials::new("user@example.com", "tok-123"),
        policy,
    );

    let mut controller = SessionController::new(
        &mut session,
        client,
        IntervalScheduler::new(policy.frame_interval),
        SystemClock,
        QuietUi,
        navigator,
    );
    let state = controller.run().await;

    assert_eq!(state, SessionState::Terminated(Outcome::Verified));
    let destination = controller
        .navigator()
        .destination()
        .map(|u| u.to_string())
        .unwrap();
    assert_eq!(destination, format!("{}/result?status=verified", mock_server.uri()));
    drop(controller);

    assert_eq!(session.stats().requests, 3);
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);

    let body: serde_json::Value = received[0].body_json().unwrap();
    assert_eq!(body["email"], "user@example.com");
    assert_eq!(body["token"], "tok-123");
    assert_eq!(body["image"], "data:image/jpeg;base64,/9j/");
}

#[tokio::test]
async fn test_session_fails_when_endpoint_is_down() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client =
        VerificationClient::new(format!("http://127.0.0.1:{}/process_frame", port)).unwrap();
    let navigator = ResultNavigator::new("http://localhost:5000/result").unwrap();
    let policy = fast_policy();
    let mut session = Session::new(
        StillCamera,
        Credentials::new("user@example.com", "tok-123"),
        policy,
    );

    let mut controller = SessionController::new(
        &mut session,
        client,
        IntervalScheduler::new(policy.frame_interval),
        SystemClock,
        QuietUi,
        navigator,
    );
    let state = controller.run().await;

    assert_eq!(state, SessionState::Terminated(Outcome::Failed));
    assert_eq!(
        controller.navigator().destination().map(|u| u.as_str()),
        Some("http://localhost:5000/result?status=failed")
    );
    drop(controller);

    assert_eq!(session.stats().requests, 5);
    assert_eq!(session.consecutive_failures(), 5);
}
