//! VerificationClient - submits frames to the liveness endpoint.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::capture::FrameSample;
use super::controller::Outcome;

/// Default verification endpoint of a locally running server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/process_frame";

/// Default timeout for a single verification request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection timeout for the verification endpoint.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shown when the endpoint reports a failure without a message.
pub const REPORTED_FAILURE_FALLBACK: &str = "Frame processing failed.";

/// Shown when no usable response came back.
pub const CONNECTION_ISSUE_MESSAGE: &str = "Connection issue during frame processing.";

/// Identity and one-time token for a session. Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identity: String,
    token: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            token: token.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Overall verification state reported by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationState {
    #[default]
    InProgress,
    Verified,
    Failed,
}

impl From<String> for VerificationState {
    /// States other than `verified` and `failed` (e.g. `pending`) keep the
    /// session polling.
    fn from(state: String) -> Self {
        match state.as_str() {
            "verified" => VerificationState::Verified,
            "failed" => VerificationState::Failed,
            _ => VerificationState::InProgress,
        }
    }
}

/// Response body of the verification endpoint.
///
/// Fields are read leniently: a value of the wrong type (`null`, a string
/// EAR, ...) falls back to its default instead of rejecting the response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VerificationResult {
    #[serde(default, deserialize_with = "lenient_state")]
    pub state: VerificationState,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub open_captured: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub closed_captured: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub blink_open_seen: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub blink_closed_seen: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub blink_reopen_seen: bool,
    /// Eye-aspect-ratio, display only
    #[serde(default, deserialize_with = "lenient_number")]
    pub ear: Option<f64>,
}

fn lenient_state<'de, D: Deserializer<'de>>(d: D) -> Result<VerificationState, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(state) => state.into(),
        _ => VerificationState::InProgress,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(d)?, Value::Bool(true)))
}

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(d)?.as_f64().filter(|v| v.is_finite()))
}

impl VerificationResult {
    /// Terminal outcome carried by this response, if any.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            VerificationState::Verified => Some(Outcome::Verified),
            VerificationState::Failed => Some(Outcome::Failed),
            VerificationState::InProgress => None,
        }
    }

    pub fn open_milestone(&self) -> bool {
        self.blink_open_seen || self.open_captured
    }

    pub fn closed_milestone(&self) -> bool {
        self.blink_closed_seen || self.closed_captured
    }

    pub fn reopen_milestone(&self) -> bool {
        self.blink_reopen_seen
    }
}

#[derive(Debug, Serialize)]
struct FrameRequest<'a> {
    image: &'a str,
    email: &'a str,
    token: &'a str,
}

/// Errors from a single verification request.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// No response: connect, DNS, timeout, or the body could not be read.
    #[error("Transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-2xx status with a JSON body the user should see.
    #[error("Endpoint reported failure ({status})")]
    Reported {
        status: u16,
        result: Box<VerificationResult>,
    },

    /// The body was not a verification payload.
    #[error("Malformed response ({status})")]
    Malformed { status: u16 },

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),
}

impl VerifyError {
    /// Status text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            VerifyError::Reported { result, .. } => result
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| REPORTED_FAILURE_FALLBACK.to_string()),
            _ => CONNECTION_ISSUE_MESSAGE.to_string(),
        }
    }

    /// Payload that still deserves rendering, for reported failures.
    pub fn reported_result(&self) -> Option<&VerificationResult> {
        match self {
            VerifyError::Reported { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Anything that can turn a frame into a verification result.
pub trait Verifier {
    fn submit_frame(
        &self,
        frame: &FrameSample,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<VerificationResult, VerifyError>>;
}

/// HTTP client for the verification endpoint.
#[derive(Debug, Clone)]
pub struct VerificationClient {
    endpoint: String,
    http_client: reqwest::Client,
}

impl VerificationClient {
    /// Client with the default request timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, VerifyError> {
        Self::with_timeout(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VerifyError> {
        let endpoint = endpoint.into();
        reqwest::Url::parse(&endpoint).map_err(|e| VerifyError::InvalidEndpoint {
            url: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(VerifyError::Client)?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one frame and classify the answer.
    ///
    /// # Errors
    ///
    /// `Transport` when no response arrives, `Reported` for a non-2xx status
    /// whose body parses, `Malformed` for any body that does not parse.
    pub async fn submit(
        &self,
        frame: &FrameSample,
        credentials: &Credentials,
    ) -> Result<VerificationResult, VerifyError> {
        let body = FrameRequest {
            image: &frame.image,
            email: credentials.identity(),
            token: credentials.token(),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(VerifyError::Transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(VerifyError::Transport)?;

        match serde_json::from_slice::<VerificationResult>(&bytes) {
            Ok(result) if status.is_success() => Ok(result),
            Ok(result) => Err(VerifyError::Reported {
                status: status.as_u16(),
                result: Box::new(result),
            }),
            Err(e) => {
                log::debug!("Unparseable verification response ({}): {}", status, e);
                Err(VerifyError::Malformed {
                    status: status.as_u16(),
                })
            }
        }
    }
}

impl Verifier for VerificationClient {
    fn submit_frame(
        &self,
        frame: &FrameSample,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<VerificationResult, VerifyError>> {
        self.submit(frame, credentials)
    }
}
