//! Milestone aggregation and display text.
//!
//! Everything here is derived from a single [`VerificationResult`]; nothing
//! is remembered between ticks. Completion only moves forward as long as the
//! endpoint never clears a milestone it already reported.

use super::client::VerificationResult;

pub const OPEN_WEIGHT: u8 = 34;
pub const CLOSED_WEIGHT: u8 = 33;
pub const REOPEN_WEIGHT: u8 = 33;
pub const MAX_COMPLETION: u8 = 100;

/// Status text when the endpoint sends no message.
pub const DEFAULT_STATUS: &str = "Processing frame...";

/// EAR text when no numeric reading is available.
pub const EAR_PLACEHOLDER: &str = "--";

/// Completion percentage for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// 0..=100
    pub completion: u8,
}

impl ProgressSnapshot {
    /// `"N%"`, used as the progress bar width and its label.
    pub fn width_style(&self) -> String {
        format!("{}%", self.completion)
    }
}

/// Everything the UI sink shows after a response.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub status: String,
    pub open_label: String,
    pub closed_label: String,
    pub ear: String,
    pub progress: ProgressSnapshot,
}

/// 34·open + 33·closed + 33·reopen, clamped to 100.
pub fn compute_completion(result: &VerificationResult) -> u8 {
    let mut completion: u16 = 0;
    if result.open_milestone() {
        completion += u16::from(OPEN_WEIGHT);
    }
    if result.closed_milestone() {
        completion += u16::from(CLOSED_WEIGHT);
    }
    if result.reopen_milestone() {
        completion += u16::from(REOPEN_WEIGHT);
    }
    completion.min(u16::from(MAX_COMPLETION)) as u8
}

pub fn snapshot(result: &VerificationResult) -> ProgressSnapshot {
    ProgressSnapshot {
        completion: compute_completion(result),
    }
}

/// Format an EAR reading to three decimals.
pub fn format_ear(ear: Option<f64>) -> String {
    match ear {
        Some(value) if value.is_finite() => format!("EAR: {:.3}", value),
        _ => format!("EAR: {}", EAR_PLACEHOLDER),
    }
}

fn capture_label(name: &str, captured: bool) -> String {
    format!("{}: {}", name, if captured { "captured" } else { "pending" })
}

pub fn render_status(result: &VerificationResult) -> StatusView {
    let status = result
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_STATUS)
        .to_string();

    StatusView {
        status,
        open_label: capture_label("Open-eye", result.open_captured),
        closed_label: capture_label("Closed-eye", result.closed_captured),
        ear: format_ear(result.ear),
        progress: snapshot(result),
    }
}
