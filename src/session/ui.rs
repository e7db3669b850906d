//! UI sink and outcome navigation collaborators.

use reqwest::Url;

use super::controller::Outcome;
use super::progress::StatusView;

/// Default page the user is sent to when the session ends.
pub const DEFAULT_RESULT_URL: &str = "http://localhost:5000/result";

/// Receives display updates from the controller.
pub trait UiSink {
    /// Replace the status line only.
    fn show_status(&mut self, text: &str);

    /// Full refresh after a response: status, labels, EAR and progress.
    fn show_progress(&mut self, view: &StatusView);
}

/// Receives the terminal outcome exactly once per session.
pub trait Navigator {
    fn navigate(&mut self, outcome: Outcome);
}

/// Draw a `[####------]` bar for a completion percentage.
pub fn render_bar(completion: u8, width: usize) -> String {
    let filled = (usize::from(completion.min(100)) * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Writes one line per update to stderr.
///
/// Format: `[#####-----]  50% | Open-eye: captured | Closed-eye: pending | EAR: 0.281 | status`
#[derive(Debug, Clone)]
pub struct ConsoleUi {
    bar_width: usize,
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self { bar_width: 20 }
    }

    pub fn format(&self, view: &StatusView) -> String {
        format!(
            "{} {:>4} | {} | {} | {} | {}",
            render_bar(view.progress.completion, self.bar_width),
            view.progress.width_style(),
            view.open_label,
            view.closed_label,
            view.ear,
            view.status,
        )
    }
}

impl UiSink for ConsoleUi {
    fn show_status(&mut self, text: &str) {
        eprintln!("{}", text);
    }

    fn show_progress(&mut self, view: &StatusView) {
        eprintln!("{}", self.format(view));
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid result URL '{url}': {reason}")]
pub struct InvalidResultUrl {
    pub url: String,
    pub reason: String,
}

/// Turns the outcome into `<result_url>?status=<outcome>`.
#[derive(Debug, Clone)]
pub struct ResultNavigator {
    base: Url,
    destination: Option<Url>,
}

impl ResultNavigator {
    pub fn new(result_url: &str) -> Result<Self, InvalidResultUrl> {
        let base = Url::parse(result_url).map_err(|e| InvalidResultUrl {
            url: result_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base,
            destination: None,
        })
    }

    /// Result URL for `outcome`, with the value percent-encoded.
    pub fn result_url(&self, outcome: Outcome) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("status", outcome.as_str());
        url
    }

    /// Where the last `navigate` call pointed, if any.
    pub fn destination(&self) -> Option<&Url> {
        self.destination.as_ref()
    }
}

impl Navigator for ResultNavigator {
    fn navigate(&mut self, outcome: Outcome) {
        let url = self.result_url(outcome);
        log::info!("Session finished ({}), redirecting to {}", outcome, url);
        self.destination = Some(url);
    }
}
