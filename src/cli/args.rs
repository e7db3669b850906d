//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::session::Credentials;

/// Capture webcam frames and verify a live blink against a remote endpoint
#[derive(Parser, Debug)]
#[command(name = "blink-verify")]
#[command(version, about = "Blink liveness check from the webcam", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Verify against the default local endpoint
    blink-verify --email user@example.com --token abc123

    # Custom endpoint, slower polling
    blink-verify run --email user@example.com --token abc123 \\
        --endpoint https://verify.example/process_frame --interval-ms 500

    # List available cameras
    blink-verify list-cameras")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one verification session (the default)
    Run(RunArgs),
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Create default config file
    Init,
}

/// Options for a verification session. Anything left unset comes from the
/// config file or the environment.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Identity the session is verified for
    #[arg(long)]
    pub email: Option<String>,

    /// Session token issued by the verification service
    #[arg(long)]
    pub token: Option<String>,

    /// Verification endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Page the outcome is sent to
    #[arg(long)]
    pub result_url: Option<String>,

    /// Milliseconds between submitted frames
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Camera device index (from list-cameras)
    #[arg(long)]
    pub camera: Option<u32>,

    /// Do not mirror the camera image
    #[arg(long)]
    pub no_mirror: bool,
}

impl RunArgs {
    /// Overlay command-line values on a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.endpoint {
            config.endpoint.url = url.clone();
        }
        if let Some(url) = &self.result_url {
            config.endpoint.result_url = url.clone();
        }
        if let Some(ms) = self.interval_ms {
            config.session.frame_interval_ms = ms;
        }
        if let Some(device) = self.camera {
            config.camera.device = device;
        }
        if self.no_mirror {
            config.camera.mirror = false;
        }
    }

    /// Both `--email` and `--token` are needed to start a session.
    pub fn credentials(&self) -> Result<Credentials, String> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "--email is required to start a session".to_string())?;
        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "--token is required to start a session".to_string())?;
        Ok(Credentials::new(email, token))
    }
}
