//! Configuration file handling for blink-verify.
//!
//! Loads `<config dir>/blink-verify/config.toml` (or a path given with
//! `--config`), then applies environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{FacingMode, Resolution};
use crate::session::{
    CaptureConstraints, SessionPolicy, DEFAULT_ENDPOINT, DEFAULT_FRAME_INTERVAL,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RESULT_URL, DEFAULT_SESSION_TIMEOUT,
};

/// Overrides `[session] frame_interval_ms`.
pub const FRAME_INTERVAL_ENV: &str = "FRAME_CAPTURE_INTERVAL_MS";

/// Overrides `[endpoint] url`.
pub const ENDPOINT_ENV: &str = "BLINK_VERIFY_ENDPOINT";

/// Overrides `[endpoint] result_url`.
pub const RESULT_URL_ENV: &str = "BLINK_VERIFY_RESULT_URL";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Verification endpoint receiving frames
    pub url: String,
    /// Page the outcome is sent to
    pub result_url: String,
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            result_url: DEFAULT_RESULT_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub frame_interval_ms: u64,
    pub max_consecutive_failures: u32,
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL.as_millis() as u64,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            timeout_secs: DEFAULT_SESSION_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: Resolution::QHD.width,
            height: Resolution::QHD.height,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            mirror: true,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns defaults if the file doesn't exist, an error if it can't be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse { path, source: e })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (the environment, in production).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(FRAME_INTERVAL_ENV) {
            self.session.frame_interval_ms =
                raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    field: FRAME_INTERVAL_ENV,
                    reason: format!("'{}' is not a whole number of milliseconds", raw),
                })?;
        }
        if let Some(url) = lookup(ENDPOINT_ENV) {
            self.endpoint.url = url;
        }
        if let Some(url) = lookup(RESULT_URL_ENV) {
            self.endpoint.result_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "session.frame_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.session.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "session.max_consecutive_failures",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.session.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Invalid {
                field: "camera.jpeg_quality",
                reason: format!("must be between 1 and 100, got {}", self.camera.jpeg_quality),
            });
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid {
                field: "camera.width/height",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.endpoint.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "endpoint.request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            frame_interval: Duration::from_millis(self.session.frame_interval_ms),
            max_consecutive_failures: self.session.max_consecutive_failures,
            timeout: Duration::from_secs(self.session.timeout_secs),
        }
    }

    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            facing: FacingMode::User,
            ideal: Resolution {
                width: self.camera.width,
                height: self.camera.height,
            },
            audio: false,
            device_index: self.camera.device,
            mirror: self.camera.mirror,
            jpeg_quality: self.camera.jpeg_quality,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoint.request_timeout_secs)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("blink-verify").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/blink-verify/config.toml")
        })
}

/// Contents written by `blink-verify config init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# blink-verify configuration

[endpoint]
# Verification endpoint receiving frames
url = "http://localhost:5000/process_frame"
# Page that receives ?status=verified|failed when the session ends
result_url = "http://localhost:5000/result"
# Per-request timeout in seconds
request_timeout_secs = 10

[session]
# Milliseconds between frames (FRAME_CAPTURE_INTERVAL_MS overrides)
frame_interval_ms = 200
# Consecutive request failures before giving up
max_consecutive_failures = 5
# Give up after this many seconds without a verdict
timeout_secs = 40

[camera]
# Camera device index (see `blink-verify list-cameras`)
device = 0
# Ideal capture size
width = 960
height = 540
# JPEG quality of submitted frames (1-100)
jpeg_quality = 85
# Mirror horizontally (selfie mode)
mirror = true
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nframe_interval_ms = 350\n\n[camera]\ndevice = 2").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.session.frame_interval_ms, 350);
        assert_eq!(config.session.max_consecutive_failures, 5);
        assert_eq!(config.camera.device, 2);
        assert_eq!(config.camera.width, 960);
        assert_eq!(config.endpoint.url, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_unparseable_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session\nframe_interval_ms = ").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (FRAME_INTERVAL_ENV, "500"),
            (ENDPOINT_ENV, "https://verify.example/process_frame"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.session.frame_interval_ms, 500);
        assert_eq!(config.endpoint.url, "https://verify.example/process_frame");
        assert_eq!(config.endpoint.result_url, DEFAULT_RESULT_URL);
    }

    #[test]
    fn test_bad_interval_env_is_error() {
        let mut config = Config::default();
        let result = config.apply_env_from(|key| {
            (key == FRAME_INTERVAL_ENV).then(|| "fast".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.session.frame_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_quality_out_of_range() {
        let mut config = Config::default();
        config.camera.jpeg_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("camera.jpeg_quality"));
    }

    #[test]
    fn test_policy_and_constraints() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy(), SessionPolicy::default());

        let constraints = config.constraints();
        assert_eq!(constraints, CaptureConstraints::default());
    }
}
