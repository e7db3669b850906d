//! Subcommand handlers for list-cameras and config actions.

use std::path::{Path, PathBuf};

use super::args::ConfigAction;
use crate::camera;
use crate::config::{default_path, Config, DEFAULT_CONFIG_TOML};

/// List available cameras and print them to stdout.
pub fn list_cameras() {
    match camera::list_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("No cameras found.");
                println!();
                println!("Make sure your camera is connected and permissions are granted.");
            } else {
                println!("Available cameras:");
                for device in devices {
                    println!("  {}", device);
                }
                println!();
                println!("Use --camera <index> to select a camera.");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) {
    let path = config_path.map(PathBuf::from).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let mut config = match Config::load(Some(&path)) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = config.apply_env() {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }

            println!("Current configuration:");
            print!("{}", describe_config(&config));
            println!();
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
        }
        ConfigAction::Init => match write_default_config(&path) {
            Ok(()) => println!("Created config file: {}", path.display()),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Human-readable summary of the effective settings.
pub fn describe_config(config: &Config) -> String {
    format!(
        "  Endpoint: {}\n  Result page: {}\n  Request timeout: {}s\n  Frame interval: {}ms\n  Max consecutive failures: {}\n  Session timeout: {}s\n  Camera: {} ({}x{}, quality {}, mirror {})\n",
        config.endpoint.url,
        config.endpoint.result_url,
        config.endpoint.request_timeout_secs,
        config.session.frame_interval_ms,
        config.session.max_consecutive_failures,
        config.session.timeout_secs,
        config.camera.device,
        config.camera.width,
        config.camera.height,
        config.camera.jpeg_quality,
        if config.camera.mirror { "yes" } else { "no" },
    )
}

/// Write the commented default config. Refuses to overwrite an existing file.
pub fn write_default_config(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Err(format!(
            "Config file already exists: {}\nUse 'blink-verify config show' to view current settings.",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating config directory: {}", e))?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TOML)
        .map_err(|e| format!("Error writing config file: {}", e))
}
