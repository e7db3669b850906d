//! Command-line interface definitions and helpers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction, RunArgs};
pub use commands::{describe_config, handle_config_action, list_cameras, write_default_config};
