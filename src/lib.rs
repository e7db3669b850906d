//! blink-verify library crate.
//!
//! Camera capture, the verification client and the session state machine,
//! exposed for the binary and for integration testing.

pub mod camera;
pub mod cli;
pub mod config;
pub mod session;
