//! qrlaunch library
//!
//! Headless frontend for the QR login flow. The state machine itself lives
//! in `qrlaunch-app`; this crate only adapts it to stdin/stdout.

pub mod headless;

// Re-export main entry points
pub use headless::runner::{run_headless, HeadlessOptions};
