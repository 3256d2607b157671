//! Configuration file parsing for qrlaunch
//!
//! Supports:
//! - `.qrlaunch/config.toml` - Global settings

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, CONFIG_FILENAME, QRLAUNCH_DIR};
pub use types::*;
