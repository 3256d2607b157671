//! Configuration types for qrlaunch
//!
//! Defines `Settings` (`.qrlaunch/config.toml`) and its sections. Every field
//! has a default so an empty or partial file is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use qrlaunch_core::prelude::*;

/// Upper bound for `expiry.window_secs` (one day)
pub const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Upper bound for `expiry.tick_ms` and `launch.fallback_delay_ms` (ten minutes)
pub const MAX_DELAY_MS: u64 = 10 * 60 * 1000;

/// Application settings (.qrlaunch/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub page: PageSettings,

    #[serde(default)]
    pub channel: ChannelSettings,

    #[serde(default)]
    pub launch: LaunchSettings,

    #[serde(default)]
    pub expiry: ExpirySettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl Settings {
    /// Reject values that would make the flow unusable.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_SECS).contains(&self.expiry.window_secs) {
            return Err(Error::config_invalid(format!(
                "expiry.window_secs must be between 1 and {MAX_WINDOW_SECS}"
            )));
        }
        if !(1..=MAX_DELAY_MS).contains(&self.expiry.tick_ms) {
            return Err(Error::config_invalid(format!(
                "expiry.tick_ms must be between 1 and {MAX_DELAY_MS}"
            )));
        }
        if !(1..=MAX_DELAY_MS).contains(&self.launch.fallback_delay_ms) {
            return Err(Error::config_invalid(format!(
                "launch.fallback_delay_ms must be between 1 and {MAX_DELAY_MS}"
            )));
        }
        if self.storage.nonce_key.is_empty() {
            return Err(Error::config_invalid("storage.nonce_key must not be empty"));
        }
        Ok(())
    }
}

/// Login page settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PageSettings {
    /// Address of the login page; the return URL is built from it
    #[serde(default)]
    pub url: Option<String>,
}

/// Push channel settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChannelSettings {
    /// WebSocket URL of the push channel
    #[serde(default)]
    pub url: Option<String>,
}

/// Launch behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LaunchSettings {
    /// How long to wait for the app to hand back before showing the
    /// install fallback
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,

    /// Ask before navigating away to the app
    #[serde(default = "default_true")]
    pub confirm_before_launch: bool,

    /// Append `&t=<unix millis>` to the launch URI
    #[serde(default)]
    pub cache_bust: bool,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            fallback_delay_ms: default_fallback_delay_ms(),
            confirm_before_launch: true,
            cache_bust: false,
        }
    }
}

impl LaunchSettings {
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

/// Countdown settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExpirySettings {
    /// Token freshness window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Countdown refresh interval in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Request renewal automatically when the window runs out
    #[serde(default)]
    pub auto_renew: bool,
}

impl Default for ExpirySettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            tick_ms: default_tick_ms(),
            auto_renew: false,
        }
    }
}

impl ExpirySettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Per-tab nonce storage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Key under which the pending nonce is stored
    #[serde(default = "default_nonce_key")]
    pub nonce_key: String,

    /// Directory for the file-backed store (defaults to the user data dir)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            nonce_key: default_nonce_key(),
            dir: None,
        }
    }
}

fn default_fallback_delay_ms() -> u64 {
    3000
}

fn default_window_secs() -> u64 {
    30
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_nonce_key() -> String {
    crate::storage::DEFAULT_NONCE_KEY.to_string()
}

fn default_true() -> bool {
    true
}
