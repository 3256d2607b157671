//! Application error types with rich context

use serde::Serialize;
use thiserror::Error;

use crate::platform::Platform;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure error types organized by layer
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // ─────────────────────────────────────────────────────────────
    // Push Channel Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Push channel error: {message}")]
    Channel { message: String },

    #[error("Push channel protocol error: {message}")]
    Protocol { message: String },

    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Nonce storage error: {message}")]
    Storage { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Channel { .. }
                | Error::Protocol { .. }
                | Error::ChannelSend { .. }
                | Error::Storage { .. }
        )
    }

    /// Check if this error should abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigInvalid { .. } | Error::Url(_)
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Flow Outcomes
// ─────────────────────────────────────────────────────────────────

/// Non-fatal outcomes of the QR login flow.
///
/// None of these abort anything: the worst case is that the user has to
/// rescan or retry. They only ever reach the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowError {
    /// Launch was requested before any usable autostart token arrived.
    #[error("No BankID data available. Please scan the QR code again.")]
    NoToken,

    /// The fallback timer fired before the app handed control back.
    #[error("The BankID app could not be opened on {platform}")]
    LaunchNotConfirmed { platform: Platform },

    /// A return nonce that does not belong to the current launch.
    #[error("Ignoring return signal that does not match the pending launch")]
    StaleReturn,
}

impl FlowError {
    /// Whether the presentation layer should show this to the user.
    ///
    /// Stale returns may be left over from another tab or an older session
    /// and must never disrupt the current one.
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, FlowError::StaleReturn)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions (for use with color-eyre)
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
