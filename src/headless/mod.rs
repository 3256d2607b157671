//! Headless mode - NDJSON event output
//!
//! The headless runner stands in for a browser page. Everything the engine
//! would show or do to the page is written to stdout as one JSON object per
//! line; user actions (and, without a live channel, server pushes) are read
//! from stdin.
//!
//! # Example Output
//!
//! ```json
//! {"event":"started","platform":"desktop","page_url":"https://bank.example.se/login","timestamp":1704700001000}
//! {"event":"request","name":"request_qr_data","timestamp":1704700001001}
//! {"event":"present","kind":"countdown","remaining_secs":30,"timestamp":1704700002000}
//! {"event":"navigate","uri":"bankid:///?autostarttoken=...","timestamp":1704700003000}
//! ```

pub mod commands;
pub mod runner;

use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use qrlaunch_app::{Navigator, Presentation, Presenter, PushSender};
use qrlaunch_core::{OutboundRequest, Platform};

/// Events emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Engine is up
    Started {
        platform: Platform,
        page_url: String,
        timestamp: i64,
    },

    /// Something the page would render
    Present {
        #[serde(flatten)]
        presentation: Presentation,
        timestamp: i64,
    },

    /// The page would navigate away
    Navigate { uri: String, timestamp: i64 },

    /// The page would rewrite its address in place
    ReplaceLocation { url: String, timestamp: i64 },

    /// Outbound request, printed when no live push channel is attached
    Request {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn started(platform: Platform, page_url: &str) -> Self {
        Self::Started {
            platform,
            page_url: page_url.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn present(presentation: &Presentation) -> Self {
        Self::Present {
            presentation: presentation.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn navigate(uri: &str) -> Self {
        Self::Navigate {
            uri: uri.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn replace_location(url: &str) -> Self {
        Self::ReplaceLocation {
            url: url.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn request(request: &OutboundRequest) -> Self {
        Self::Request {
            name: request.name().to_string(),
            data: request.payload(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: String, fatal: bool) -> Self {
        Self::Error {
            message,
            fatal,
            timestamp: Self::now(),
        }
    }
}

/// Presenter writing NDJSON to stdout
#[derive(Debug, Default)]
pub struct StdoutPresenter;

impl Presenter for StdoutPresenter {
    fn present(&mut self, presentation: &Presentation) {
        HeadlessEvent::present(presentation).emit();
    }
}

/// Navigator writing NDJSON to stdout
#[derive(Debug, Default)]
pub struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn navigate(&mut self, uri: &str) {
        HeadlessEvent::navigate(uri).emit();
    }

    fn replace_location(&mut self, url: &str) {
        HeadlessEvent::replace_location(url).emit();
    }
}

/// Push sender used when no channel URL is configured
#[derive(Debug, Default)]
pub struct StdoutPushSender;

impl PushSender for StdoutPushSender {
    fn send(&self, request: OutboundRequest) -> qrlaunch_core::Result<()> {
        HeadlessEvent::request(&request).emit();
        Ok(())
    }
}
