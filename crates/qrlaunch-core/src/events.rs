//! Push-channel event definitions
//!
//! Inbound events carry QR images, raw QR payloads, pre-parsed tokens and
//! session ids. Outbound requests are one-way signals; any answer arrives
//! later as an ordinary inbound event.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Event names on the wire
// ─────────────────────────────────────────────────────────────────

pub const EVENT_QR_IMAGE: &str = "update_qr_code_image";
pub const EVENT_QR_DATA: &str = "qr_data";
pub const EVENT_SESSION_UPDATE: &str = "session_update";

pub const REQUEST_QR_DATA: &str = "request_qr_data";
pub const REQUEST_FRESH_QR_DATA: &str = "request_fresh_qr_data";
pub const REQUEST_RENEWAL: &str = "request_renewal";

/// `update_qr_code_image` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrImageUpdate {
    /// Base64 PNG of the QR code to display
    #[serde(default)]
    pub qr_image: Option<String>,

    /// Raw QR payload (`bankid.<token>.<time>.<code>` or a bare token)
    #[serde(default, alias = "qrData")]
    pub qr_code_data: Option<String>,

    /// Pre-parsed autostart token
    #[serde(default)]
    pub autostarttoken: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,
}

/// `qr_data` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrDataUpdate {
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default, rename = "qrData", alias = "qr_code_data")]
    pub qr_data: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,

    /// Server progress hint such as `waiting_for_scan`
    #[serde(default)]
    pub status: Option<String>,
}

/// `session_update` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdUpdate {
    pub session_id: String,
}

/// Typed inbound push event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    QrImage(QrImageUpdate),
    QrData(QrDataUpdate),
    SessionId(SessionIdUpdate),
}

impl PushEvent {
    /// Wire name of this event
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::QrImage(_) => EVENT_QR_IMAGE,
            PushEvent::QrData(_) => EVENT_QR_DATA,
            PushEvent::SessionId(_) => EVENT_SESSION_UPDATE,
        }
    }

    /// Normalize into the fields the session state consumes.
    pub fn to_session_fields(&self) -> SessionFields {
        match self {
            PushEvent::QrImage(update) => SessionFields {
                raw_payload: update.qr_code_data.clone(),
                direct_token: update.autostarttoken.clone(),
                session_id: update.session_id.clone(),
            },
            PushEvent::QrData(update) => SessionFields {
                raw_payload: update.qr_data.clone(),
                direct_token: update.token.clone(),
                session_id: update.session_id.clone(),
            },
            PushEvent::SessionId(update) => SessionFields {
                raw_payload: None,
                direct_token: None,
                session_id: Some(update.session_id.clone()),
            },
        }
    }

    /// QR image to render, if this event carries one
    pub fn qr_image(&self) -> Option<&str> {
        match self {
            PushEvent::QrImage(update) => update.qr_image.as_deref(),
            _ => None,
        }
    }

    /// Server status hint, if any
    pub fn status(&self) -> Option<&str> {
        match self {
            PushEvent::QrData(update) => update.status.as_deref(),
            _ => None,
        }
    }
}

/// The subset of a push event that feeds the session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFields {
    pub raw_payload: Option<String>,
    pub direct_token: Option<String>,
    pub session_id: Option<String>,
}

impl SessionFields {
    pub fn is_empty(&self) -> bool {
        self.raw_payload.is_none() && self.direct_token.is_none() && self.session_id.is_none()
    }
}

/// Outbound one-way requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRequest {
    /// Sent once on startup
    InitialData,
    /// Sent immediately before building a deep link
    FreshData,
    /// Sent on expiry or when the user extends the session
    Renewal { session_id: Option<String> },
}

impl OutboundRequest {
    /// Wire name of this request
    pub fn name(&self) -> &'static str {
        match self {
            OutboundRequest::InitialData => REQUEST_QR_DATA,
            OutboundRequest::FreshData => REQUEST_FRESH_QR_DATA,
            OutboundRequest::Renewal { .. } => REQUEST_RENEWAL,
        }
    }

    /// JSON payload, `None` for requests without one
    pub fn payload(&self) -> Option<serde_json::Value> {
        match self {
            OutboundRequest::Renewal {
                session_id: Some(id),
            } => Some(serde_json::json!({ "session_id": id })),
            _ => None,
        }
    }
}
