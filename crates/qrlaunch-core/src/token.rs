//! Autostart token extraction from raw QR payloads
//!
//! The server may hand us either an already-extracted token or the full
//! animated-QR string, which has the shape `bankid.<token>.<time>.<auth code>`.

use serde::{Deserialize, Serialize};

/// Literal first segment of a structured BankID QR payload.
pub const STRUCTURED_QR_MARKER: &str = "bankid";

/// Minimum number of dot-separated segments in a structured payload.
const STRUCTURED_QR_MIN_PARTS: usize = 4;

/// How the token was obtained from the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// The payload is used verbatim as the token
    RawToken,
    /// Token taken from the second segment of a `bankid.` payload
    StructuredQr,
}

/// Result of parsing a raw QR payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub kind: TokenKind,
    pub token: String,
}

impl TokenPayload {
    /// An empty token means "no token available".
    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    /// Consume the payload, yielding the token only if it is usable.
    pub fn into_token(self) -> Option<String> {
        if self.token.is_empty() {
            None
        } else {
            Some(self.token)
        }
    }
}

/// Parse a raw QR payload into a token.
///
/// Never fails. Strings that are not a structured BankID payload are
/// returned unchanged as a [`TokenKind::RawToken`], including the empty
/// string.
pub fn extract(raw: &str) -> TokenPayload {
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() >= STRUCTURED_QR_MIN_PARTS && parts[0] == STRUCTURED_QR_MARKER {
        return TokenPayload {
            kind: TokenKind::StructuredQr,
            token: parts[1].to_string(),
        };
    }

    TokenPayload {
        kind: TokenKind::RawToken,
        token: raw.to_string(),
    }
}
