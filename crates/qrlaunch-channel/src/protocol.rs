//! Push-channel envelope handling
//!
//! Every frame on the wire is a JSON object `{"event": <name>, "data": {...}}`.
//! Requests we send use the same envelope; `data` is omitted when the
//! request has no payload.

use serde::{Deserialize, Serialize};

use qrlaunch_core::events::{EVENT_QR_DATA, EVENT_QR_IMAGE, EVENT_SESSION_UPDATE};
use qrlaunch_core::prelude::*;
use qrlaunch_core::{OutboundRequest, PushEvent};

/// A raw frame before the payload is typed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawEnvelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Outcome of parsing one text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// A push event we understand
    Event(PushEvent),
    /// Well-formed envelope with an event name we do not handle
    Unknown(String),
}

/// Parse one text frame from the push channel.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the frame is not a JSON envelope or the
/// payload does not match the event's shape.
pub fn parse_push_message(text: &str) -> Result<ChannelMessage> {
    let envelope: RawEnvelope = serde_json::from_str(text)
        .map_err(|e| Error::protocol(format!("invalid envelope: {e}")))?;

    // Servers sometimes send `qr_data` with no payload at all
    let data = match envelope.data {
        Some(serde_json::Value::Null) | None => serde_json::Value::Object(Default::default()),
        Some(value) => value,
    };

    let event = match envelope.event.as_str() {
        EVENT_QR_IMAGE => PushEvent::QrImage(typed(&envelope.event, data)?),
        EVENT_QR_DATA => PushEvent::QrData(typed(&envelope.event, data)?),
        EVENT_SESSION_UPDATE => PushEvent::SessionId(typed(&envelope.event, data)?),
        _ => return Ok(ChannelMessage::Unknown(envelope.event)),
    };

    Ok(ChannelMessage::Event(event))
}

fn typed<T: serde::de::DeserializeOwned>(event: &str, data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::protocol(format!("'{event}' payload: {e}")))
}

/// Serialize an outbound request into a text frame.
pub fn encode_request(request: &OutboundRequest) -> Result<String> {
    let envelope = RawEnvelope {
        event: request.name().to_string(),
        data: request.payload(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qr_image_event() {
        let text = r#"{"event":"update_qr_code_image","data":{"qr_image":"iVBOR","qrData":"bankid.TOK123.3.sig","session_id":"S1"}}"#;
        match parse_push_message(text).unwrap() {
            ChannelMessage::Event(PushEvent::QrImage(update)) => {
                assert_eq!(update.qr_image.as_deref(), Some("iVBOR"));
                assert_eq!(update.qr_code_data.as_deref(), Some("bankid.TOK123.3.sig"));
                assert_eq!(update.session_id.as_deref(), Some("S1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_qr_data_with_token() {
        let text = r#"{"event":"qr_data","data":{"token":"TOK"}}"#;
        match parse_push_message(text).unwrap() {
            ChannelMessage::Event(PushEvent::QrData(update)) => {
                assert_eq!(update.token.as_deref(), Some("TOK"));
                assert_eq!(update.qr_data, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_qr_data_without_payload() {
        let text = r#"{"event":"qr_data"}"#;
        assert!(matches!(
            parse_push_message(text).unwrap(),
            ChannelMessage::Event(PushEvent::QrData(_))
        ));

        let text = r#"{"event":"qr_data","data":null}"#;
        assert!(matches!(
            parse_push_message(text).unwrap(),
            ChannelMessage::Event(PushEvent::QrData(_))
        ));
    }

    #[test]
    fn test_parse_session_update() {
        let text = r#"{"event":"session_update","data":{"session_id":"S9"}}"#;
        match parse_push_message(text).unwrap() {
            ChannelMessage::Event(PushEvent::SessionId(update)) => {
                assert_eq!(update.session_id, "S9");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_session_update_requires_session_id() {
        let text = r#"{"event":"session_update","data":{}}"#;
        let err = parse_push_message(text).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_unknown_event_is_not_an_error() {
        let text = r#"{"event":"connect","data":{"sid":"x"}}"#;
        assert_eq!(
            parse_push_message(text).unwrap(),
            ChannelMessage::Unknown("connect".into())
        );
    }

    #[test]
    fn test_malformed_frame_is_protocol_error() {
        assert!(matches!(
            parse_push_message("not json").unwrap_err(),
            Error::Protocol { .. }
        ));
        assert!(matches!(
            parse_push_message(r#"{"data":{}}"#).unwrap_err(),
            Error::Protocol { .. }
        ));
    }

    #[test]
    fn test_encode_requests() {
        assert_eq!(
            encode_request(&OutboundRequest::InitialData).unwrap(),
            r#"{"event":"request_qr_data"}"#
        );
        assert_eq!(
            encode_request(&OutboundRequest::FreshData).unwrap(),
            r#"{"event":"request_fresh_qr_data"}"#
        );
        assert_eq!(
            encode_request(&OutboundRequest::Renewal {
                session_id: Some("S1".into())
            })
            .unwrap(),
            r#"{"event":"request_renewal","data":{"session_id":"S1"}}"#
        );
    }
}
