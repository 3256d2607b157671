//! # qrlaunch-channel - Push Channel Transport
//!
//! Connects to the server's push channel over WebSocket, turns text frames
//! into typed [`PushEvent`](qrlaunch_core::PushEvent)s and writes outbound
//! requests back.
//!
//! Depends on [`qrlaunch_core`] for event types and error handling.
//!
//! ## Public API
//!
//! ### Client
//! - [`PushChannelClient`] - Owns the WebSocket connection and its background task
//! - [`ChannelHandle`] - Clonable, non-blocking sender for outbound requests
//! - [`ChannelEvent`] - Push events and connection changes
//!
//! ### Protocol
//! - [`parse_push_message()`] - Parse one `{"event", "data"}` frame
//! - [`encode_request()`] - Serialize an outbound request

pub mod client;
pub mod protocol;

pub use client::{
    ChannelEvent, ChannelHandle, ConnectionState, DetachedRequests, PushChannelClient,
};
pub use protocol::{encode_request, parse_push_message, ChannelMessage};
