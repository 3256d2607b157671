//! # qrlaunch-core - Core Domain Types
//!
//! Foundation crate for qrlaunch. Provides the pure pieces of the QR login
//! flow: token extraction, platform classification, deep-link construction,
//! push-channel event types, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, regex, url, percent-encoding, tracing).
//!
//! ## Public API
//!
//! ### Tokens (`token`)
//! - [`extract()`] - Parse a raw QR payload into a [`TokenPayload`]
//!
//! ### Platforms (`platform`)
//! - [`Platform`] - iOS, Android or Desktop, with user-agent detection and install links
//!
//! ### Deep Links (`deep_link`)
//! - [`DeepLinkBuilder`] - Builds universal-link / custom-scheme launch URIs
//!
//! ### Events (`events`)
//! - [`PushEvent`] - Typed inbound push-channel events
//! - [`OutboundRequest`] - One-way requests sent back to the server
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Infrastructure errors with `fatal` vs `recoverable` classification
//! - [`FlowError`] - Non-fatal flow outcomes surfaced to the user
//!
//! ## Prelude
//!
//! ```rust
//! use qrlaunch_core::prelude::*;
//! ```

pub mod deep_link;
pub mod error;
pub mod events;
pub mod logging;
pub mod platform;
pub mod prelude;
pub mod token;

pub use deep_link::{decode_component, encode_component, DeepLinkBuilder, NONCE_FRAGMENT_KEY};
pub use error::{Error, FlowError, Result, ResultExt};
pub use events::{
    OutboundRequest, PushEvent, QrDataUpdate, QrImageUpdate, SessionFields, SessionIdUpdate,
};
pub use platform::Platform;
pub use token::{extract, TokenKind, TokenPayload};
