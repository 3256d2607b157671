//! Collaborator seams: presentation, navigation and the push channel
//!
//! The engine never renders anything or touches a real browsing context; it
//! emits [`Presentation`]s and navigation requests through these traits.
//! User choices come back as ordinary [`crate::Message`]s.

use serde::Serialize;

use qrlaunch_channel::ChannelHandle;
use qrlaunch_core::prelude::*;
use qrlaunch_core::{OutboundRequest, Platform};

/// Something the presentation layer should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presentation {
    /// New QR image (base64 PNG)
    QrImage { image: String },
    /// Server progress hint
    Status { status: String },
    /// Countdown refresh
    Countdown { remaining_secs: u64 },
    /// The QR token ran out; offer to extend
    Expired,
    /// Ask the user before navigating to the app
    ConfirmLaunch { platform: Platform },
    /// Return from the app was validated
    LaunchSucceeded,
    /// Recoverable flow error
    Error { error: FlowError },
    /// The app did not hand back in time; offer the install link
    Fallback {
        platform: Platform,
        install_url: String,
    },
    /// Close whichever dialog is open
    Dismiss,
}

/// Renders presentations (dialogs, QR image, countdown)
#[cfg_attr(test, mockall::automock)]
pub trait Presenter: Send {
    fn present(&mut self, presentation: &Presentation);
}

/// Controls the browsing context
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send {
    /// Navigate away (to the app, or an install page)
    fn navigate(&mut self, uri: &str);

    /// Replace the visible address in place, without a reload
    fn replace_location(&mut self, url: &str);
}

/// Fire-and-forget requests to the push channel
#[cfg_attr(test, mockall::automock)]
pub trait PushSender: Send {
    fn send(&self, request: OutboundRequest) -> Result<()>;
}

impl PushSender for ChannelHandle {
    fn send(&self, request: OutboundRequest) -> Result<()> {
        if !self.is_connected() {
            // Held in the command queue until the connection is back
            debug!(
                "Queueing '{}' while push channel is {:?}",
                request.name(),
                self.connection_state()
            );
        }
        ChannelHandle::send(self, request)
    }
}
