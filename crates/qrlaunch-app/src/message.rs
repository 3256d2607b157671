//! Message types for the application (TEA pattern)
//!
//! Three kinds of trigger feed the loop: push-channel events, user actions
//! reported by the presentation layer, and timer wake-ups. Each is handled
//! to completion before the next one is taken.

use qrlaunch_core::PushEvent;

/// All possible messages/actions in the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Engine started: request initial data and check the page fragment
    Startup,

    // ─────────────────────────────────────────────────────────
    // Push Channel
    // ─────────────────────────────────────────────────────────
    /// Inbound event from the push channel
    Push(PushEvent),

    /// The push channel reconnected after a drop
    ChannelReconnected,

    /// The push channel gave up
    ChannelDisconnected,

    // ─────────────────────────────────────────────────────────
    // User Actions
    // ─────────────────────────────────────────────────────────
    /// "Continue in app" pressed
    ContinueInApp,

    /// Confirmation dialog accepted
    LaunchConfirmed,

    /// Confirmation dialog declined
    LaunchCancelled,

    /// User asked for more time on the QR code
    ExtendSession,

    /// Install link in the fallback dialog chosen
    InstallApp,

    /// Fallback, success or error dialog closed
    DismissFallback,

    /// The page address changed and now carries `fragment`
    ReturnSignal { fragment: String },

    // ─────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────
    /// Countdown refresh
    Tick,

    /// Expiry wake-up scheduled for `generation`
    ExpiryElapsed { generation: u64 },

    /// Fallback timer for the launch with `nonce` fired
    FallbackElapsed { nonce: String },

    /// Force quit (stdin closed, Ctrl+C)
    Quit,
}
