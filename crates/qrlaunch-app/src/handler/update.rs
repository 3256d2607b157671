//! Main update function - handles state transitions (TEA pattern)
//!
//! This is the dispatch table: every message kind maps to exactly one
//! handler in `push`, `launch`, `returns` or `expiry`.

use crate::message::Message;
use crate::state::{AppPhase, AppState};

use super::{expiry, launch, push, returns, UpdateResult};

/// Process a message and update state
/// Returns optional follow-up message and the actions to perform
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    match message {
        Message::Quit => {
            state.phase = AppPhase::Quitting;
            UpdateResult::none()
        }

        Message::Startup => expiry::handle_startup(state),

        // ─────────────────────────────────────────────────────────
        // Push Channel
        // ─────────────────────────────────────────────────────────
        Message::Push(event) => push::handle_push(state, event),
        Message::ChannelReconnected => expiry::handle_reconnected(state),
        Message::ChannelDisconnected => push::handle_disconnected(state),

        // ─────────────────────────────────────────────────────────
        // User Actions
        // ─────────────────────────────────────────────────────────
        Message::ContinueInApp => launch::handle_continue(state),
        Message::LaunchConfirmed => launch::handle_confirmed(state),
        Message::LaunchCancelled => launch::handle_cancelled(state),
        Message::InstallApp => launch::handle_install(state),
        Message::DismissFallback => launch::handle_dismiss(state),
        Message::ExtendSession => expiry::handle_extend(state),
        Message::ReturnSignal { fragment } => returns::handle_return(state, &fragment),

        // ─────────────────────────────────────────────────────────
        // Timers
        // ─────────────────────────────────────────────────────────
        Message::Tick => expiry::handle_tick(state),
        Message::ExpiryElapsed { generation } => expiry::handle_elapsed(state, generation),
        Message::FallbackElapsed { nonce } => launch::handle_fallback_elapsed(state, &nonce),
    }
}
