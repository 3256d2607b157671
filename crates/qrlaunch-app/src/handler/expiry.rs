//! Countdown, expiry and renewal handlers

use tokio::time::Instant;

use qrlaunch_core::prelude::*;
use qrlaunch_core::OutboundRequest;

use crate::expiry::display_secs;
use crate::message::Message;
use crate::services::Presentation;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Request initial data once, then reconcile whatever fragment the page was
/// loaded with.
pub fn handle_startup(state: &mut AppState) -> UpdateResult {
    let result = UpdateResult::action(UpdateAction::Send(OutboundRequest::InitialData));
    match state.links.page_url().fragment() {
        Some(fragment) if !fragment.is_empty() => UpdateResult {
            message: Some(Message::ReturnSignal {
                fragment: fragment.to_string(),
            }),
            ..result
        },
        _ => result,
    }
}

/// The server forgets our subscription across a reconnect.
pub fn handle_reconnected(_state: &mut AppState) -> UpdateResult {
    info!("Push channel reconnected; requesting QR data");
    UpdateResult::action(UpdateAction::Send(OutboundRequest::InitialData))
}

pub fn handle_tick(state: &mut AppState) -> UpdateResult {
    if !state.expiry.is_counting() {
        return UpdateResult::none();
    }

    let now = Instant::now();
    if state.expiry.check(now) {
        return expired(state);
    }

    UpdateResult::present(Presentation::Countdown {
        remaining_secs: display_secs(state.expiry.remaining_at(now)),
    })
}

/// Scheduled wake-up. Ignored unless it belongs to the current generation.
pub fn handle_elapsed(state: &mut AppState, generation: u64) -> UpdateResult {
    if state.expiry.expire_generation(generation) {
        expired(state)
    } else {
        debug!("Stale expiry wake-up for generation {}", generation);
        UpdateResult::none()
    }
}

pub fn handle_extend(state: &mut AppState) -> UpdateResult {
    info!("Renewal requested by user");
    UpdateResult::action(renewal(state))
}

fn expired(state: &mut AppState) -> UpdateResult {
    info!("QR generation {} expired", state.session.generation());
    let result = UpdateResult::present(Presentation::Expired);
    if state.settings.expiry.auto_renew {
        result.with_action(renewal(state))
    } else {
        result
    }
}

fn renewal(state: &AppState) -> UpdateAction {
    UpdateAction::Send(OutboundRequest::Renewal {
        session_id: state.session.session_id().map(str::to_string),
    })
}
