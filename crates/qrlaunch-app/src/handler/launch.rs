//! Launch handlers: confirmation, navigation to the app, fallback

use tokio::time::Instant;

use qrlaunch_core::prelude::*;
use qrlaunch_core::OutboundRequest;

use crate::services::Presentation;
use crate::state::AppState;
use crate::storage::generate_nonce;

use super::{UpdateAction, UpdateResult};

/// "Continue in app": ask first, or go straight to the launch.
pub fn handle_continue(state: &mut AppState) -> UpdateResult {
    if state.settings.launch.confirm_before_launch {
        state.launch.request_confirmation();
        UpdateResult::present(Presentation::ConfirmLaunch {
            platform: state.platform,
        })
    } else {
        handle_confirmed_with_nonce(state, generate_nonce())
    }
}

pub fn handle_cancelled(state: &mut AppState) -> UpdateResult {
    state.launch.cancel();
    UpdateResult::present(Presentation::Dismiss)
}

/// The user confirmed: request fresh data, then launch with whatever the
/// session holds right now. Only answers an open confirmation dialog.
pub fn handle_confirmed(state: &mut AppState) -> UpdateResult {
    if !state.launch.is_confirming() {
        debug!("Ignoring confirmation with no dialog open ({:?})", state.launch.phase());
        return UpdateResult::none();
    }
    handle_confirmed_with_nonce(state, generate_nonce())
}

pub(crate) fn handle_confirmed_with_nonce(state: &mut AppState, nonce: String) -> UpdateResult {
    state.launch.confirm();
    let mut result = UpdateResult::action(UpdateAction::Send(OutboundRequest::FreshData));

    let start = match state
        .launch
        .launch(&state.session, state.platform, nonce, Instant::now())
    {
        Ok(start) => start,
        Err(error) => {
            warn!("Launch refused: {}", error);
            return result.with_flow_error(error);
        }
    };

    if let Some(prior) = start.superseded {
        debug!("Superseding launch {}", prior.nonce);
        result = result.with_action(UpdateAction::CancelFallback { nonce: prior.nonce });
    }

    let key = state.reconciler.key().to_string();
    if let Err(e) = state.store.set(&key, &start.attempt.nonce) {
        warn!("Failed to persist launch nonce: {}", e);
    }

    let mut uri = state
        .links
        .build(state.platform, &start.token, &start.attempt.nonce);
    if state.settings.launch.cache_bust {
        uri.push_str(&format!("&t={}", chrono::Utc::now().timestamp_millis()));
    }

    info!(
        "Launching app on {} (generation {})",
        start.attempt.platform, start.attempt.generation_at_launch
    );

    result
        .with_action(UpdateAction::Navigate { uri })
        .with_action(UpdateAction::ArmFallback {
            nonce: start.attempt.nonce,
            delay: state.settings.launch.fallback_delay(),
        })
}

/// The fallback fired. Only the still-pending attempt shows the dialog.
pub fn handle_fallback_elapsed(state: &mut AppState, nonce: &str) -> UpdateResult {
    let Some(attempt) = state.launch.fallback_elapsed(nonce) else {
        debug!("Fallback for {} already decided", nonce);
        return UpdateResult::none();
    };

    // A return arriving after this point must not resolve the attempt
    let key = state.reconciler.key().to_string();
    if let Err(e) = state.store.remove(&key) {
        warn!("Failed to clear launch nonce: {}", e);
    }

    let error = FlowError::LaunchNotConfirmed {
        platform: attempt.platform,
    };
    info!("{}", error);
    UpdateResult::present(Presentation::Fallback {
        platform: attempt.platform,
        install_url: attempt.platform.install_url().to_string(),
    })
}

pub fn handle_install(state: &mut AppState) -> UpdateResult {
    state.launch.dismiss();
    UpdateResult::actions(vec![
        UpdateAction::Navigate {
            uri: state.platform.install_url().to_string(),
        },
        UpdateAction::Present(Presentation::Dismiss),
    ])
}

pub fn handle_dismiss(state: &mut AppState) -> UpdateResult {
    state.launch.dismiss();
    UpdateResult::present(Presentation::Dismiss)
}
