//! Push-channel ingestion

use tokio::time::Instant;

use qrlaunch_core::prelude::*;
use qrlaunch_core::PushEvent;

use crate::expiry::display_secs;
use crate::services::Presentation;
use crate::session::UpdateOutcome;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// Apply one inbound event. Presentation-only content (QR image, status) is
/// forwarded whether or not the session accepts the update.
pub fn handle_push(state: &mut AppState, event: PushEvent) -> UpdateResult {
    let mut result = UpdateResult::none();

    if let Some(image) = event.qr_image() {
        result = result.with_action(UpdateAction::Present(Presentation::QrImage {
            image: image.to_string(),
        }));
    }

    if let Some(status) = event.status() {
        if state.last_status.as_deref() != Some(status) {
            state.last_status = Some(status.to_string());
            result = result.with_action(UpdateAction::Present(Presentation::Status {
                status: status.to_string(),
            }));
        }
    }

    let fields = event.to_session_fields();
    if fields.is_empty() {
        debug!("'{}' carried no session fields", event.name());
        return result;
    }

    let now = Instant::now();
    match state.session.update(&fields, now) {
        UpdateOutcome::Accepted {
            generation,
            token_changed,
        } => {
            debug!(
                "Accepted '{}' as generation {} (token changed: {})",
                event.name(),
                generation,
                token_changed
            );
            state.expiry.restart(generation, now);
            let window = state.expiry.window();
            result
                .with_action(UpdateAction::ScheduleExpiry {
                    generation,
                    after: window,
                })
                .with_action(UpdateAction::Present(Presentation::Countdown {
                    remaining_secs: display_secs(window),
                }))
        }
        UpdateOutcome::Ignored => {
            debug!("'{}' carried no usable token", event.name());
            result
        }
    }
}

pub fn handle_disconnected(state: &mut AppState) -> UpdateResult {
    warn!(
        "Push channel disconnected; holding generation {}",
        state.session.generation()
    );
    UpdateResult::none()
}
