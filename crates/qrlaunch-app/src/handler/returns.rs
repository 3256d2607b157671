//! Return-from-app reconciliation

use qrlaunch_core::prelude::*;

use crate::reconcile::{strip_fragment, ReconcileOutcome};
use crate::services::Presentation;
use crate::state::AppState;

use super::{UpdateAction, UpdateResult};

/// The page address changed. Runs in the same serialized loop as the
/// fallback handler, so the two can never both win.
pub fn handle_return(state: &mut AppState, fragment: &str) -> UpdateResult {
    let outcome = state
        .reconciler
        .reconcile(fragment, state.store.as_mut());

    match outcome {
        ReconcileOutcome::Matched { nonce } if state.launch.is_settled(&nonce) => {
            // Only reachable when clearing the stored nonce failed earlier
            let key = state.reconciler.key().to_string();
            if let Err(e) = state.store.remove(&key) {
                warn!("Failed to clear settled launch nonce: {}", e);
            }
            UpdateResult::none().with_flow_error(FlowError::StaleReturn)
        }
        ReconcileOutcome::Matched { nonce } => {
            let mut result = UpdateResult::action(UpdateAction::ReplaceLocation {
                url: strip_fragment(state.links.page_url()).to_string(),
            });

            if state.launch.resolve(&nonce).is_some() {
                info!("App returned; launch resolved");
                result = result.with_action(UpdateAction::CancelFallback { nonce });
            } else {
                info!("App returned to a reloaded page; launch resolved");
                state.launch.mark_resolved(&nonce);
            }

            result.with_action(UpdateAction::Present(Presentation::LaunchSucceeded))
        }
        ReconcileOutcome::Unmatched => UpdateResult::none().with_flow_error(FlowError::StaleReturn),
        ReconcileOutcome::NotApplicable => UpdateResult::none(),
    }
}
