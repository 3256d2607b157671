//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `push`: Push-channel ingestion (the only path that mutates the session)
//! - `launch`: Confirmation, launch and fallback handlers
//! - `returns`: Return-from-app reconciliation
//! - `expiry`: Countdown, expiry and renewal handlers

pub(crate) mod expiry;
pub(crate) mod launch;
pub(crate) mod push;
pub(crate) mod returns;
pub(crate) mod update;


use std::time::Duration;

use qrlaunch_core::prelude::*;
use qrlaunch_core::OutboundRequest;

use crate::message::Message;
use crate::services::Presentation;

// Re-export main entry point
pub use update::update;

/// Actions that the event loop should perform after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Fire-and-forget request on the push channel
    Send(OutboundRequest),

    /// Hand something to the presentation layer
    Present(Presentation),

    /// Navigate the browsing context away (app or install page)
    Navigate { uri: String },

    /// Rewrite the visible address without a reload
    ReplaceLocation { url: String },

    /// Start the fallback timer for a launch attempt
    ArmFallback { nonce: String, delay: Duration },

    /// Cancel the fallback timer for a launch attempt
    CancelFallback { nonce: String },

    /// Schedule the expiry wake-up for a session generation, replacing any
    /// earlier one
    ScheduleExpiry { generation: u64, after: Duration },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Optional follow-up message to process
    pub message: Option<Message>,
    /// Actions for the event loop to perform, in order
    pub actions: Vec<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn message(msg: Message) -> Self {
        Self {
            message: Some(msg),
            actions: Vec::new(),
        }
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            message: None,
            actions: vec![action],
        }
    }

    pub fn actions(actions: Vec<UpdateAction>) -> Self {
        Self {
            message: None,
            actions,
        }
    }

    pub fn present(presentation: Presentation) -> Self {
        Self::action(UpdateAction::Present(presentation))
    }

    pub fn with_action(mut self, action: UpdateAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Present a flow error, unless it is one the user never sees.
    pub fn with_flow_error(self, error: FlowError) -> Self {
        if error.is_surfaced() {
            self.with_action(UpdateAction::Present(Presentation::Error { error }))
        } else {
            debug!("{}", error);
            self
        }
    }
}
