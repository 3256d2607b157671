//! Message processing
//!
//! Runs one message, and any follow-up messages it produces, through the
//! TEA update function and executes the resulting actions in order.

use tokio::sync::mpsc;

use crate::actions::{handle_action, Services, TimerRegistry};
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message(
    state: &mut AppState,
    message: Message,
    services: &mut Services,
    timers: &mut TimerRegistry,
    msg_tx: &mpsc::Sender<Message>,
) {
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        for action in result.actions {
            handle_action(action, services, timers, msg_tx);
        }

        msg = result.message;
    }
}
