//! Action handlers: UpdateAction dispatch and timer management

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use qrlaunch_core::prelude::*;

use crate::message::Message;
use crate::services::{Navigator, Presenter, PushSender};
use crate::UpdateAction;

/// External collaborators the engine drives
pub struct Services {
    pub push: Box<dyn PushSender>,
    pub presenter: Box<dyn Presenter>,
    pub navigator: Box<dyn Navigator>,
}

/// Cancelable timers owned by the engine.
///
/// Aborting a timer only prevents a wake-up that has not been queued yet.
/// One that already reached the message queue is filtered by the handlers,
/// which check the launch nonce or session generation it carries.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    fallbacks: HashMap<String, JoinHandle<()>>,
    expiry: Option<JoinHandle<()>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm_fallback(&mut self, nonce: String, delay: Duration, msg_tx: mpsc::Sender<Message>) {
        self.fallbacks.retain(|_, handle| !handle.is_finished());
        let message = Message::FallbackElapsed {
            nonce: nonce.clone(),
        };
        if let Some(previous) = self.fallbacks.insert(nonce, spawn_timer(delay, message, msg_tx)) {
            previous.abort();
        }
    }

    /// Returns true if a live timer was aborted.
    pub fn cancel_fallback(&mut self, nonce: &str) -> bool {
        match self.fallbacks.remove(nonce) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Replace the expiry wake-up; only the latest generation's matters.
    pub fn schedule_expiry(&mut self, generation: u64, after: Duration, msg_tx: mpsc::Sender<Message>) {
        let handle = spawn_timer(after, Message::ExpiryElapsed { generation }, msg_tx);
        if let Some(previous) = self.expiry.replace(handle) {
            previous.abort();
        }
    }

    pub fn pending_fallbacks(&self) -> usize {
        self.fallbacks
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.fallbacks.drain() {
            handle.abort();
        }
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

fn spawn_timer(after: Duration, message: Message, msg_tx: mpsc::Sender<Message>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if msg_tx.send(message).await.is_err() {
            debug!("Timer fired after the engine stopped");
        }
    })
}

/// Execute one action produced by the update function
pub fn handle_action(
    action: UpdateAction,
    services: &mut Services,
    timers: &mut TimerRegistry,
    msg_tx: &mpsc::Sender<Message>,
) {
    match action {
        UpdateAction::Send(request) => {
            let name = request.name();
            if let Err(e) = services.push.send(request) {
                // One-way signal; the flow carries on with what it has
                warn!("Failed to send '{}': {}", name, e);
            }
        }

        UpdateAction::Present(presentation) => {
            services.presenter.present(&presentation);
        }

        UpdateAction::Navigate { uri } => {
            services.navigator.navigate(&uri);
        }

        UpdateAction::ReplaceLocation { url } => {
            services.navigator.replace_location(&url);
        }

        UpdateAction::ArmFallback { nonce, delay } => {
            debug!("Arming fallback for {} ({:?})", nonce, delay);
            timers.arm_fallback(nonce, delay, msg_tx.clone());
        }

        UpdateAction::CancelFallback { nonce } => {
            if timers.cancel_fallback(&nonce) {
                debug!("Cancelled fallback for {}", nonce);
            }
        }

        UpdateAction::ScheduleExpiry { generation, after } => {
            timers.schedule_expiry(generation, after, msg_tx.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fallback_timer_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = TimerRegistry::new();
        timers.arm_fallback("n1".into(), Duration::from_secs(3), tx);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg, Message::FallbackElapsed { nonce: "n1".into() });
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fallback_never_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = TimerRegistry::new();
        timers.arm_fallback("n1".into(), Duration::from_secs(3), tx.clone());
        assert!(timers.cancel_fallback("n1"));
        assert!(!timers.cancel_fallback("n1"));
        assert_eq!(timers.pending_fallbacks(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_expiry_replaces_previous() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = TimerRegistry::new();
        timers.schedule_expiry(1, Duration::from_secs(30), tx.clone());
        tokio::time::sleep(Duration::from_secs(10)).await;
        timers.schedule_expiry(2, Duration::from_secs(30), tx);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg, Message::ExpiryElapsed { generation: 2 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut timers = TimerRegistry::new();
        timers.arm_fallback("a".into(), Duration::from_secs(1), tx.clone());
        timers.schedule_expiry(1, Duration::from_secs(1), tx);
        timers.cancel_all();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
