//! Engine - shared orchestration for the QR login flow
//!
//! Owns the state, the message channel, the collaborator services and the
//! timers. Frontends (the headless runner, tests) construct an `Engine`,
//! feed it user actions through [`Engine::msg_sender`] and drive
//! [`Engine::run`] or [`Engine::process_message`].

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use qrlaunch_channel::ChannelEvent;
use qrlaunch_core::prelude::*;

use crate::actions::{Services, TimerRegistry};
use crate::message::Message;
use crate::process;
use crate::state::AppState;

const MSG_CHANNEL_CAPACITY: usize = 256;

pub struct Engine {
    pub state: AppState,

    msg_tx: mpsc::Sender<Message>,

    /// Exposed so frontends can interleave their own work with message
    /// handling, as the headless runner does.
    pub msg_rx: mpsc::Receiver<Message>,

    services: Services,

    timers: TimerRegistry,

    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn new(state: AppState, services: Services) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(MSG_CHANNEL_CAPACITY);
        Self {
            state,
            msg_tx,
            msg_rx,
            services,
            timers: TimerRegistry::new(),
            tasks: Vec::new(),
        }
    }

    /// Sender for user actions and other external triggers
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    pub fn process_message(&mut self, message: Message) {
        process::process_message(
            &mut self.state,
            message,
            &mut self.services,
            &mut self.timers,
            &self.msg_tx,
        );
    }

    /// Request initial data, reconcile the page fragment and start the
    /// countdown ticker.
    pub fn start(&mut self) {
        info!("Engine starting on {}", self.state.platform);
        self.process_message(Message::Startup);
        self.spawn_ticker();
    }

    fn spawn_ticker(&mut self) {
        let interval = self.state.settings.expiry.tick_interval();
        let msg_tx = self.msg_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if msg_tx.send(Message::Tick).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Forward push-channel events into the message loop.
    pub fn attach_channel(&mut self, mut events: mpsc::Receiver<ChannelEvent>) {
        let msg_tx = self.msg_tx.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let message = match event {
                    ChannelEvent::Push(push) => Message::Push(push),
                    ChannelEvent::Reconnected => Message::ChannelReconnected,
                    ChannelEvent::Disconnected => Message::ChannelDisconnected,
                };
                if msg_tx.send(message).await.is_err() {
                    break;
                }
            }
            debug!("Push channel event stream ended");
        }));
    }

    /// Process messages until quit is requested or every sender is gone.
    pub async fn run(&mut self) {
        while !self.should_quit() {
            match self.msg_rx.recv().await {
                Some(message) => self.process_message(message),
                None => {
                    info!("Message channel closed");
                    break;
                }
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Number of fallback timers still waiting to fire
    pub fn pending_fallbacks(&self) -> usize {
        self.timers.pending_fallbacks()
    }

    pub async fn shutdown(&mut self) {
        self.timers.cancel_all();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Engine stopped");
    }
}
