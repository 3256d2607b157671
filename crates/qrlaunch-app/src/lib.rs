//! qrlaunch-app - QR session lifecycle state machine and orchestration
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the QR
//! login flow: push messages, user actions and timer wake-ups become
//! [`Message`]s, [`handler::update`] turns them into state changes plus
//! [`UpdateAction`]s, and the [`Engine`] carries the actions out through the
//! collaborator traits in [`services`].

pub mod actions;
pub mod config;
pub mod engine;
pub mod expiry;
pub mod handler;
pub mod launch;
pub mod message;
pub mod process;
pub mod reconcile;
pub mod services;
pub mod session;
pub mod signals;
pub mod state;
pub mod storage;

// Re-export primary types
pub use actions::{Services, TimerRegistry};
pub use config::Settings;
pub use engine::Engine;
pub use expiry::{ExpiryPhase, ExpiryTimer};
pub use handler::{UpdateAction, UpdateResult};
pub use launch::{LaunchAttempt, LaunchCoordinator, LaunchPhase, LaunchStart};
pub use message::Message;
pub use reconcile::{ReconcileOutcome, ReturnReconciler};
pub use services::{Navigator, Presentation, Presenter, PushSender};
pub use session::{SessionState, UpdateOutcome};
pub use state::{AppPhase, AppState};
pub use storage::{generate_nonce, FileNonceStore, MemoryNonceStore, NonceStore};
