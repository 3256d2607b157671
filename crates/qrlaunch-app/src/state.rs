//! Application state (Model in TEA pattern)

use url::Url;

use qrlaunch_core::{DeepLinkBuilder, Platform};

use crate::config::Settings;
use crate::expiry::ExpiryTimer;
use crate::launch::LaunchCoordinator;
use crate::reconcile::ReturnReconciler;
use crate::session::SessionState;
use crate::storage::{MemoryNonceStore, NonceStore};

/// Lifecycle of the engine itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppPhase {
    #[default]
    Running,
    Quitting,
}

/// Complete application state
pub struct AppState {
    pub phase: AppPhase,

    /// Current token, session id and freshness
    pub session: SessionState,

    pub expiry: ExpiryTimer,

    pub launch: LaunchCoordinator,

    pub links: DeepLinkBuilder,

    pub reconciler: ReturnReconciler,

    /// Platform family of the hosting browser
    pub platform: Platform,

    pub settings: Settings,

    /// Per-tab storage holding the pending launch nonce
    pub(crate) store: Box<dyn NonceStore>,

    /// Last status hint from the server
    pub last_status: Option<String>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("phase", &self.phase)
            .field("session", &self.session)
            .field("expiry", &self.expiry)
            .field("launch", &self.launch)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        settings: Settings,
        page_url: Url,
        platform: Platform,
        store: Box<dyn NonceStore>,
    ) -> Self {
        Self {
            phase: AppPhase::Running,
            session: SessionState::new(),
            expiry: ExpiryTimer::new(settings.expiry.window()),
            launch: LaunchCoordinator::new(),
            links: DeepLinkBuilder::new(page_url),
            reconciler: ReturnReconciler::new(settings.storage.nonce_key.clone()),
            platform,
            settings,
            store,
            last_status: None,
        }
    }

    /// State backed by an in-memory store
    pub fn in_memory(settings: Settings, page_url: Url, platform: Platform) -> Self {
        Self::new(settings, page_url, platform, Box::new(MemoryNonceStore::new()))
    }

    /// Nonce currently held in per-tab storage
    pub fn stored_nonce(&self) -> Option<String> {
        self.store.get(self.reconciler.key())
    }

    pub fn should_quit(&self) -> bool {
        self.phase == AppPhase::Quitting
    }
}
