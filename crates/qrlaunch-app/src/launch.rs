//! "Continue in app" launch attempts
//!
//! The coordinator tracks at most one unresolved [`LaunchAttempt`]. Whether
//! the app opened can only be inferred: either a matching return arrives
//! ([`LaunchCoordinator::resolve`]) or the fallback timer fires first
//! ([`LaunchCoordinator::fallback_elapsed`]). Both consume the attempt, so
//! whichever runs second finds nothing and has no effect.

use std::collections::HashSet;

use tokio::time::Instant;

use qrlaunch_core::{FlowError, Platform};

use crate::session::SessionState;

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchPhase {
    #[default]
    Idle,
    /// Confirmation dialog is showing
    Confirming,
    /// User confirmed; fresh data requested
    Requested,
    /// Navigated to the app, fallback armed
    Launched,
    /// Matching return arrived first
    Resolved,
    /// Fallback fired first
    FallbackShown,
}

/// One navigation to the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAttempt {
    pub nonce: String,
    pub generation_at_launch: u64,
    pub platform: Platform,
    pub fired_at: Instant,
    pub resolved: bool,
}

/// What the caller needs to carry out a launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStart {
    pub attempt: LaunchAttempt,
    /// Token captured at launch time
    pub token: String,
    /// Prior unresolved attempt, whose fallback must be cancelled
    pub superseded: Option<LaunchAttempt>,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchCoordinator {
    phase: LaunchPhase,
    pending: Option<LaunchAttempt>,
    /// Nonces whose outcome was decided during this page's lifetime
    settled: HashSet<String>,
}

impl LaunchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    /// The unresolved attempt, if any
    pub fn pending(&self) -> Option<&LaunchAttempt> {
        self.pending.as_ref()
    }

    pub fn request_confirmation(&mut self) {
        self.phase = LaunchPhase::Confirming;
    }

    /// User declined the confirmation dialog. A pending attempt is left alone.
    pub fn cancel(&mut self) {
        if self.phase == LaunchPhase::Confirming {
            self.phase = self.resting_phase();
        }
    }

    pub fn is_confirming(&self) -> bool {
        self.phase == LaunchPhase::Confirming
    }

    pub fn confirm(&mut self) {
        self.phase = LaunchPhase::Requested;
    }

    /// True once the attempt with `nonce` resolved or fell back. Its outcome
    /// is final even if the stored nonce could not be cleared.
    pub fn is_settled(&self, nonce: &str) -> bool {
        self.settled.contains(nonce)
    }

    /// Create a new attempt from the current session.
    ///
    /// Fails with [`FlowError::NoToken`] when the session holds no usable
    /// token; no attempt is created and the phase returns to idle (or to
    /// `Launched` if an earlier attempt is still in flight).
    pub fn launch(
        &mut self,
        session: &SessionState,
        platform: Platform,
        nonce: String,
        now: Instant,
    ) -> Result<LaunchStart, FlowError> {
        let token = match session.token() {
            Some(token) if session.has_token() => token.to_string(),
            _ => {
                self.phase = self.resting_phase();
                return Err(FlowError::NoToken);
            }
        };

        let attempt = LaunchAttempt {
            nonce,
            generation_at_launch: session.generation(),
            platform,
            fired_at: now,
            resolved: false,
        };
        let superseded = self.pending.replace(attempt.clone());
        self.phase = LaunchPhase::Launched;

        Ok(LaunchStart {
            attempt,
            token,
            superseded,
        })
    }

    /// Matching return arrived. Returns the attempt only if it was still
    /// pending under that nonce.
    pub fn resolve(&mut self, nonce: &str) -> Option<LaunchAttempt> {
        let mut attempt = self.take_pending(nonce)?;
        attempt.resolved = true;
        self.settled.insert(attempt.nonce.clone());
        self.phase = LaunchPhase::Resolved;
        Some(attempt)
    }

    /// Fallback timer fired. Returns the attempt only if it is still
    /// pending; a fallback for a superseded or resolved attempt yields
    /// `None`.
    pub fn fallback_elapsed(&mut self, nonce: &str) -> Option<LaunchAttempt> {
        let attempt = self.take_pending(nonce)?;
        self.settled.insert(attempt.nonce.clone());
        self.phase = LaunchPhase::FallbackShown;
        Some(attempt)
    }

    /// Fallback dialog dismissed, or a success message acknowledged
    pub fn dismiss(&mut self) {
        if matches!(
            self.phase,
            LaunchPhase::FallbackShown | LaunchPhase::Resolved
        ) {
            self.phase = LaunchPhase::Idle;
        }
    }

    /// Mark the flow resolved when a stored nonce matched but no in-memory
    /// attempt exists (the page was reloaded while the app was open).
    pub fn mark_resolved(&mut self, nonce: &str) {
        self.settled.insert(nonce.to_string());
        self.pending = None;
        self.phase = LaunchPhase::Resolved;
    }

    fn take_pending(&mut self, nonce: &str) -> Option<LaunchAttempt> {
        match &self.pending {
            Some(attempt) if attempt.nonce == nonce => self.pending.take(),
            _ => None,
        }
    }

    fn resting_phase(&self) -> LaunchPhase {
        if self.pending.is_some() {
            LaunchPhase::Launched
        } else {
            LaunchPhase::Idle
        }
    }
}
