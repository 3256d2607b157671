//! Return-trip validation
//!
//! When the app hands control back, the page address carries
//! `#nonce=<value>`. A return only counts if that value equals the nonce
//! stored at launch time; a match consumes the stored nonce so the same
//! return can never resolve twice.

use url::Url;

use qrlaunch_core::prelude::*;
use qrlaunch_core::{decode_component, NONCE_FRAGMENT_KEY};

use crate::storage::{NonceStore, DEFAULT_NONCE_KEY};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Candidate equals the stored nonce; the stored nonce has been cleared
    Matched { nonce: String },
    /// Candidate present but different, or nothing stored
    Unmatched,
    /// The fragment carries no `nonce=` marker
    NotApplicable,
}

/// Pull the candidate nonce out of a URL fragment.
///
/// Accepts the fragment with or without its leading `#`. The value runs to
/// the next `&` and is percent-decoded.
pub fn nonce_from_fragment(fragment: &str) -> Option<String> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let marker = format!("{NONCE_FRAGMENT_KEY}=");
    fragment.split('&').find_map(|pair| {
        pair.strip_prefix(marker.as_str())
            .map(decode_component)
    })
}

/// Address with the fragment removed, for an in-place history replace.
pub fn strip_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

#[derive(Debug, Clone)]
pub struct ReturnReconciler {
    key: String,
}

impl Default for ReturnReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_KEY)
    }
}

impl ReturnReconciler {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Storage key holding the pending nonce
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn reconcile(&self, fragment: &str, store: &mut dyn NonceStore) -> ReconcileOutcome {
        let Some(candidate) = nonce_from_fragment(fragment) else {
            return ReconcileOutcome::NotApplicable;
        };

        match store.get(&self.key) {
            Some(stored) if !stored.is_empty() && stored == candidate => {
                if let Err(e) = store.remove(&self.key) {
                    // The in-memory launch state still resolves exactly once
                    warn!("Failed to clear stored nonce: {}", e);
                }
                ReconcileOutcome::Matched { nonce: candidate }
            }
            _ => ReconcileOutcome::Unmatched,
        }
    }
}
