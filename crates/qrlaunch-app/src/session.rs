//! QR session state: the single source of truth for the current token
//!
//! Only the push-ingestion handler mutates this; everything else works from
//! [`SessionState::snapshot`] copies or the read accessors.

use tokio::time::Instant;

use qrlaunch_core::{extract, SessionFields};

/// Result of feeding one push message into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Freshness advanced; `generation` is the new counter value
    Accepted { generation: u64, token_changed: bool },
    /// Nothing usable arrived and no token is held yet
    Ignored,
}

/// Current autostart token, session id and freshness
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    token: Option<String>,
    session_id: Option<String>,
    issued_at: Option<Instant>,
    generation: u64,
    raw_payload: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one push message.
    ///
    /// A non-empty direct token wins over one derived from the raw payload.
    /// The update is accepted whenever a usable token is held afterwards,
    /// even if the token did not change: acceptance bumps `generation` and
    /// resets `issued_at`. A session id is recorded either way.
    pub fn update(&mut self, fields: &SessionFields, now: Instant) -> UpdateOutcome {
        if let Some(raw) = &fields.raw_payload {
            self.raw_payload = Some(raw.clone());
        }

        if let Some(session_id) = fields.session_id.as_ref().filter(|id| !id.is_empty()) {
            self.session_id = Some(session_id.clone());
        }

        let direct = fields
            .direct_token
            .as_ref()
            .filter(|token| !token.is_empty())
            .cloned();
        let candidate = direct.or_else(|| {
            fields
                .raw_payload
                .as_deref()
                .and_then(|raw| extract(raw).into_token())
        });

        let token_changed = match candidate {
            Some(token) if self.token.as_deref() != Some(token.as_str()) => {
                self.token = Some(token);
                true
            }
            _ => false,
        };

        if !self.has_token() {
            return UpdateOutcome::Ignored;
        }

        self.generation += 1;
        self.issued_at = Some(now);
        UpdateOutcome::Accepted {
            generation: self.generation,
            token_changed,
        }
    }

    /// Read-only copy for components that must not hold a reference into
    /// the live state.
    pub fn snapshot(&self) -> SessionState {
        self.clone()
    }

    /// True iff a non-empty token is held.
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn issued_at(&self) -> Option<Instant> {
        self.issued_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last raw QR payload, kept for diagnostics
    pub fn raw_payload(&self) -> Option<&str> {
        self.raw_payload.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn raw(payload: &str) -> SessionFields {
        SessionFields {
            raw_payload: Some(payload.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_has_no_token() {
        let session = SessionState::new();
        assert!(!session.has_token());
        assert_eq!(session.generation(), 0);
        assert_eq!(session.issued_at(), None);
    }

    #[test]
    fn test_structured_payload_sets_token_and_session() {
        let mut session = SessionState::new();
        let now = Instant::now();
        let outcome = session.update(
            &SessionFields {
                raw_payload: Some("bankid.TOK123.3.sig".into()),
                session_id: Some("S1".into()),
                ..Default::default()
            },
            now,
        );

        assert_eq!(
            outcome,
            UpdateOutcome::Accepted {
                generation: 1,
                token_changed: true
            }
        );
        assert_eq!(session.token(), Some("TOK123"));
        assert_eq!(session.session_id(), Some("S1"));
        assert_eq!(session.raw_payload(), Some("bankid.TOK123.3.sig"));
        assert_eq!(session.issued_at(), Some(now));
    }

    #[test]
    fn test_direct_token_takes_precedence() {
        let mut session = SessionState::new();
        session.update(
            &SessionFields {
                raw_payload: Some("bankid.FROMQR.3.sig".into()),
                direct_token: Some("DIRECT".into()),
                session_id: None,
            },
            Instant::now(),
        );
        assert_eq!(session.token(), Some("DIRECT"));
    }

    #[test]
    fn test_empty_direct_token_falls_back_to_payload() {
        let mut session = SessionState::new();
        session.update(
            &SessionFields {
                raw_payload: Some("bankid.FROMQR.3.sig".into()),
                direct_token: Some(String::new()),
                session_id: None,
            },
            Instant::now(),
        );
        assert_eq!(session.token(), Some("FROMQR"));
    }

    #[test]
    fn test_same_token_still_bumps_generation() {
        let mut session = SessionState::new();
        let t0 = Instant::now();
        session.update(&raw("TOK"), t0);
        let t1 = t0 + Duration::from_secs(5);
        let outcome = session.update(&raw("TOK"), t1);

        assert_eq!(
            outcome,
            UpdateOutcome::Accepted {
                generation: 2,
                token_changed: false
            }
        );
        assert_eq!(session.issued_at(), Some(t1));
    }

    #[test]
    fn test_empty_payload_before_any_token_is_ignored() {
        let mut session = SessionState::new();
        assert_eq!(session.update(&raw(""), Instant::now()), UpdateOutcome::Ignored);
        assert_eq!(session.generation(), 0);
        assert!(!session.has_token());
    }

    #[test]
    fn test_session_id_only_before_token_is_recorded_but_ignored() {
        let mut session = SessionState::new();
        let outcome = session.update(
            &SessionFields {
                session_id: Some("S1".into()),
                ..Default::default()
            },
            Instant::now(),
        );
        assert_eq!(outcome, UpdateOutcome::Ignored);
        assert_eq!(session.session_id(), Some("S1"));
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_empty_payload_keeps_existing_token() {
        let mut session = SessionState::new();
        session.update(&raw("TOK"), Instant::now());
        let outcome = session.update(&raw(""), Instant::now());

        assert!(matches!(outcome, UpdateOutcome::Accepted { generation: 2, .. }));
        assert_eq!(session.token(), Some("TOK"));
    }

    #[test]
    fn test_generation_counts_accepted_updates() {
        let mut session = SessionState::new();
        let inputs = ["", "A", "bankid.B.1.s", "", "C", "C"];
        let mut accepted = 0;
        let mut last = 0;
        for input in inputs {
            if let UpdateOutcome::Accepted { generation, .. } =
                session.update(&raw(input), Instant::now())
            {
                accepted += 1;
                assert!(generation > last);
                last = generation;
            }
            if session.generation() > 0 {
                assert!(session.has_token());
            }
        }
        assert_eq!(session.generation(), accepted);
        assert_eq!(accepted, 5);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut session = SessionState::new();
        session.update(&raw("A"), Instant::now());
        let snapshot = session.snapshot();
        session.update(&raw("B"), Instant::now());

        assert_eq!(snapshot.token(), Some("A"));
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(session.token(), Some("B"));
    }
}
