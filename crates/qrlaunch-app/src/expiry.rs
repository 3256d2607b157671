//! Local countdown against session freshness
//!
//! The timer itself never fires anything; the engine schedules a wake-up
//! for the deadline and feeds it back as `Message::ExpiryElapsed`. Each
//! counting phase is tagged with the session generation that started it so
//! a wake-up from an older generation is recognised as stale.

use std::time::Duration;

use tokio::time::Instant;

/// Default freshness window for a QR token
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPhase {
    /// No token has been accepted yet
    #[default]
    Idle,
    /// Counting down towards `deadline`
    Counting { generation: u64, deadline: Instant },
    /// The window for `generation` ran out with no intervening update
    Expired { generation: u64 },
}

#[derive(Debug, Clone)]
pub struct ExpiryTimer {
    window: Duration,
    phase: ExpiryPhase,
}

impl Default for ExpiryTimer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ExpiryTimer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            phase: ExpiryPhase::Idle,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn phase(&self) -> ExpiryPhase {
        self.phase
    }

    /// Start a full window from `issued_at`. Valid from every phase.
    ///
    /// A window too large to represent never runs out.
    pub fn restart(&mut self, generation: u64, issued_at: Instant) {
        let deadline = issued_at
            .checked_add(self.window)
            .unwrap_or_else(|| far_future(issued_at));
        self.phase = ExpiryPhase::Counting {
            generation,
            deadline,
        };
    }

    /// Remaining time as seen at `now`. Zero unless counting.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.phase {
            ExpiryPhase::Counting { deadline, .. } => deadline.saturating_duration_since(now),
            _ => Duration::ZERO,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    /// Move to `Expired` if the deadline has passed. Returns true on the
    /// transition only.
    pub fn check(&mut self, now: Instant) -> bool {
        match self.phase {
            ExpiryPhase::Counting {
                generation,
                deadline,
            } if now >= deadline => {
                self.phase = ExpiryPhase::Expired { generation };
                true
            }
            _ => false,
        }
    }

    /// Handle a scheduled wake-up for `generation`.
    ///
    /// Returns true only when the timer was counting for that exact
    /// generation; wake-ups left over from earlier generations are ignored.
    pub fn expire_generation(&mut self, generation: u64) -> bool {
        match self.phase {
            ExpiryPhase::Counting {
                generation: current,
                ..
            } if current == generation => {
                self.phase = ExpiryPhase::Expired { generation };
                true
            }
            _ => false,
        }
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.phase, ExpiryPhase::Counting { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.phase, ExpiryPhase::Expired { .. })
    }
}

/// Roughly thirty years past `from`, the same horizon tokio uses for
/// unbounded sleeps.
fn far_future(from: Instant) -> Instant {
    const HORIZON: Duration = Duration::from_secs(86_400 * 365 * 30);
    from.checked_add(HORIZON).unwrap_or(from)
}

/// Whole seconds for display, rounded up so the countdown reaches zero
/// only at expiry.
pub fn display_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
