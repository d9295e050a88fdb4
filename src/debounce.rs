//! Time-window debounce filter.
//!
//! An edge is admitted only if at least `window_ms` have elapsed since the
//! last *admitted* edge.  Rejected edges leave no trace, so a bouncing
//! contact cannot keep pushing the window forward.
//!
//! ```text
//!  admitted          rejected   rejected          admitted
//!     │                 │          │                 │
//!  ───┼─────────────────┼──────────┼─────────────────┼────▶ t
//!     t0                                       t0 + window
//! ```
//!
//! The lower bound is closed: an edge at exactly `t0 + window` is admitted.

/// Debounce window state.  Pure logic, no clock of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceWindow {
    window_ms: u64,
    last_accepted_at: Option<u64>,
}

impl DebounceWindow {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms: u64::from(window_ms),
            last_accepted_at: None,
        }
    }

    /// Decide whether an edge observed at `now_ms` passes the filter.
    /// On admission the window restarts at `now_ms`.
    pub fn admit(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_accepted_at {
            // A clock that steps backwards reads as zero elapsed.
            if now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
        }
        self.last_accepted_at = Some(now_ms);
        true
    }

    /// Milliseconds since the last admitted edge, if any.
    pub fn elapsed_since_accept(&self, now_ms: u64) -> Option<u64> {
        self.last_accepted_at.map(|last| now_ms.saturating_sub(last))
    }

    pub fn last_accepted_at(&self) -> Option<u64> {
        self.last_accepted_at
    }
}
