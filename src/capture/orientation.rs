//! Bounded orientation polling after a rotation notification.
//!
//! Platforms deliver the rotation notification before the interface
//! orientation they report has caught up. After a notification that did not
//! yet change the reported orientation, the adapter polls once per frame
//! interval until the orientation differs or the budget (frame rate × 2 s by
//! default) runs out.

use crate::capture::Orientation;
use std::time::{Duration, Instant};

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Not due yet, or no change observed; keep polling.
    Pending,
    /// The reported orientation moved away from the baseline.
    Changed(Orientation),
    /// Budget or deadline exhausted without a change.
    Expired,
}

/// Pending orientation check for one rotation notification.
#[derive(Debug, Clone)]
pub struct OrientationWatch {
    from: Orientation,
    interval: Duration,
    remaining_polls: u32,
    next_poll: Instant,
    deadline: Instant,
}

impl OrientationWatch {
    pub fn new(
        now: Instant,
        from: Orientation,
        interval: Duration,
        poll_budget: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            from,
            interval,
            remaining_polls: poll_budget.max(1),
            next_poll: now + interval,
            deadline: now + timeout,
        }
    }

    /// Orientation the watch compares against.
    pub fn baseline(&self) -> Orientation {
        self.from
    }

    pub fn remaining_polls(&self) -> u32 {
        self.remaining_polls
    }

    /// Check `current` if a poll is due at `now`.
    pub fn poll(&mut self, now: Instant, current: Orientation) -> WatchOutcome {
        if now < self.next_poll {
            return WatchOutcome::Pending;
        }
        if current != self.from {
            return WatchOutcome::Changed(current);
        }

        self.remaining_polls = self.remaining_polls.saturating_sub(1);
        if self.remaining_polls == 0 || now >= self.deadline {
            return WatchOutcome::Expired;
        }
        self.next_poll = now + self.interval;
        WatchOutcome::Pending
    }
}
