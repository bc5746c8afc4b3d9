//! Local typing debounce.
//!
//! Every keystroke pushes the deadline out by the full timeout. When the
//! deadline passes with no further keystroke, the session emits
//! `typing=false` once. The timer is a single deadline, replaced on each
//! keystroke, never stacked.

use std::{ops::Add, time::Duration};

/// Quiet period after the last keystroke before `typing=false` is sent.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1500);

/// Deadline-based debounce timer.
#[derive(Debug, Clone)]
pub struct TypingDebounce<I> {
    timeout: Duration,
    deadline: Option<I>,
}

impl<I> TypingDebounce<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Idle timer with the given quiet period.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, deadline: None }
    }

    /// Keystroke at `now`. Replaces any pending deadline.
    pub fn touch(&mut self, now: I) {
        self.deadline = Some(now + self.timeout);
    }

    /// Fire if the deadline has passed. Returns `true` exactly once per quiet
    /// period.
    pub fn poll(&mut self, now: I) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            },
            _ => false,
        }
    }

    /// Drop the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Pending deadline. `None` when idle.
    pub fn deadline(&self) -> Option<I> {
        self.deadline
    }
}
