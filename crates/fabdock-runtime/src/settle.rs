#![forbid(unsafe_code)]

//! Layout-settle timing: a named synchronization point for "act after the
//! host's layout has stopped moving".
//!
//! Zone occupancy decisions need on-screen rectangles, and a rectangle
//! read mid-CSS-transition does not match the eventual resting position.
//! The protocol is therefore always: force the final visual state, wait
//! one frame plus the transition duration, then measure. [`SettleTimer`]
//! is that wait as an explicit, testable unit (instead of an anonymous
//! timeout buried in a callback).

use std::time::{Duration, Instant};

/// One host frame. The deadline always includes at least this much, so a
/// zero-duration transition still waits for the next layout pass.
pub const FRAME: Duration = Duration::from_millis(16);

/// A one-shot deadline polled from `tick`.
///
/// `fire` returns `true` exactly once per arming, the first time it is
/// polled at or past the deadline. Re-arming before the deadline replaces
/// it.
#[derive(Debug, Default)]
pub struct SettleTimer {
    deadline: Option<Instant>,
}

impl SettleTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for `now + FRAME + transition`.
    pub fn arm(&mut self, now: Instant, transition: Duration) {
        self.deadline = Some(now + FRAME + transition);
    }

    /// Whether a deadline is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Poll the deadline. Consumes it when it fires.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending deadline.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_200: Duration = Duration::from_millis(200);

    #[test]
    fn fires_once_after_frame_plus_transition() {
        let mut timer = SettleTimer::new();
        let t = Instant::now();
        timer.arm(t, MS_200);

        assert!(!timer.fire(t));
        assert!(!timer.fire(t + MS_200)); // frame not yet elapsed
        assert!(timer.fire(t + FRAME + MS_200));
        assert!(!timer.fire(t + FRAME + MS_200), "one-shot");
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut timer = SettleTimer::new();
        let t = Instant::now();
        timer.arm(t, Duration::ZERO);
        timer.arm(t + MS_200, MS_200);
        assert!(!timer.fire(t + FRAME));
        assert!(timer.fire(t + MS_200 + FRAME + MS_200));
    }

    #[test]
    fn cancel_discards_deadline() {
        let mut timer = SettleTimer::new();
        let t = Instant::now();
        timer.arm(t, Duration::ZERO);
        timer.cancel();
        assert!(!timer.fire(t + FRAME + MS_200));
    }
}
