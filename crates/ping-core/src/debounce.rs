//! Last-writer-wins debounce timer.
//!
//! Holds at most one pending deadline. Re-arming replaces the deadline
//! instead of adding a second timer, so sustained activity defers expiry
//! indefinitely and a quiet period of at least `period` fires exactly once.

use std::time::Duration;

use crate::env::MonotonicInstant;

/// Single-deadline debounce timer.
#[derive(Debug, Clone)]
pub struct Debouncer<I: MonotonicInstant> {
    period: Duration,
    deadline: Option<I>,
}

impl<I: MonotonicInstant> Debouncer<I> {
    /// Create an idle debouncer.
    pub fn new(period: Duration) -> Self {
        Self { period, deadline: None }
    }

    /// Quiet period before the timer fires.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// (Re)start the timer at `now`.
    pub fn arm(&mut self, now: I) {
        self.deadline = Some(now + self.period);
    }

    /// Cancel the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether a deadline is pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, if any.
    pub fn deadline(&self) -> Option<I> {
        self.deadline
    }

    /// Returns `true` exactly once when `now` reaches the deadline.
    pub fn fire(&mut self, now: I) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use proptest::prelude::*;

    use super::*;

    const PERIOD: Duration = Duration::from_millis(1200);

    #[test]
    fn fires_once_after_quiet_period() {
        let start = Instant::now();
        let mut timer = Debouncer::new(PERIOD);
        timer.arm(start);

        assert!(!timer.fire(start + Duration::from_millis(1199)));
        assert!(timer.fire(start + PERIOD));
        assert!(!timer.fire(start + PERIOD * 2));
    }

    #[test]
    fn rearming_moves_deadline() {
        let start = Instant::now();
        let mut timer = Debouncer::new(PERIOD);
        timer.arm(start);
        timer.arm(start + Duration::from_millis(1000));

        assert!(!timer.fire(start + PERIOD));
        assert_eq!(timer.deadline(), Some(start + Duration::from_millis(2200)));
    }

    #[test]
    fn cancel_clears_pending() {
        let start = Instant::now();
        let mut timer = Debouncer::new(PERIOD);
        assert!(!timer.cancel());

        timer.arm(start);
        assert!(timer.cancel());
        assert!(!timer.fire(start + PERIOD));
    }

    proptest! {
        #[test]
        fn prop_fires_only_after_last_arm(gaps in prop::collection::vec(0u64..1200, 1..40)) {
            let start = Instant::now();
            let mut timer = Debouncer::new(PERIOD);
            let mut now = start;

            timer.arm(now);
            for gap in gaps {
                now += Duration::from_millis(gap);
                prop_assert!(!timer.fire(now));
                timer.arm(now);
            }

            prop_assert!(!timer.fire(now + Duration::from_millis(1199)));
            prop_assert!(timer.fire(now + PERIOD));
            prop_assert!(!timer.is_pending());
        }
    }
}
