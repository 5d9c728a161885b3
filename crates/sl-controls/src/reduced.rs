//! Reduced-duty window.
//!
//! While the delta stays above `solar_off` the window is pushed forward every
//! tick. When the delta drops, the circuit keeps circulating at minimum duty
//! until the window expires, bridging short dips (a passing cloud) without
//! cycling the pump.

use std::time::{Duration, Instant};

/// Which branch of mode selection applies this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyBranch {
    /// Delta above `solar_off`: follow the flow curve.
    Modulate,
    /// Delta low but the window is still open: hold minimum duty.
    ReducedHold,
    /// Delta low and the window has expired: stop.
    Shutdown,
}

/// Deadline plus active flag for reduced mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedWindow {
    window: Duration,
    reduced_till: Option<Instant>,
    active: bool,
}

impl ReducedWindow {
    /// Create a closed window that will stay open for `window` once extended.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            reduced_till: None,
            active: false,
        }
    }

    /// Pick the branch for this tick.
    pub fn branch(&self, delta: f64, solar_off: f64, now: Instant) -> DutyBranch {
        if delta > solar_off {
            DutyBranch::Modulate
        } else if self.is_open(now) {
            DutyBranch::ReducedHold
        } else {
            DutyBranch::Shutdown
        }
    }

    /// Push the deadline to `now + window`.
    pub fn extend(&mut self, now: Instant) {
        self.reduced_till = Some(now + self.window);
    }

    /// Returns `true` if `now` is before the deadline.
    pub fn is_open(&self, now: Instant) -> bool {
        matches!(self.reduced_till, Some(till) if now < till)
    }

    /// Time left before the window closes.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.reduced_till
            .map(|till| till.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn clear(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(30 * 60);

    #[test]
    fn new_window_is_closed() {
        let now = Instant::now();
        let w = ReducedWindow::new(WINDOW);
        assert!(!w.is_open(now));
        assert_eq!(w.remaining(now), Duration::ZERO);
        assert_eq!(w.branch(3.0, 5.0, now), DutyBranch::Shutdown);
    }

    #[test]
    fn high_delta_always_modulates() {
        let now = Instant::now();
        let w = ReducedWindow::new(WINDOW);
        assert_eq!(w.branch(5.1, 5.0, now), DutyBranch::Modulate);
    }

    #[test]
    fn delta_equal_to_off_is_not_modulating() {
        let now = Instant::now();
        let mut w = ReducedWindow::new(WINDOW);
        w.extend(now);
        assert_eq!(w.branch(5.0, 5.0, now), DutyBranch::ReducedHold);
    }

    #[test]
    fn window_expires_exactly_at_deadline() {
        let t0 = Instant::now();
        let mut w = ReducedWindow::new(WINDOW);
        w.extend(t0);

        let just_before = t0 + WINDOW - Duration::from_secs(1);
        assert!(w.is_open(just_before));
        assert_eq!(w.remaining(just_before), Duration::from_secs(1));
        assert_eq!(w.branch(3.0, 5.0, just_before), DutyBranch::ReducedHold);

        let deadline = t0 + WINDOW;
        assert!(!w.is_open(deadline));
        assert_eq!(w.branch(3.0, 5.0, deadline), DutyBranch::Shutdown);
    }

    #[test]
    fn extend_pushes_deadline_forward() {
        let t0 = Instant::now();
        let mut w = ReducedWindow::new(WINDOW);
        w.extend(t0);
        let later = t0 + Duration::from_secs(600);
        w.extend(later);
        assert!(w.is_open(t0 + WINDOW + Duration::from_secs(1)));
        assert_eq!(w.remaining(later), WINDOW);
    }

    #[test]
    fn active_flag_toggles() {
        let mut w = ReducedWindow::new(WINDOW);
        assert!(!w.is_active());
        w.activate();
        assert!(w.is_active());
        w.clear();
        assert!(!w.is_active());
    }
}
