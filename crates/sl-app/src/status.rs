//! Operating status reported over HTTP.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sl_controls::{GuardKind, Mode, TickOutcome};

/// Serializable view of the status board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub mode: Mode,
    /// When the current mode was entered, as unix seconds.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub since: DateTime<Utc>,
    pub delta: Option<f64>,
    pub flow: Option<f64>,
    pub guard: Option<GuardKind>,
}

#[derive(Debug)]
struct Inner {
    view: StatusView,
    last_tick: Option<Instant>,
}

/// Latest tick results, shared between the control loop and the HTTP server.
#[derive(Debug)]
pub struct StatusBoard {
    inner: Mutex<Inner>,
}

impl StatusBoard {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                view: StatusView {
                    mode: Mode::Startup,
                    since: at,
                    delta: None,
                    flow: None,
                    guard: None,
                },
                last_tick: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enter `mode`. `since` only moves when the mode actually changes.
    pub fn set_mode(&self, mode: Mode, at: DateTime<Utc>) {
        let mut inner = self.lock();
        if inner.view.mode != mode {
            inner.view.mode = mode;
            inner.view.since = at;
        }
    }

    /// Record a successful tick.
    pub fn record(&self, outcome: &TickOutcome, now: Instant, at: DateTime<Utc>) {
        let mut inner = self.lock();
        if inner.view.mode != outcome.mode {
            inner.view.mode = outcome.mode;
            inner.view.since = at;
        }
        inner.view.delta = Some(outcome.delta);
        inner.view.flow = outcome.flow;
        inner.view.guard = outcome.guard;
        inner.last_tick = Some(now);
    }

    pub fn view(&self) -> StatusView {
        self.lock().view.clone()
    }

    pub fn mode(&self) -> Mode {
        self.lock().view.mode
    }

    /// Whether a tick completed within `timeout` of `now`.
    pub fn is_healthy(&self, now: Instant, timeout: Duration) -> bool {
        self.lock()
            .last_tick
            .is_some_and(|t| now.saturating_duration_since(t) < timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn outcome(mode: Mode) -> TickOutcome {
        TickOutcome {
            delta: 7.0,
            mode,
            flow: Some(2.4),
            guard: None,
        }
    }

    #[test]
    fn since_moves_only_on_mode_change() {
        let board = StatusBoard::new(at(100));
        let t0 = Instant::now();
        board.record(&outcome(Mode::Working), t0, at(105));
        board.record(&outcome(Mode::Working), t0, at(110));
        assert_eq!(board.view().since, at(105));

        board.record(&outcome(Mode::Reduced), t0, at(115));
        assert_eq!(board.view().since, at(115));
        assert_eq!(board.mode(), Mode::Reduced);
    }

    #[test]
    fn unhealthy_until_first_tick() {
        let board = StatusBoard::new(at(0));
        let t0 = Instant::now();
        assert!(!board.is_healthy(t0, Duration::from_secs(60)));

        board.record(&outcome(Mode::Stopped), t0, at(1));
        assert!(board.is_healthy(t0 + Duration::from_secs(59), Duration::from_secs(60)));
        assert!(!board.is_healthy(t0 + Duration::from_secs(60), Duration::from_secs(60)));
    }

    #[test]
    fn view_serializes_mode_labels() {
        let board = StatusBoard::new(at(1_700_000_000));
        board.set_mode(Mode::Failsafe, at(1_700_000_010));
        let json = serde_json::to_value(board.view()).unwrap();
        assert_eq!(json["mode"], "failsafe shutdown");
        assert_eq!(json["since"], 1_700_000_010);
        assert!(json["delta"].is_null());
    }
}
