//! Startup gate: hold the control loop until every sensor has reported.

use std::thread;
use std::time::{Duration, Instant};

use sl_controls::SensorSnapshot;
use tracing::info;

use crate::error::{AppError, AppResult};

fn names(snapshot: &SensorSnapshot) -> String {
    snapshot
        .missing()
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Block until the snapshot is complete.
///
/// Missing sensors are logged every `log_every`.
///
/// # Errors
///
/// Returns [`AppError::SensorTimeout`] if sensors are still missing after
/// `timeout`.
pub fn wait_for_sensors(
    snapshot: &SensorSnapshot,
    timeout: Duration,
    log_every: Duration,
    poll: Duration,
) -> AppResult<()> {
    let start = Instant::now();
    let mut last_log: Option<Instant> = None;
    loop {
        if snapshot.is_complete() {
            info!(waited_ms = start.elapsed().as_millis() as u64, "All sensors reporting");
            return Ok(());
        }
        let now = Instant::now();
        let waited = now.duration_since(start);
        if waited >= timeout {
            return Err(AppError::SensorTimeout {
                waited,
                missing: names(snapshot),
            });
        }
        if last_log.is_none_or(|t| now.duration_since(t) >= log_every) {
            info!(missing = %names(snapshot), "Waiting for sensor readings");
            last_log = Some(now);
        }
        thread::sleep(poll.min(timeout - waited));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_controls::SensorId;
    use std::sync::Arc;

    fn fill(snapshot: &SensorSnapshot) {
        for id in SensorId::ALL {
            snapshot.update(id, 20.0);
        }
    }

    #[test]
    fn complete_snapshot_returns_immediately() {
        let snapshot = SensorSnapshot::new();
        fill(&snapshot);
        wait_for_sensors(
            &snapshot,
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_millis(1),
        )
        .unwrap();
    }

    #[test]
    fn times_out_naming_missing_sensors() {
        let snapshot = SensorSnapshot::new();
        snapshot.update(SensorId::SolarUp, 40.0);
        snapshot.update(SensorId::SolarIn, 30.0);
        let err = wait_for_sensors(
            &snapshot,
            Duration::from_millis(20),
            Duration::from_millis(5),
            Duration::from_millis(2),
        )
        .unwrap_err();
        match err {
            AppError::SensorTimeout { missing, .. } => assert_eq!(missing, "solarOut, tankUp"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn late_readings_release_the_gate() {
        let snapshot = Arc::new(SensorSnapshot::new());
        let writer = Arc::clone(&snapshot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            fill(&writer);
        });
        wait_for_sensors(
            &snapshot,
            Duration::from_secs(5),
            Duration::from_secs(1),
            Duration::from_millis(2),
        )
        .unwrap();
        handle.join().unwrap();
    }
}
