//! The control tick.
//!
//! One call to [`Controller::tick`] takes a snapshot of the sensors and
//! thresholds, runs the guard table, selects a mode and drives the circuit.
//! The controller owns all state that survives between ticks: the circuit
//! state, the reduced-duty window and the last commanded flow.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::actuator::{ActuatorSink, FlowOutput, Settle};
use crate::circuit::Circuit;
use crate::error::ControlResult;
use crate::guard::{self, GuardInput, GuardKind};
use crate::measured::SensorSnapshot;
use crate::metrics::ControlMetrics;
use crate::reduced::{DutyBranch, ReducedWindow};
use crate::settings::SettingsSnapshot;

/// Operating mode reported on the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    #[serde(rename = "startup")]
    Startup,
    #[serde(rename = "working")]
    Working,
    #[serde(rename = "reduced mode")]
    Reduced,
    #[serde(rename = "stopped")]
    Stopped,
    #[serde(rename = "failsafe shutdown")]
    Failsafe,
    #[serde(rename = "tank filled")]
    TankFull,
    #[serde(rename = "heat escape prevention mode")]
    HeatEscape,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Startup => "startup",
            Mode::Working => "working",
            Mode::Reduced => "reduced mode",
            Mode::Stopped => "stopped",
            Mode::Failsafe => "failsafe shutdown",
            Mode::TankFull => "tank filled",
            Mode::HeatEscape => "heat escape prevention mode",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tunables fixed for the lifetime of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOptions {
    /// Pause between sequential actuator commands.
    pub settle_delay: Duration,
    /// How long minimum duty is held after the delta drops below `solar_off`.
    pub reduction_window: Duration,
    pub output: FlowOutput,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            reduction_window: Duration::from_secs(30 * 60),
            output: FlowOutput::default(),
        }
    }
}

/// What a tick decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickOutcome {
    pub delta: f64,
    pub mode: Mode,
    /// Duty in effect on the flow regulator after the tick.
    pub flow: Option<f64>,
    /// Guard that forced a stop, if any.
    pub guard: Option<GuardKind>,
}

pub struct Controller<A, S> {
    sensors: Arc<SensorSnapshot>,
    settings: Arc<SettingsSnapshot>,
    circuit: Circuit<A, S>,
    reduced: ReducedWindow,
    metrics: Arc<ControlMetrics>,
}

impl<A: ActuatorSink, S: Settle> Controller<A, S> {
    pub fn new(
        sensors: Arc<SensorSnapshot>,
        settings: Arc<SettingsSnapshot>,
        sink: A,
        settle: S,
        options: ControlOptions,
        metrics: Arc<ControlMetrics>,
    ) -> Self {
        let circuit = Circuit::new(
            sink,
            settle,
            options.settle_delay,
            options.output,
            Arc::clone(&metrics),
        );
        metrics.reduced_mode.set_flag(false);
        Self {
            sensors,
            settings,
            circuit,
            reduced: ReducedWindow::new(options.reduction_window),
            metrics,
        }
    }

    pub fn circuit(&self) -> &Circuit<A, S> {
        &self.circuit
    }

    pub fn circuit_mut(&mut self) -> &mut Circuit<A, S> {
        &mut self.circuit
    }

    pub fn reduced(&self) -> &ReducedWindow {
        &self.reduced
    }

    pub fn metrics(&self) -> &ControlMetrics {
        &self.metrics
    }

    /// Drive the hardware into the stopped state, whatever it was left in.
    pub fn reset(&mut self, reason: &str) -> ControlResult<()> {
        let duty_min = self.settings.load().flow().duty_min();
        self.circuit.reset(reason, duty_min)
    }

    /// Run one control tick at time `now`.
    ///
    /// # Errors
    ///
    /// Returns error if a sensor has not reported yet or an actuator command
    /// fails. The tick is abandoned at that point; all state stays consistent
    /// and the next tick starts over from the guards.
    pub fn tick(&mut self, now: Instant) -> ControlResult<TickOutcome> {
        let readings = self.sensors.readings()?;
        let thresholds = self.settings.load();
        let duty_min = thresholds.flow().duty_min();
        let delta = readings.delta();
        self.metrics.delta.set(delta);

        let input = GuardInput {
            readings: &readings,
            delta,
            thresholds: &thresholds,
        };
        if let Some(trip) = guard::evaluate(&input) {
            self.metrics.guard_counter(trip.kind).inc();
            if self.circuit.stop(&trip.detail, duty_min)? {
                warn!(guard = trip.kind.reason(), delta, "Guard stopped the circuit");
            }
            return Ok(TickOutcome {
                delta,
                mode: trip.kind.mode(),
                flow: self.circuit.last_flow(),
                guard: Some(trip.kind),
            });
        }

        let mode = match self.reduced.branch(delta, thresholds.solar_off(), now) {
            DutyBranch::Modulate => {
                if delta >= thresholds.solar_on() && readings.panel > readings.outlet {
                    self.circuit.start()?;
                }
                self.reduced.extend(now);
                if self.reduced.is_active() {
                    self.reduced.clear();
                    self.metrics.reduced_mode.set_flag(false);
                }
                self.circuit.set_flow(thresholds.flow().duty(delta))?;
                if self.circuit.is_running() {
                    Mode::Working
                } else {
                    Mode::Stopped
                }
            }
            DutyBranch::ReducedHold => {
                if !self.reduced.is_active() {
                    info!(
                        delta,
                        hold_s = self.reduced.remaining(now).as_secs(),
                        "Entering reduced heat exchange mode"
                    );
                    self.circuit.set_flow(duty_min)?;
                    self.reduced.activate();
                    self.metrics.reduced_mode.set_flag(true);
                }
                Mode::Reduced
            }
            DutyBranch::Shutdown => {
                if self.reduced.is_active() {
                    self.reduced.clear();
                    self.metrics.reduced_mode.set_flag(false);
                }
                let reason = format!("Temperature delta too low: {delta:.2}");
                self.circuit.stop(&reason, duty_min)?;
                Mode::Stopped
            }
        };

        Ok(TickOutcome {
            delta,
            mode,
            flow: self.circuit.last_flow(),
            guard: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{Actuator, OFF, ON};
    use crate::error::ControlError;
    use crate::flow::FlowCurve;
    use crate::measured::SensorId;
    use crate::settings::Thresholds;

    #[derive(Default)]
    struct Recorder {
        commands: Vec<(Actuator, f64)>,
        fail_on: Option<Actuator>,
    }

    impl ActuatorSink for Recorder {
        fn set_value(&mut self, actuator: Actuator, value: f64) -> ControlResult<()> {
            if self.fail_on == Some(actuator) {
                return Err(ControlError::Actuator {
                    actuator,
                    message: "timeout".to_string(),
                });
            }
            self.commands.push((actuator, value));
            Ok(())
        }
    }

    struct NoPause;

    impl Settle for NoPause {
        fn settle(&mut self, _delay: Duration) {}
    }

    fn thresholds() -> Thresholds {
        let flow = FlowCurve::new(5.0, 9.0, 1.8, 3.0).unwrap();
        Thresholds::new(90.0, 6.0, 5.0, 65.0, flow).unwrap()
    }

    fn controller() -> (Controller<Recorder, NoPause>, Arc<SensorSnapshot>) {
        let sensors = Arc::new(SensorSnapshot::new());
        let settings = Arc::new(SettingsSnapshot::new(thresholds()));
        let c = Controller::new(
            Arc::clone(&sensors),
            settings,
            Recorder::default(),
            NoPause,
            ControlOptions::default(),
            Arc::new(ControlMetrics::new()),
        );
        (c, sensors)
    }

    fn feed(sensors: &SensorSnapshot, panel: f64, inlet: f64, outlet: f64, tank: f64) {
        sensors.update(SensorId::SolarUp, panel);
        sensors.update(SensorId::SolarIn, inlet);
        sensors.update(SensorId::SolarOut, outlet);
        sensors.update(SensorId::TankUp, tank);
    }

    #[test]
    fn tick_without_readings_fails() {
        let (mut c, _) = controller();
        let err = c.tick(Instant::now()).unwrap_err();
        assert!(matches!(err, ControlError::MissingReading { .. }));
        assert!(c.circuit().sink().commands.is_empty());
    }

    #[test]
    fn good_delta_starts_and_modulates() {
        let (mut c, sensors) = controller();
        // delta = (44 + 30) / 2 - 30 = 7
        feed(&sensors, 44.0, 30.0, 30.0, 40.0);

        let out = c.tick(Instant::now()).unwrap();
        assert_eq!(out.mode, Mode::Working);
        assert_eq!(out.delta, 7.0);
        assert_eq!(out.flow, Some(2.4));
        assert_eq!(out.guard, None);
        assert_eq!(
            c.circuit().sink().commands[..2],
            [(Actuator::Pump, ON), (Actuator::Valve, ON)]
        );
        assert_eq!(c.circuit().sink().commands[2].0, Actuator::Flow);
    }

    #[test]
    fn delta_inside_band_modulates_without_starting() {
        let (mut c, sensors) = controller();
        // delta = (41 + 30) / 2 - 30 = 5.5, above off but below on
        feed(&sensors, 41.0, 30.0, 30.0, 40.0);

        let out = c.tick(Instant::now()).unwrap();
        assert_eq!(out.mode, Mode::Stopped);
        assert!(!c.circuit().is_running());
        let commands = &c.circuit().sink().commands;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, Actuator::Flow);
        assert_eq!(out.flow, Some(1.95));
    }

    #[test]
    fn panel_colder_than_outlet_does_not_start() {
        let (mut c, sensors) = controller();
        // delta = (30 + 44) / 2 - 30 = 7 but the panel is below the outlet
        feed(&sensors, 30.0, 30.0, 44.0, 40.0);
        c.tick(Instant::now()).unwrap();
        assert!(!c.circuit().is_running());
    }

    #[test]
    fn critical_panel_counts_every_tick() {
        let (mut c, sensors) = controller();
        feed(&sensors, 44.0, 30.0, 30.0, 40.0);
        let t0 = Instant::now();
        c.tick(t0).unwrap();
        assert!(c.circuit().is_running());

        feed(&sensors, 95.0, 30.0, 60.0, 40.0);
        let out = c.tick(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(out.mode, Mode::Failsafe);
        assert_eq!(out.guard, Some(GuardKind::Critical));
        assert!(!c.circuit().is_running());
        assert_eq!(c.metrics().failsafe_total.get(), 1);

        let commands = c.circuit().sink().commands.len();
        c.tick(t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(c.metrics().failsafe_total.get(), 2);
        assert_eq!(c.circuit().sink().commands.len(), commands);
    }

    #[test]
    fn guard_counts_even_when_stop_fails() {
        let (mut c, sensors) = controller();
        feed(&sensors, 44.0, 30.0, 30.0, 40.0);
        c.tick(Instant::now()).unwrap();

        c.circuit_mut().sink_mut().fail_on = Some(Actuator::Pump);
        feed(&sensors, 44.0, 30.0, 30.0, 70.0);
        assert!(c.tick(Instant::now()).is_err());
        assert_eq!(c.metrics().tank_full_total.get(), 1);
        assert!(c.circuit().is_running());
    }

    #[test]
    fn reduced_hold_then_shutdown() {
        let (mut c, sensors) = controller();
        let t0 = Instant::now();
        feed(&sensors, 44.0, 30.0, 30.0, 40.0);
        c.tick(t0).unwrap();

        // delta = 3
        feed(&sensors, 36.0, 30.0, 30.0, 40.0);
        let out = c.tick(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(out.mode, Mode::Reduced);
        assert_eq!(out.flow, Some(1.8));
        assert!(c.circuit().is_running());
        assert_eq!(c.metrics().reduced_mode.get(), 1.0);

        let out = c
            .tick(t0 + Duration::from_secs(30 * 60 + 1))
            .unwrap();
        assert_eq!(out.mode, Mode::Stopped);
        assert!(!c.circuit().is_running());
        assert!(!c.reduced().is_active());
        assert_eq!(c.metrics().reduced_mode.get(), 0.0);
        let tail = &c.circuit().sink().commands[c.circuit().sink().commands.len() - 3..];
        assert_eq!(
            tail,
            [(Actuator::Pump, OFF), (Actuator::Valve, OFF), (Actuator::Flow, 1.8)]
        );
    }

    #[test]
    fn returning_to_modulation_clears_reduced_flag() {
        let (mut c, sensors) = controller();
        let t0 = Instant::now();
        feed(&sensors, 44.0, 30.0, 30.0, 40.0);
        c.tick(t0).unwrap();
        feed(&sensors, 36.0, 30.0, 30.0, 40.0);
        c.tick(t0 + Duration::from_secs(5)).unwrap();
        assert!(c.reduced().is_active());

        feed(&sensors, 44.0, 30.0, 30.0, 40.0);
        c.tick(t0 + Duration::from_secs(10)).unwrap();
        assert!(!c.reduced().is_active());
        assert_eq!(c.circuit().last_flow(), Some(2.4));

        // A second dip re-enters reduced mode and parks the flow again.
        feed(&sensors, 36.0, 30.0, 30.0, 40.0);
        let out = c.tick(t0 + Duration::from_secs(15)).unwrap();
        assert_eq!(out.mode, Mode::Reduced);
        assert_eq!(c.circuit().last_flow(), Some(1.8));
    }

    #[test]
    fn reset_parks_hardware() {
        let (mut c, _) = controller();
        c.reset("system reset").unwrap();
        assert_eq!(
            c.circuit().sink().commands,
            vec![(Actuator::Pump, OFF), (Actuator::Valve, OFF), (Actuator::Flow, 1.8)]
        );
    }

    #[test]
    fn mode_labels_match_status_strings() {
        assert_eq!(Mode::Reduced.to_string(), "reduced mode");
        assert_eq!(Mode::HeatEscape.label(), "heat escape prevention mode");
        assert_eq!(GuardKind::TankFull.mode(), Mode::TankFull);
    }
}
