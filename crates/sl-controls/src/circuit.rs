//! Pump/valve state machine and the flow output it shares with mode selection.
//!
//! Commands reach the hardware in a fixed order with a settle delay between
//! them, since the relays behind the gateway must not switch at the same time:
//!
//! - start: pump on, valve on
//! - stop: pump off, valve off, flow to minimum duty
//!
//! Transitions are idempotent: `start` on a running circuit and `stop` on a
//! stopped one emit nothing. If any command fails the transition is abandoned
//! and the state is left untouched, so the next tick retries it.

use std::sync::Arc;
use std::time::Duration;

use sl_core::round_to;
use tracing::{debug, info};

use crate::actuator::{Actuator, ActuatorSink, FlowOutput, OFF, ON, Settle};
use crate::error::ControlResult;
use crate::metrics::ControlMetrics;

/// Decimal places the gateway keeps for analog outputs.
const FLOW_DECIMALS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Stopped,
    Running,
}

pub struct Circuit<A, S> {
    sink: A,
    settle: S,
    settle_delay: Duration,
    output: FlowOutput,
    state: CircuitState,
    last_flow: Option<f64>,
    metrics: Arc<ControlMetrics>,
}

impl<A: ActuatorSink, S: Settle> Circuit<A, S> {
    pub fn new(
        sink: A,
        settle: S,
        settle_delay: Duration,
        output: FlowOutput,
        metrics: Arc<ControlMetrics>,
    ) -> Self {
        metrics.circuit_running.set_flag(false);
        Self {
            sink,
            settle,
            settle_delay,
            output,
            state: CircuitState::Stopped,
            last_flow: None,
            metrics,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == CircuitState::Running
    }

    /// Last duty written to the flow regulator, rounded as sent.
    pub fn last_flow(&self) -> Option<f64> {
        self.last_flow
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut A {
        &mut self.sink
    }

    /// Switch pump and valve on. Returns whether a transition happened.
    pub fn start(&mut self) -> ControlResult<bool> {
        if self.is_running() {
            return Ok(false);
        }
        info!("Detected optimal conditions, starting circulation");

        self.command(Actuator::Pump, ON)?;
        self.settle.settle(self.settle_delay);
        self.command(Actuator::Valve, ON)?;
        self.settle.settle(self.settle_delay);

        self.state = CircuitState::Running;
        self.metrics.circuit_running.set_flag(true);
        Ok(true)
    }

    /// Switch pump and valve off and park the flow regulator at `duty_min`.
    /// Returns whether a transition happened.
    pub fn stop(&mut self, reason: &str, duty_min: f64) -> ControlResult<bool> {
        if !self.is_running() {
            return Ok(false);
        }
        self.stop_sequence(reason, duty_min)?;
        Ok(true)
    }

    /// Run the stop sequence regardless of the current state.
    ///
    /// Used once at startup, when the hardware may have been left running by a
    /// previous process.
    pub fn reset(&mut self, reason: &str, duty_min: f64) -> ControlResult<()> {
        self.stop_sequence(reason, duty_min)
    }

    /// Command a flow duty, skipping the write when the gateway already holds
    /// the same value. Returns whether a command was sent.
    pub fn set_flow(&mut self, duty: f64) -> ControlResult<bool> {
        if self.last_flow == Some(round_to(duty, FLOW_DECIMALS)) {
            return Ok(false);
        }
        self.write_flow(duty)?;
        Ok(true)
    }

    fn stop_sequence(&mut self, reason: &str, duty_min: f64) -> ControlResult<()> {
        info!(reason, "Stopping circulation");

        self.command(Actuator::Pump, OFF)?;
        self.settle.settle(self.settle_delay);
        self.command(Actuator::Valve, OFF)?;
        self.settle.settle(self.settle_delay);
        self.write_flow(duty_min)?;
        self.settle.settle(self.settle_delay);

        self.state = CircuitState::Stopped;
        self.metrics.circuit_running.set_flag(false);
        Ok(())
    }

    fn write_flow(&mut self, duty: f64) -> ControlResult<()> {
        let value = self.output.apply(duty);
        self.command(Actuator::Flow, value)?;
        self.last_flow = Some(round_to(duty, FLOW_DECIMALS));
        self.metrics.flow_rate.set(value);
        Ok(())
    }

    fn command(&mut self, actuator: Actuator, value: f64) -> ControlResult<()> {
        debug!(%actuator, value, "actuator command");
        self.sink.set_value(actuator, value)
    }
}
