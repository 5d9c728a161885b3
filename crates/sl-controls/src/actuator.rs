//! Actuator outputs and the traits the control loop drives them through.
//!
//! The circuit has three outputs behind the device gateway:
//! - **Pump**: binary relay
//! - **Valve**: binary switch routing the loop through the collector
//! - **Flow**: analog flow regulator, commanded as a bounded duty

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::flow::FlowCurve;

/// Binary "on" command.
pub const ON: f64 = 1.0;
/// Binary "off" command.
pub const OFF: f64 = 0.0;

/// The closed set of outputs the controller commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Actuator {
    Pump,
    Valve,
    Flow,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [Actuator::Pump, Actuator::Valve, Actuator::Flow];

    pub fn name(self) -> &'static str {
        match self {
            Actuator::Pump => "pump",
            Actuator::Valve => "valve",
            Actuator::Flow => "flow",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Destination for actuator commands.
///
/// Implementations report failures as errors and never panic. Commands are
/// idempotent on the hardware side: repeating "on" to a running pump is safe.
pub trait ActuatorSink {
    fn set_value(&mut self, actuator: Actuator, value: f64) -> ControlResult<()>;
}

impl<T: ActuatorSink + ?Sized> ActuatorSink for Box<T> {
    fn set_value(&mut self, actuator: Actuator, value: f64) -> ControlResult<()> {
        (**self).set_value(actuator, value)
    }
}

/// Pause between two sequential actuator commands.
pub trait Settle {
    fn settle(&mut self, delay: Duration);
}

/// Settles by blocking the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSettle;

impl Settle for ThreadSettle {
    fn settle(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Translation from a duty value to the value written to the flow regulator.
///
/// Some regulators are wired in reverse polarity (0 V means fully open); for
/// those the written value is `max - duty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowOutput {
    pub invert: bool,
    pub max: f64,
}

impl Default for FlowOutput {
    fn default() -> Self {
        Self {
            invert: false,
            max: 10.0,
        }
    }
}

impl FlowOutput {
    /// # Errors
    ///
    /// Returns error if `max` is not a positive finite number.
    pub fn new(invert: bool, max: f64) -> ControlResult<Self> {
        if !max.is_finite() || max <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "flow output max must be positive",
            });
        }
        Ok(Self { invert, max })
    }

    pub fn apply(&self, duty: f64) -> f64 {
        if self.invert { self.max - duty } else { duty }
    }

    /// Check that every duty `curve` can produce is writable to the regulator.
    ///
    /// # Errors
    ///
    /// Returns error if the curve reaches below zero or above `max`.
    pub fn check(&self, curve: &FlowCurve) -> ControlResult<()> {
        if curve.duty_min() < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "flow curve duty_min must not be negative",
            });
        }
        if curve.duty_max() > self.max {
            return Err(ControlError::InvalidArg {
                what: "flow curve duty_max exceeds the regulator range",
            });
        }
        Ok(())
    }
}
