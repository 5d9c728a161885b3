//! Error types for control loop operations.

use sl_core::CoreError;
use thiserror::Error;

use crate::actuator::Actuator;
use crate::measured::SensorId;

/// Result type for control loop operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while evaluating or executing a control tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument or configuration value.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error(transparent)]
    Numeric(#[from] CoreError),

    /// A sensor has not delivered its first reading yet.
    #[error("Sensor {sensor} has not reported a value yet")]
    MissingReading { sensor: SensorId },

    /// The gateway rejected or failed to deliver an actuator command.
    #[error("Actuator {actuator} command failed: {message}")]
    Actuator { actuator: Actuator, message: String },
}
