//! Piecewise-linear flow curve.
//!
//! ```text
//!  ^ duty
//!  |              ___________ duty_max
//!  |             /
//!  |            /
//!  |  _________/              duty_min
//!  +-----------|--|----------> delta
//!          temp_min temp_max
//! ```
//!
//! Between `temp_min` and `temp_max` the duty follows `a * delta + b` with
//! `a = (duty_max - duty_min) / (temp_max - temp_min)` and
//! `b = duty_min - temp_min * a`.

use serde::Serialize;
use sl_core::ensure_finite;

use crate::error::{ControlError, ControlResult};

/// Validated mapping from temperature delta (°C) to flow actuator duty.
///
/// Construction rejects degenerate curves, so evaluation never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowCurve {
    temp_min: f64,
    temp_max: f64,
    duty_min: f64,
    duty_max: f64,
}

impl FlowCurve {
    /// Create a new flow curve.
    ///
    /// # Arguments
    ///
    /// * `temp_min` - Delta at or below which `duty_min` is commanded
    /// * `temp_max` - Delta at or above which `duty_max` is commanded
    /// * `duty_min` - Lowest duty, also the safe duty when stopped
    /// * `duty_max` - Highest duty
    ///
    /// # Errors
    ///
    /// Returns error if any value is non-finite, if `temp_max <= temp_min` or
    /// if `duty_max < duty_min`.
    pub fn new(temp_min: f64, temp_max: f64, duty_min: f64, duty_max: f64) -> ControlResult<Self> {
        ensure_finite(temp_min, "flow.tempMin")?;
        ensure_finite(temp_max, "flow.tempMax")?;
        ensure_finite(duty_min, "flow.dutyMin")?;
        ensure_finite(duty_max, "flow.dutyMax")?;
        if temp_max <= temp_min {
            return Err(ControlError::InvalidArg {
                what: "flow curve temp_max must be greater than temp_min",
            });
        }
        if duty_max < duty_min {
            return Err(ControlError::InvalidArg {
                what: "flow curve duty_max must not be less than duty_min",
            });
        }
        Ok(Self {
            temp_min,
            temp_max,
            duty_min,
            duty_max,
        })
    }

    pub fn temp_min(&self) -> f64 {
        self.temp_min
    }

    pub fn temp_max(&self) -> f64 {
        self.temp_max
    }

    pub fn duty_min(&self) -> f64 {
        self.duty_min
    }

    pub fn duty_max(&self) -> f64 {
        self.duty_max
    }

    /// Duty for the given delta, always within `[duty_min, duty_max]`.
    pub fn duty(&self, delta: f64) -> f64 {
        // NaN fails every comparison below
        if delta.is_nan() || delta <= self.temp_min {
            return self.duty_min;
        }
        if delta >= self.temp_max {
            return self.duty_max;
        }

        let a = (self.duty_max - self.duty_min) / (self.temp_max - self.temp_min);
        let b = self.duty_min - self.temp_min * a;
        let flow = a * delta + b;

        flow.clamp(self.duty_min, self.duty_max)
    }
}
