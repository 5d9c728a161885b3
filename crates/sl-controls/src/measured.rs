//! Sensor snapshot shared between the ingestion task and the control tick.
//!
//! Each sensor owns one lock-free slot holding the bit pattern of its last
//! reading. A slot starts out as NaN, which is the "not yet reported" sentinel
//! and is surfaced to callers as `None`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// The closed set of temperature sensors the controller reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorId {
    /// Collector panel, top.
    SolarUp,
    /// Loop inlet (returning from the tank).
    SolarIn,
    /// Loop outlet (leaving the collector).
    SolarOut,
    /// Storage tank, top.
    TankUp,
}

const SENSOR_COUNT: usize = 4;

impl SensorId {
    pub const ALL: [SensorId; SENSOR_COUNT] = [
        SensorId::SolarUp,
        SensorId::SolarIn,
        SensorId::SolarOut,
        SensorId::TankUp,
    ];

    /// Name used in configuration files and status output.
    pub fn name(self) -> &'static str {
        match self {
            SensorId::SolarUp => "solarUp",
            SensorId::SolarIn => "solarIn",
            SensorId::SolarOut => "solarOut",
            SensorId::TankUp => "tankUp",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One complete set of readings, taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Readings {
    pub panel: f64,
    pub inlet: f64,
    pub outlet: f64,
    pub tank: f64,
}

impl Readings {
    /// Net thermal gain of the collector loop.
    ///
    /// Panel top and loop outlet are averaged against the loop inlet.
    pub fn delta(&self) -> f64 {
        (self.panel + self.outlet) / 2.0 - self.inlet
    }
}

/// Latest known value of every sensor.
#[derive(Debug)]
pub struct SensorSnapshot {
    slots: [AtomicU64; SENSOR_COUNT],
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorSnapshot {
    /// Create a snapshot with every sensor unknown.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(f64::NAN.to_bits())),
        }
    }

    /// Store a new reading.
    ///
    /// Non-finite values are dropped so a bad sample can never turn a known
    /// sensor back into an unknown one. Returns whether the value was stored.
    pub fn update(&self, sensor: SensorId, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.slots[sensor.slot()].store(value.to_bits(), Ordering::Relaxed);
        true
    }

    /// Last reading of a sensor, `None` until the first one arrives.
    pub fn get(&self, sensor: SensorId) -> Option<f64> {
        let value = f64::from_bits(self.slots[sensor.slot()].load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    /// Sensors that have not reported yet.
    pub fn missing(&self) -> Vec<SensorId> {
        SensorId::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        SensorId::ALL.into_iter().all(|s| self.get(s).is_some())
    }

    /// Take a consistent-enough copy of all readings for one tick.
    pub fn readings(&self) -> ControlResult<Readings> {
        let read = |sensor| {
            self.get(sensor)
                .ok_or(ControlError::MissingReading { sensor })
        };
        Ok(Readings {
            panel: read(SensorId::SolarUp)?,
            inlet: read(SensorId::SolarIn)?,
            outlet: read(SensorId::SolarOut)?,
            tank: read(SensorId::TankUp)?,
        })
    }
}
