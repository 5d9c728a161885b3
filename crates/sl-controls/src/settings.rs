//! Threshold settings and their shared snapshot.
//!
//! Settings come from the home-automation platform and are refreshed by a
//! separate task. A refreshed set is validated as a whole before it replaces
//! the current one, so a tick never observes a set that violates the
//! invariants below.

use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use sl_core::ensure_finite;

use crate::error::{ControlError, ControlResult};
use crate::flow::FlowCurve;

/// Every scalar the settings provider supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingId {
    SolarCritical,
    SolarOn,
    SolarOff,
    TankMax,
    FlowTempMin,
    FlowTempMax,
    FlowDutyMin,
    FlowDutyMax,
}

const SETTING_COUNT: usize = 8;

impl SettingId {
    pub const ALL: [SettingId; SETTING_COUNT] = [
        SettingId::SolarCritical,
        SettingId::SolarOn,
        SettingId::SolarOff,
        SettingId::TankMax,
        SettingId::FlowTempMin,
        SettingId::FlowTempMax,
        SettingId::FlowDutyMin,
        SettingId::FlowDutyMax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingId::SolarCritical => "solarCritical",
            SettingId::SolarOn => "solarOn",
            SettingId::SolarOff => "solarOff",
            SettingId::TankMax => "tankMax",
            SettingId::FlowTempMin => "flow.tempMin",
            SettingId::FlowTempMax => "flow.tempMax",
            SettingId::FlowDutyMin => "flow.dutyMin",
            SettingId::FlowDutyMax => "flow.dutyMax",
        }
    }
}

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw, unvalidated setting values indexed by [`SettingId`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettingValues {
    values: [f64; SETTING_COUNT],
}

impl SettingValues {
    pub fn get(&self, id: SettingId) -> f64 {
        self.values[id as usize]
    }

    pub fn set(&mut self, id: SettingId, value: f64) {
        self.values[id as usize] = value;
    }
}

/// A validated set of thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    solar_critical: f64,
    solar_on: f64,
    solar_off: f64,
    tank_max: f64,
    flow: FlowCurve,
}

impl Thresholds {
    /// Create a validated threshold set.
    ///
    /// # Errors
    ///
    /// Returns error if a value is non-finite or if `solar_on <= solar_off`.
    pub fn new(
        solar_critical: f64,
        solar_on: f64,
        solar_off: f64,
        tank_max: f64,
        flow: FlowCurve,
    ) -> ControlResult<Self> {
        ensure_finite(solar_critical, "solarCritical")?;
        ensure_finite(solar_on, "solarOn")?;
        ensure_finite(solar_off, "solarOff")?;
        ensure_finite(tank_max, "tankMax")?;
        if solar_on <= solar_off {
            return Err(ControlError::InvalidArg {
                what: "solar_on must be greater than solar_off",
            });
        }
        Ok(Self {
            solar_critical,
            solar_on,
            solar_off,
            tank_max,
            flow,
        })
    }

    /// Panel temperature at which the circuit is shut down unconditionally.
    pub fn solar_critical(&self) -> f64 {
        self.solar_critical
    }

    /// Delta at or above which circulation starts.
    pub fn solar_on(&self) -> f64 {
        self.solar_on
    }

    /// Delta at or below which modulation ends.
    pub fn solar_off(&self) -> f64 {
        self.solar_off
    }

    /// Tank temperature above which heating stops.
    pub fn tank_max(&self) -> f64 {
        self.tank_max
    }

    pub fn flow(&self) -> FlowCurve {
        self.flow
    }

    pub fn get(&self, id: SettingId) -> f64 {
        match id {
            SettingId::SolarCritical => self.solar_critical,
            SettingId::SolarOn => self.solar_on,
            SettingId::SolarOff => self.solar_off,
            SettingId::TankMax => self.tank_max,
            SettingId::FlowTempMin => self.flow.temp_min(),
            SettingId::FlowTempMax => self.flow.temp_max(),
            SettingId::FlowDutyMin => self.flow.duty_min(),
            SettingId::FlowDutyMax => self.flow.duty_max(),
        }
    }

    /// Raw copy of these thresholds, to overlay refreshed values on.
    pub fn values(&self) -> SettingValues {
        SettingValues {
            values: SettingId::ALL.map(|id| self.get(id)),
        }
    }
}

impl TryFrom<SettingValues> for Thresholds {
    type Error = ControlError;

    fn try_from(v: SettingValues) -> ControlResult<Self> {
        let flow = FlowCurve::new(
            v.get(SettingId::FlowTempMin),
            v.get(SettingId::FlowTempMax),
            v.get(SettingId::FlowDutyMin),
            v.get(SettingId::FlowDutyMax),
        )?;
        Thresholds::new(
            v.get(SettingId::SolarCritical),
            v.get(SettingId::SolarOn),
            v.get(SettingId::SolarOff),
            v.get(SettingId::TankMax),
            flow,
        )
    }
}

/// Current thresholds, shared between the refresh task and the control tick.
#[derive(Debug)]
pub struct SettingsSnapshot {
    current: RwLock<Thresholds>,
}

impl SettingsSnapshot {
    pub fn new(initial: Thresholds) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Copy of the thresholds currently in force.
    pub fn load(&self) -> Thresholds {
        // Thresholds is Copy, so a poisoned lock still holds a complete value.
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Swap in a new threshold set.
    pub fn replace(&self, next: Thresholds) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = next;
    }
}
