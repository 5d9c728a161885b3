//! Configuration schema definitions.
//!
//! Device and entity sections are required. Every tuning section falls back
//! to its defaults when omitted. Unknown keys are rejected everywhere.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sl_controls::{Actuator, SensorId, SettingId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub sensors: SensorsDef,
    pub actuators: ActuatorsDef,
    pub settings: SettingsDef,
    #[serde(default)]
    pub control: ControlDef,
    #[serde(default)]
    pub startup: StartupDef,
    #[serde(default)]
    pub panel: PanelDef,
    #[serde(default)]
    pub server: ServerDef,
    #[serde(default)]
    pub sync: SyncDef,
    #[serde(default)]
    pub evok: EvokDef,
    #[serde(default)]
    pub homeassistant: HomeAssistantDef,
}

/// A gateway device addressed by type and circuit, e.g. `temp` / `28FF...`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct DeviceDef {
    pub dev: String,
    pub circuit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SensorsDef {
    pub solar_up: DeviceDef,
    pub solar_in: DeviceDef,
    pub solar_out: DeviceDef,
    pub tank_up: DeviceDef,
}

impl SensorsDef {
    pub fn device(&self, sensor: SensorId) -> &DeviceDef {
        match sensor {
            SensorId::SolarUp => &self.solar_up,
            SensorId::SolarIn => &self.solar_in,
            SensorId::SolarOut => &self.solar_out,
            SensorId::TankUp => &self.tank_up,
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = (SensorId, &DeviceDef)> {
        SensorId::ALL.into_iter().map(|id| (id, self.device(id)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ActuatorsDef {
    pub pump: DeviceDef,
    #[serde(rename = "switch")]
    pub valve: DeviceDef,
    pub flow: DeviceDef,
}

impl ActuatorsDef {
    pub fn device(&self, actuator: Actuator) -> &DeviceDef {
        match actuator {
            Actuator::Pump => &self.pump,
            Actuator::Valve => &self.valve,
            Actuator::Flow => &self.flow,
        }
    }
}

/// A home-automation entity and the value used until it is first fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    pub entity_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SettingsDef {
    pub solar_critical: EntityDef,
    pub solar_on: EntityDef,
    pub solar_off: EntityDef,
    pub tank_max: EntityDef,
    pub flow: FlowSettingsDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FlowSettingsDef {
    pub temp_min: EntityDef,
    pub temp_max: EntityDef,
    pub duty_min: EntityDef,
    pub duty_max: EntityDef,
}

impl SettingsDef {
    pub fn entity(&self, id: SettingId) -> &EntityDef {
        match id {
            SettingId::SolarCritical => &self.solar_critical,
            SettingId::SolarOn => &self.solar_on,
            SettingId::SolarOff => &self.solar_off,
            SettingId::TankMax => &self.tank_max,
            SettingId::FlowTempMin => &self.flow.temp_min,
            SettingId::FlowTempMax => &self.flow.temp_max,
            SettingId::FlowDutyMin => &self.flow.duty_min,
            SettingId::FlowDutyMax => &self.flow.duty_max,
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = (SettingId, &EntityDef)> {
        SettingId::ALL.into_iter().map(|id| (id, self.entity(id)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ControlDef {
    pub poll_interval_s: u64,
    pub settle_delay_ms: u64,
    pub reduction_window_s: u64,
    /// Regulator opens fully at 0 V.
    pub invert: bool,
    pub flow_max: f64,
}

impl Default for ControlDef {
    fn default() -> Self {
        Self {
            poll_interval_s: 5,
            settle_delay_ms: 1000,
            reduction_window_s: 30 * 60,
            invert: false,
            flow_max: 10.0,
        }
    }
}

impl ControlDef {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_s)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn reduction_window(&self) -> Duration {
        Duration::from_secs(self.reduction_window_s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct StartupDef {
    pub sensor_timeout_s: u64,
    pub sensor_log_every_s: u64,
}

impl Default for StartupDef {
    fn default() -> Self {
        Self {
            sensor_timeout_s: 300,
            sensor_log_every_s: 10,
        }
    }
}

impl StartupDef {
    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_secs(self.sensor_timeout_s)
    }

    pub fn sensor_log_every(&self) -> Duration {
        Duration::from_secs(self.sensor_log_every_s)
    }
}

/// Linear scale of the panel probe's analog transmitter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct PanelDef {
    pub voltage_ref: f64,
    pub temp_min: f64,
    pub temp_max: f64,
}

impl Default for PanelDef {
    fn default() -> Self {
        Self {
            voltage_ref: 12.0,
            temp_min: 0.0,
            temp_max: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerDef {
    pub listen: String,
    pub health_timeout_s: u64,
}

impl Default for ServerDef {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:7001".to_string(),
            health_timeout_s: 60,
        }
    }
}

impl ServerDef {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SyncDef {
    pub sensor_poll_s: u64,
    pub settings_refresh_s: u64,
}

impl Default for SyncDef {
    fn default() -> Self {
        Self {
            sensor_poll_s: 2,
            settings_refresh_s: 60,
        }
    }
}

impl SyncDef {
    pub fn sensor_poll(&self) -> Duration {
        Duration::from_secs(self.sensor_poll_s)
    }

    pub fn settings_refresh(&self) -> Duration {
        Duration::from_secs(self.settings_refresh_s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EvokDef {
    /// `host:port` of the gateway REST API.
    pub address: String,
}

impl Default for EvokDef {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct HomeAssistantDef {
    pub address: String,
    /// Long-lived access token; sent as a bearer token when non-empty.
    pub token: String,
}

impl Default for HomeAssistantDef {
    fn default() -> Self {
        Self {
            address: "localhost:8123".to_string(),
            token: String::new(),
        }
    }
}
