//! EVOK gateway client.
//!
//! EVOK exposes every device of a Unipi controller over REST:
//! - `GET /rest/{dev}/{circuit}` returns the device state with its `value`
//! - `POST /json/{dev}/{circuit}` with `{"value": "<text>"}` sets an output
//!
//! Analog outputs (`ao`) take volts with two decimals; relays and digital
//! outputs take an integer.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use sl_config::{ActuatorsDef, DeviceDef, PanelDef, SensorsDef};
use sl_controls::{
    Actuator, ActuatorSink, ControlError, ControlMetrics, ControlResult, SensorId, SensorSnapshot,
};
use tracing::{debug, warn};

use crate::error::{IoError, IoResult};

/// Device state as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    #[serde(default)]
    pub dev: String,
    #[serde(default)]
    pub circuit: String,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Text form of a command value for the given device type.
pub fn format_value(dev: &str, value: f64) -> String {
    if dev == "ao" {
        format!("{value:.2}")
    } else {
        format!("{value:.0}")
    }
}

/// Panel probe temperature from its transmitter voltage.
pub fn panel_temperature(volts: f64, scale: &PanelDef) -> f64 {
    volts * (scale.temp_max - scale.temp_min) / scale.voltage_ref + scale.temp_min
}

#[derive(Serialize)]
struct SetRequest<'a> {
    value: &'a str,
}

pub struct EvokClient {
    base_url: String,
    http: Client,
    actuators: ActuatorsDef,
}

impl EvokClient {
    /// Build a client for the gateway at `address` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(address: &str, actuators: ActuatorsDef, timeout: Duration) -> IoResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IoError::Client(e.to_string()))?;
        Ok(Self {
            base_url: format!("http://{address}"),
            http,
            actuators,
        })
    }

    /// Read the current value of one device.
    pub fn get_value(&self, device: &DeviceDef) -> IoResult<f64> {
        let url = format!("{}/rest/{}/{}", self.base_url, device.dev, device.circuit);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| IoError::request(&url, e))?;
        if !response.status().is_success() {
            return Err(IoError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        let reading: DeviceReading = response.json().map_err(|e| IoError::parse(&url, e))?;
        reading
            .value
            .ok_or_else(|| IoError::parse(&url, "response has no value"))
    }

    /// Command one output device.
    pub fn set_device(&self, device: &DeviceDef, value: f64) -> IoResult<()> {
        let url = format!("{}/json/{}/{}", self.base_url, device.dev, device.circuit);
        let text = format_value(&device.dev, value);
        debug!(%url, value = %text, "EVOK set");
        let response = self
            .http
            .post(&url)
            .json(&SetRequest { value: &text })
            .send()
            .map_err(|e| IoError::request(&url, e))?;
        if !response.status().is_success() {
            return Err(IoError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

impl ActuatorSink for EvokClient {
    fn set_value(&mut self, actuator: Actuator, value: f64) -> ControlResult<()> {
        let device = self.actuators.device(actuator);
        self.set_device(device, value)
            .map_err(|e| ControlError::Actuator {
                actuator,
                message: e.to_string(),
            })
    }
}

/// Routes gateway readings into the sensor snapshot.
pub struct SensorRouter {
    routes: Vec<(DeviceDef, SensorId)>,
    panel: PanelDef,
    snapshot: Arc<SensorSnapshot>,
    metrics: Arc<ControlMetrics>,
}

impl SensorRouter {
    pub fn new(
        sensors: &SensorsDef,
        panel: PanelDef,
        snapshot: Arc<SensorSnapshot>,
        metrics: Arc<ControlMetrics>,
    ) -> Self {
        let routes = sensors
            .devices()
            .map(|(id, device)| (device.clone(), id))
            .collect();
        Self {
            routes,
            panel,
            snapshot,
            metrics,
        }
    }

    pub fn sensor_for(&self, dev: &str, circuit: &str) -> Option<SensorId> {
        self.routes
            .iter()
            .find(|(d, _)| d.dev == dev && d.circuit == circuit)
            .map(|(_, id)| *id)
    }

    /// Store one raw reading. Returns `false` for unknown devices and values
    /// the snapshot rejects.
    pub fn apply(&self, sensor: SensorId, raw: f64) -> bool {
        let value = if sensor == SensorId::SolarUp {
            let temp = panel_temperature(raw, &self.panel);
            self.metrics.panel_voltage.set(raw);
            self.metrics.panel_temperature.set(temp);
            temp
        } else {
            raw
        };
        self.snapshot.update(sensor, value)
    }

    /// Route a batch of device readings. Returns how many were applied.
    pub fn route(&self, readings: &[DeviceReading]) -> usize {
        readings
            .iter()
            .filter(|r| {
                let (Some(sensor), Some(value)) = (self.sensor_for(&r.dev, &r.circuit), r.value)
                else {
                    return false;
                };
                self.apply(sensor, value)
            })
            .count()
    }

    pub fn devices(&self) -> impl Iterator<Item = (SensorId, &DeviceDef)> {
        self.routes.iter().map(|(device, id)| (*id, device))
    }
}

/// Fetch every configured sensor once and route the readings.
///
/// Returns how many sensors were updated. Failures are logged and skipped so
/// one broken probe does not stall the others.
pub fn poll_sensors(client: &EvokClient, router: &SensorRouter) -> usize {
    let mut applied = 0;
    for (sensor, device) in router.devices() {
        match client.get_value(device) {
            Ok(raw) => {
                if router.apply(sensor, raw) {
                    applied += 1;
                } else {
                    warn!(%sensor, raw, "Discarding non-finite reading");
                }
            }
            Err(e) => warn!(%sensor, error = %e, "Sensor read failed"),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensors() -> SensorsDef {
        let device = |dev: &str, circuit: &str| DeviceDef {
            dev: dev.to_string(),
            circuit: circuit.to_string(),
        };
        SensorsDef {
            solar_up: device("ai", "1_01"),
            solar_in: device("temp", "A"),
            solar_out: device("temp", "B"),
            tank_up: device("temp", "C"),
        }
    }

    fn router() -> SensorRouter {
        SensorRouter::new(
            &sensors(),
            PanelDef::default(),
            Arc::new(SensorSnapshot::new()),
            Arc::new(ControlMetrics::new()),
        )
    }

    fn reading(dev: &str, circuit: &str, value: f64) -> DeviceReading {
        DeviceReading {
            dev: dev.to_string(),
            circuit: circuit.to_string(),
            value: Some(value),
        }
    }

    #[test]
    fn analog_outputs_get_two_decimals() {
        assert_eq!(format_value("ao", 2.4), "2.40");
        assert_eq!(format_value("ao", 7.457), "7.46");
        assert_eq!(format_value("relay", 1.0), "1");
        assert_eq!(format_value("do", 0.0), "0");
    }

    #[test]
    fn panel_voltage_scales_to_celsius() {
        let scale = PanelDef::default();
        assert_eq!(panel_temperature(0.0, &scale), 0.0);
        assert_eq!(panel_temperature(12.0, &scale), 200.0);
        assert!((panel_temperature(3.0, &scale) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn route_applies_known_devices_only() {
        let r = router();
        let applied = r.route(&[
            reading("ai", "1_01", 3.0),
            reading("temp", "A", 30.5),
            reading("temp", "Z", 99.0),
            reading("ai", "A", 1.0),
        ]);
        assert_eq!(applied, 2);
        assert!((r.snapshot.get(SensorId::SolarUp).unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(r.snapshot.get(SensorId::SolarIn), Some(30.5));
        assert_eq!(r.snapshot.get(SensorId::SolarOut), None);
        assert_eq!(r.metrics.panel_voltage.get(), 3.0);
    }

    #[test]
    fn route_skips_missing_and_non_finite_values() {
        let r = router();
        let mut missing = reading("temp", "B", 0.0);
        missing.value = None;
        let applied = r.route(&[missing, reading("temp", "C", f64::NAN)]);
        assert_eq!(applied, 0);
        assert!(!r.snapshot.is_complete());
    }

    #[test]
    fn reading_parses_gateway_payload() {
        let json = r#"{"dev":"temp","circuit":"28FF","value":21.5,"typ":"DS18B20","lost":false}"#;
        let reading: DeviceReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.value, Some(21.5));
        assert_eq!(reading.circuit, "28FF");
    }
}
