//! Configuration validation logic.

use std::collections::HashMap;
use std::net::SocketAddr;

use sl_controls::{FlowOutput, Thresholds};

use crate::convert;
use crate::schema::{Config, DeviceDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Empty identifier: {field}")]
    EmptyId { field: String },

    #[error("Duplicate device: {dev}/{circuit} used by {first} and {second}")]
    DuplicateDevice {
        dev: String,
        circuit: String,
        first: String,
        second: String,
    },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid thresholds: {reason}")]
    Thresholds { reason: String },
}

pub fn validate_config(config: &Config) -> Result<(), ValidationError> {
    let mut sensor_devices: HashMap<&DeviceDef, String> = HashMap::new();
    for (id, device) in config.sensors.devices() {
        let field = format!("sensors.{id}");
        validate_device(device, &field)?;
        if let Some(first) = sensor_devices.insert(device, field.clone()) {
            return Err(ValidationError::DuplicateDevice {
                dev: device.dev.clone(),
                circuit: device.circuit.clone(),
                first,
                second: field,
            });
        }
    }

    for actuator in sl_controls::Actuator::ALL {
        let field = format!("actuators.{actuator}");
        validate_device(config.actuators.device(actuator), &field)?;
    }

    for (id, entity) in config.settings.entities() {
        if entity.entity_id.trim().is_empty() {
            return Err(ValidationError::EmptyId {
                field: format!("settings.{id}.entity_id"),
            });
        }
    }

    let thresholds: Thresholds =
        convert::thresholds(&config.settings).map_err(|e| ValidationError::Thresholds {
            reason: e.to_string(),
        })?;
    let output = FlowOutput::new(config.control.invert, config.control.flow_max).map_err(|e| {
        ValidationError::InvalidValue {
            field: "control.flow_max".to_string(),
            value: config.control.flow_max.to_string(),
            reason: e.to_string(),
        }
    })?;
    output
        .check(&thresholds.flow())
        .map_err(|e| ValidationError::InvalidValue {
            field: "settings.flow".to_string(),
            value: format!(
                "{}..{}",
                thresholds.flow().duty_min(),
                thresholds.flow().duty_max()
            ),
            reason: format!("{e} (control.flow_max = {})", output.max),
        })?;

    require_positive("control.poll_interval_s", config.control.poll_interval_s)?;
    require_positive("sync.sensor_poll_s", config.sync.sensor_poll_s)?;
    require_positive("sync.settings_refresh_s", config.sync.settings_refresh_s)?;
    require_positive("startup.sensor_log_every_s", config.startup.sensor_log_every_s)?;
    require_positive("server.health_timeout_s", config.server.health_timeout_s)?;

    let panel = &config.panel;
    if !(panel.voltage_ref.is_finite() && panel.voltage_ref > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "panel.voltage_ref".to_string(),
            value: panel.voltage_ref.to_string(),
            reason: "must be a positive voltage".to_string(),
        });
    }
    if !(panel.temp_min.is_finite() && panel.temp_max.is_finite() && panel.temp_max > panel.temp_min)
    {
        return Err(ValidationError::InvalidValue {
            field: "panel.temp_max".to_string(),
            value: panel.temp_max.to_string(),
            reason: format!("must be greater than panel.temp_min ({})", panel.temp_min),
        });
    }

    if config.server.listen.parse::<SocketAddr>().is_err() {
        return Err(ValidationError::InvalidValue {
            field: "server.listen".to_string(),
            value: config.server.listen.clone(),
            reason: "expected host:port socket address".to_string(),
        });
    }
    if config.evok.address.trim().is_empty() {
        return Err(ValidationError::EmptyId {
            field: "evok.address".to_string(),
        });
    }
    if config.homeassistant.address.trim().is_empty() {
        return Err(ValidationError::EmptyId {
            field: "homeassistant.address".to_string(),
        });
    }

    Ok(())
}

fn validate_device(device: &DeviceDef, field: &str) -> Result<(), ValidationError> {
    if device.dev.trim().is_empty() {
        return Err(ValidationError::EmptyId {
            field: format!("{field}.dev"),
        });
    }
    if device.circuit.trim().is_empty() {
        return Err(ValidationError::EmptyId {
            field: format!("{field}.circuit"),
        });
    }
    Ok(())
}

fn require_positive(field: &str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}
