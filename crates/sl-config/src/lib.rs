//! sl-config: controller configuration file format and validation.

pub mod convert;
pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_config};

use sl_controls::{ControlError, ControlOptions, Thresholds};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn from_yaml_str(content: &str) -> ConfigResult<Config> {
    let config: Config = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Pretty JSON view of a loaded configuration.
pub fn to_json(config: &Config) -> ConfigResult<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

impl Config {
    pub fn thresholds(&self) -> ConfigResult<Thresholds> {
        Ok(convert::thresholds(&self.settings)?)
    }

    pub fn control_options(&self) -> ConfigResult<ControlOptions> {
        Ok(convert::control_options(&self.control)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
sensors:
  solarUp: { dev: ai, circuit: "1_01" }
  solarIn: { dev: temp, circuit: "28A" }
  solarOut: { dev: temp, circuit: "28B" }
  tankUp: { dev: temp, circuit: "28C" }
actuators:
  pump: { dev: relay, circuit: "1_01" }
  switch: { dev: relay, circuit: "1_02" }
  flow: { dev: ao, circuit: "1_01" }
settings:
  solarCritical: { entity_id: input_number.solar_critical, value: 90 }
  solarOn: { entity_id: input_number.solar_on, value: 6 }
  solarOff: { entity_id: input_number.solar_off, value: 5 }
  tankMax: { entity_id: input_number.tank_max, value: 65 }
  flow:
    tempMin: { entity_id: input_number.flow_temp_min, value: 5 }
    tempMax: { entity_id: input_number.flow_temp_max, value: 9 }
    dutyMin: { entity_id: input_number.flow_duty_min, value: 1.8 }
    dutyMax: { entity_id: input_number.flow_duty_max, value: 3 }
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.control, ControlDef::default());
        assert_eq!(config.server.listen, "0.0.0.0:7001");
        assert_eq!(config.actuators.valve.circuit, "1_02");

        let thresholds = config.thresholds().unwrap();
        assert_eq!(thresholds.solar_on(), 6.0);
        assert_eq!(thresholds.flow().duty_min(), 1.8);

        let options = config.control_options().unwrap();
        assert_eq!(options.reduction_window.as_secs(), 1800);
        assert!(!options.output.invert);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let text = format!("{MINIMAL}\nmqtt: {{ broker: tcp://localhost }}\n");
        assert!(matches!(from_yaml_str(&text), Err(ConfigError::Yaml(_))));

        let text = MINIMAL.replace("tankUp: { dev: temp", "tankUp: { extra: 1, dev: temp");
        assert!(matches!(from_yaml_str(&text), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn inverted_hysteresis_is_rejected() {
        let text = MINIMAL.replace("solar_off, value: 5", "solar_off, value: 7");
        assert!(matches!(
            from_yaml_str(&text),
            Err(ConfigError::Validation(ValidationError::Thresholds { .. }))
        ));
    }

    #[test]
    fn shared_sensor_device_is_rejected() {
        let text = MINIMAL.replace("circuit: \"28C\"", "circuit: \"28B\"");
        let err = from_yaml_str(&text).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::DuplicateDevice { .. })
        ));
    }

    #[test]
    fn bad_listen_address_is_rejected() {
        let text = format!("{MINIMAL}\nserver: {{ listen: \"nowhere\" }}\n");
        let err = from_yaml_str(&text).unwrap_err();
        assert!(err.to_string().contains("server.listen"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let text = format!("{MINIMAL}\ncontrol: {{ poll_interval_s: 0 }}\n");
        assert!(from_yaml_str(&text).is_err());
    }

    #[test]
    fn duty_above_regulator_range_is_rejected() {
        let text = format!("{MINIMAL}\ncontrol: {{ flow_max: 2.5 }}\n");
        let err = from_yaml_str(&text).unwrap_err();
        assert!(err.to_string().contains("regulator range"));
    }
}
