//! Configuration loading, command-line overrides, and introspection.

use std::path::Path;

use sl_config::Config;
use sl_controls::Thresholds;

use crate::error::{AppError, AppResult};

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub evok_address: Option<String>,
    pub hass_address: Option<String>,
    pub hass_token: Option<String>,
    pub listen: Option<String>,
    /// Only ever switches inversion on; the file decides otherwise.
    pub invert: bool,
}

/// Summary of a loaded configuration for display.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub thresholds: Thresholds,
    pub evok_address: String,
    pub hass_address: String,
    pub listen: String,
    pub invert: bool,
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> AppResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(sl_config::from_yaml_str(&content)?)
}

/// Apply overrides and re-validate the result.
pub fn apply_overrides(mut config: Config, overrides: &Overrides) -> AppResult<Config> {
    if let Some(address) = &overrides.evok_address {
        config.evok.address = address.clone();
    }
    if let Some(address) = &overrides.hass_address {
        config.homeassistant.address = address.clone();
    }
    if let Some(token) = &overrides.hass_token {
        config.homeassistant.token = token.clone();
    }
    if let Some(listen) = &overrides.listen {
        config.server.listen = listen.clone();
    }
    if overrides.invert {
        config.control.invert = true;
    }
    sl_config::validate_config(&config)?;
    Ok(config)
}

pub fn summarize(config: &Config) -> AppResult<ConfigSummary> {
    Ok(ConfigSummary {
        thresholds: config.thresholds()?,
        evok_address: config.evok.address.clone(),
        hass_address: config.homeassistant.address.clone(),
        listen: config.server.listen.clone(),
        invert: config.control.invert,
    })
}

/// Duty the configured flow curve yields for `delta`, and the value the
/// regulator would actually receive.
pub fn flow_for(config: &Config, delta: f64) -> AppResult<(f64, f64)> {
    if !delta.is_finite() {
        return Err(AppError::InvalidInput(format!("delta must be finite, got {delta}")));
    }
    let thresholds = config.thresholds()?;
    let options = config.control_options()?;
    let duty = thresholds.flow().duty(delta);
    Ok((duty, options.output.apply(duty)))
}
