//! Home Assistant settings client.
//!
//! Each threshold lives in an entity (usually an `input_number`). The REST API
//! reports entity states as strings; switches report `on`/`off`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use sl_config::SettingsDef;
use sl_controls::{SettingId, SettingValues, Thresholds};
use tracing::{debug, warn};

use crate::error::{IoError, IoResult};

#[derive(Debug, Deserialize)]
struct EntityState {
    state: String,
}

/// Numeric value of an entity state.
pub fn parse_state(entity: &str, state: &str) -> IoResult<f64> {
    match state {
        "on" => Ok(1.0),
        "off" => Ok(0.0),
        other => other
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| IoError::State {
                entity: entity.to_string(),
                state: other.to_string(),
            }),
    }
}

/// Result of one settings refresh.
#[derive(Debug)]
pub struct Refresh {
    /// Current values with every successfully fetched entity overlaid.
    pub values: SettingValues,
    pub fetched: usize,
    pub errors: Vec<(SettingId, IoError)>,
}

/// Overlay fetched values on the thresholds currently in force.
pub fn overlay(current: &Thresholds, fetched: &[(SettingId, f64)]) -> SettingValues {
    let mut values = current.values();
    for (id, value) in fetched {
        values.set(*id, *value);
    }
    values
}

pub struct HassClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl HassClient {
    /// Build a client for the instance at `address` (`host:port`). An empty
    /// token disables the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(address: &str, token: &str, timeout: Duration) -> IoResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IoError::Client(e.to_string()))?;
        Ok(Self {
            base_url: format!("http://{address}"),
            token: (!token.is_empty()).then(|| token.to_string()),
            http,
        })
    }

    /// Fetch the numeric state of one entity.
    pub fn fetch(&self, entity_id: &str) -> IoResult<f64> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|e| IoError::request(&url, e))?;
        if !response.status().is_success() {
            return Err(IoError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        let entity: EntityState = response.json().map_err(|e| IoError::parse(&url, e))?;
        parse_state(entity_id, &entity.state)
    }

    /// Fetch every configured setting and overlay the results on `current`.
    ///
    /// Entities that fail keep their current value; the failures are returned
    /// alongside.
    pub fn refresh(&self, settings: &SettingsDef, current: &Thresholds) -> Refresh {
        let mut fetched = Vec::new();
        let mut errors = Vec::new();
        for (id, entity) in settings.entities() {
            match self.fetch(&entity.entity_id) {
                Ok(value) => {
                    debug!(setting = %id, value, "Fetched setting");
                    fetched.push((id, value));
                }
                Err(e) => {
                    warn!(setting = %id, entity = %entity.entity_id, error = %e,
                        "Could not get setting from Home Assistant");
                    errors.push((id, e));
                }
            }
        }
        Refresh {
            values: overlay(current, &fetched),
            fetched: fetched.len(),
            errors,
        }
    }
}
