//! sl-io: HTTP clients for the device gateway and the settings provider.
//!
//! Both clients are blocking and meant to run on plain threads, outside any
//! async runtime.

pub mod error;
pub mod evok;
pub mod homeassistant;

pub use error::{IoError, IoResult};
pub use evok::{DeviceReading, EvokClient, SensorRouter, format_value, panel_temperature, poll_sensors};
pub use homeassistant::{HassClient, Refresh, overlay, parse_state};
