//! Application service layer for solarloop.
//!
//! Glues configuration, the gateway and settings clients, the control loop,
//! and the monitoring server into a running process, and offers the
//! configuration helpers the CLI needs.

pub mod config_service;
pub mod error;
pub mod runtime;
pub mod server;
pub mod settings_sync;
pub mod startup;
pub mod status;

pub use config_service::{ConfigSummary, Overrides, apply_overrides, flow_for, load_config, summarize};
pub use error::{AppError, AppResult};
pub use runtime::{run, step};
pub use server::{AppState, router};
pub use settings_sync::{RefreshOutcome, apply_refresh, refresh_once};
pub use startup::wait_for_sensors;
pub use status::{StatusBoard, StatusView};
