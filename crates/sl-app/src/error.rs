//! Error types for the sl-app service layer.

use std::path::PathBuf;
use std::time::Duration;

/// Application error type wrapping the backend crates' errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Control error: {0}")]
    Control(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Sensors still missing after {waited:?}: {missing}")]
    SensorTimeout { waited: Duration, missing: String },

    #[error("HTTP server error: {0}")]
    Server(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sl-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<sl_config::ConfigError> for AppError {
    fn from(err: sl_config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sl_config::ValidationError> for AppError {
    fn from(err: sl_config::ValidationError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sl_controls::ControlError> for AppError {
    fn from(err: sl_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}

impl From<sl_io::IoError> for AppError {
    fn from(err: sl_io::IoError) -> Self {
        AppError::Gateway(err.to_string())
    }
}
