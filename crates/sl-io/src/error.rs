//! Error types for gateway and settings-provider access.

use thiserror::Error;

pub type IoResult<T> = Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("Could not build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Could not parse response from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Entity {entity} has non-numeric state '{state}'")]
    State { entity: String, state: String },
}

impl IoError {
    pub(crate) fn request(url: &str, err: reqwest::Error) -> Self {
        IoError::Request {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(url: &str, message: impl ToString) -> Self {
        IoError::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}
