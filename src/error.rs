//! Gateway-level errors.
//!
//! Per-request failures never surface here: they are translated into HTTP
//! responses. These are the errors that stop the process from starting or
//! serving.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid upstream origin: {0}")]
    Origin(#[from] url::ParseError),

    #[error("invalid header configuration: {0}")]
    Header(String),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
