//! Transport error types

use thiserror::Error;

/// Transport-specific errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid engine configuration: {0}")]
    Config(#[from] sermsg_core::ConfigError),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
