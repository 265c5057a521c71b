//! Error types for sermsg Core

use thiserror::Error;

/// Configuration errors.
///
/// Framing and parsing never fail; malformed input degrades instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Buffer size too small: {size} < {min}")]
    BufferTooSmall { size: usize, min: usize },

    #[error("Argument capacity must be at least 1")]
    NoArguments,

    #[error("Start and end markers must differ (both {0:?})")]
    MarkersEqual(char),

    #[error("Invalid marker {0:?}: markers must be ASCII and not a digit, sign, comma or whitespace")]
    InvalidMarker(char),

    #[error("Unknown overflow policy: {0}")]
    UnknownPolicy(String),
}

/// Result type alias for sermsg Core operations
pub type Result<T> = std::result::Result<T, ConfigError>;
