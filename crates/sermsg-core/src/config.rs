//! Engine configuration

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Default frame buffer capacity in bytes (terminator included)
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Default argument capacity
pub const DEFAULT_MAX_ARGS: usize = 30;

/// Default start-of-frame marker
pub const DEFAULT_START_MARKER: char = '!';

/// Default end-of-frame marker
pub const DEFAULT_END_MARKER: char = ';';

/// Smallest buffer that can hold a terminator behind the pinned cursor
pub const MIN_BUFFER_SIZE: usize = 2;

/// What happens to a frame whose payload does not fit the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the first `buffer_size - 2` bytes and deliver the frame
    #[default]
    Truncate,
    /// Drop the frame when its end marker arrives
    Reject,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::Truncate => write!(f, "truncate"),
            OverflowPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for OverflowPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "truncate" => Ok(OverflowPolicy::Truncate),
            "reject" | "drop" => Ok(OverflowPolicy::Reject),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Construction-time parameters of a `MessageEngine`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame buffer capacity, including the terminator slot
    pub buffer_size: usize,
    /// Maximum number of arguments kept per frame
    pub max_args: usize,
    pub start_marker: char,
    pub end_marker: char,
    pub overflow: OverflowPolicy,
}

impl EngineConfig {
    pub fn new(buffer_size: usize, max_args: usize) -> Self {
        Self {
            buffer_size,
            max_args,
            ..Self::default()
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_args(mut self, max_args: usize) -> Self {
        self.max_args = max_args;
        self
    }

    pub fn with_markers(mut self, start: char, end: char) -> Self {
        self.start_marker = start;
        self.end_marker = end;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Check the invariants the assembler relies on
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(ConfigError::BufferTooSmall {
                size: self.buffer_size,
                min: MIN_BUFFER_SIZE,
            });
        }

        if self.max_args == 0 {
            return Err(ConfigError::NoArguments);
        }

        for marker in [self.start_marker, self.end_marker] {
            if !is_valid_marker(marker) {
                return Err(ConfigError::InvalidMarker(marker));
            }
        }

        if self.start_marker == self.end_marker {
            return Err(ConfigError::MarkersEqual(self.start_marker));
        }

        Ok(())
    }

    pub(crate) fn start_byte(&self) -> u8 {
        self.start_marker as u8
    }

    pub(crate) fn end_byte(&self) -> u8 {
        self.end_marker as u8
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_args: DEFAULT_MAX_ARGS,
            start_marker: DEFAULT_START_MARKER,
            end_marker: DEFAULT_END_MARKER,
            overflow: OverflowPolicy::default(),
        }
    }
}

fn is_valid_marker(c: char) -> bool {
    c.is_ascii()
        && !c.is_ascii_digit()
        && !c.is_ascii_whitespace()
        && !matches!(c, ',' | '+' | '-' | '\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_marker, '!');
        assert_eq!(config.end_marker, ';');
        assert_eq!(config.overflow, OverflowPolicy::Truncate);
    }

    #[test]
    fn test_buffer_too_small() {
        let config = EngineConfig::new(1, 4);
        assert_eq!(
            config.validate(),
            Err(ConfigError::BufferTooSmall { size: 1, min: 2 })
        );
        assert!(EngineConfig::new(2, 4).validate().is_ok());
    }

    #[test]
    fn test_zero_args() {
        assert_eq!(EngineConfig::new(16, 0).validate(), Err(ConfigError::NoArguments));
    }

    #[test]
    fn test_marker_rules() {
        let same = EngineConfig::default().with_markers('#', '#');
        assert_eq!(same.validate(), Err(ConfigError::MarkersEqual('#')));

        for bad in ['5', ',', '-', '+', ' ', 'é'] {
            let config = EngineConfig::default().with_markers(bad, ';');
            assert_eq!(config.validate(), Err(ConfigError::InvalidMarker(bad)));
        }

        assert!(EngineConfig::default().with_markers('<', '>').validate().is_ok());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("truncate".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Truncate);
        assert_eq!("REJECT".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Reject);
        assert!(matches!(
            "explode".parse::<OverflowPolicy>(),
            Err(ConfigError::UnknownPolicy(_))
        ));
        assert_eq!(OverflowPolicy::Reject.to_string(), "reject");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_args": 4, "overflow": "reject"}"#).unwrap();
        assert_eq!(config.max_args, 4);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.overflow, OverflowPolicy::Reject);
    }
}
