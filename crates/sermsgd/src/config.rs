//! Daemon configuration file
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 2323
//! echo = true
//!
//! [engine]
//! buffer_size = 64
//! max_args = 30
//! overflow = "truncate"
//!
//! [log]
//! level = "info"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use sermsg_core::EngineConfig;

/// Default TCP port (telnet's 23 needs privileges)
pub const DEFAULT_PORT: u16 = 2323;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
    /// Write parsed arguments back to the peer
    pub echo: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            echo: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Everything the daemon reads from its TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerSection,
    pub engine: EngineConfig,
    pub log: LogSection,
}

impl DaemonConfig {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }
}
