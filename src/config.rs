//! Client configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot/session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Server host name or address.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Nickname to register with.
    pub nick: String,
    /// Free-text description sent during registration.
    #[serde(default = "defaults::realname")]
    pub realname: String,
    /// Minimum gap between buffered sends, in milliseconds.
    /// One second keeps most servers' flood limits happy.
    #[serde(default = "defaults::send_interval_ms")]
    pub send_interval_ms: u64,
    /// Fixed pause before a reconnect attempt, in seconds.
    #[serde(default = "defaults::reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    /// When set, pending identity queries older than this many seconds
    /// are resolved as rejected instead of pending forever.
    #[serde(default)]
    pub identify_timeout_secs: Option<u64>,
}

impl BotConfig {
    /// Create a configuration with default timing values.
    pub fn new(
        server: impl Into<String>,
        port: u16,
        nick: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            nick: nick.into(),
            realname: realname.into(),
            send_interval_ms: defaults::send_interval_ms(),
            reconnect_delay_secs: defaults::reconnect_delay_secs(),
            identify_timeout_secs: None,
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BotConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// `host:port` dial address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn identify_timeout(&self) -> Option<Duration> {
        self.identify_timeout_secs.map(Duration::from_secs)
    }
}

mod defaults {
    pub fn realname() -> String {
        "corvid bot".to_string()
    }

    pub fn send_interval_ms() -> u64 {
        1000
    }

    pub fn reconnect_delay_secs() -> u64 {
        5
    }
}
