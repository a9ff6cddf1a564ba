//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Which transport carries client frames.
    #[serde(default)]
    pub transport: TransportKind,

    /// Listen address for the TCP transport.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Dispatch loop settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            transport: TransportKind::default(),
            bind_address: default_bind_address(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport == TransportKind::Tcp {
            self.socket_addr()?;
        }

        if self.dispatch.max_messages_per_tick == 0 {
            return Err(ConfigError::ValidationError {
                message: "dispatch.max_messages_per_tick must be greater than zero".to_string(),
            });
        }

        if self.dispatch.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "dispatch.tick_interval_ms must be greater than zero".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        Ok(())
    }

    /// Parses `bind_address`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the address is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                message: format!(
                    "Invalid bind_address '{}'. Expected host:port, e.g. 127.0.0.1:8765",
                    self.bind_address
                ),
            })
    }
}

/// Transport used to talk to clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited frames over TCP connections.
    #[default]
    Tcp,
    /// A single client over stdin/stdout.
    Stdio,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Stdio => f.write_str("stdio"),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8765".to_string()
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Upper bound on messages handled per tick.
    /// Default: 16
    #[serde(default = "default_max_messages_per_tick")]
    pub max_messages_per_tick: usize,

    /// Time between ticks, in milliseconds.
    /// Default: 10
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks to hold the queue if nobody initialises the registries.
    /// Default: 50
    #[serde(default = "default_startup_delay_ticks")]
    pub startup_delay_ticks: u32,
}

impl DispatchConfig {
    /// The tick interval as a `Duration`.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_messages_per_tick: default_max_messages_per_tick(),
            tick_interval_ms: default_tick_interval_ms(),
            startup_delay_ticks: default_startup_delay_ticks(),
        }
    }
}

const fn default_max_messages_per_tick() -> usize {
    16
}

const fn default_tick_interval_ms() -> u64 {
    10
}

const fn default_startup_delay_ticks() -> u32 {
    50
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
