//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::{ConfigError, ConfigResult};
use crate::port::BaudRate;
use crate::session::IoMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial port configuration
    pub serial: SerialConfig,
    /// Terminal front-end configuration
    pub terminal: TerminalConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        BaudRate::try_from(self.serial.default_baud)
            .map_err(|e| ConfigError::validation("serial.default_baud", e.to_string()))?;
        if self.serial.read_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "serial.read_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.serial.poll_interval_ms == 0 {
            return Err(ConfigError::validation(
                "serial.poll_interval_ms",
                "must be greater than zero",
            ));
        }
        if self.terminal.refresh_rate_hz == 0 {
            return Err(ConfigError::validation(
                "terminal.refresh_rate_hz",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port to connect to on startup
    pub default_port: Option<String>,
    /// Baud rate for new connections; one of 9600, 38400, 115200, 1200000
    pub default_baud: u32,
    /// Inbound/outbound scheduling model
    pub io_mode: IoMode,
    /// Read timeout of opened ports, in milliseconds
    pub read_timeout_ms: u64,
    /// Interval between session polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Device path prefixes offered for selection, in display order
    pub port_prefixes: Vec<String>,
    /// Port aliases for convenience
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_port: None,
            default_baud: 115_200,
            io_mode: IoMode::Threaded,
            read_timeout_ms: 50,
            poll_interval_ms: 10,
            port_prefixes: vec!["/dev/ttyUSB".to_string(), "/dev/ttyS".to_string()],
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// The configured default rate, falling back to 115200 if it is invalid.
    pub fn baud_rate(&self) -> BaudRate {
        BaudRate::try_from(self.default_baud).unwrap_or_default()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Terminator appended to typed commands by the front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    None,
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::None => b"",
            Self::Lf => b"\n",
            Self::Cr => b"\r",
            Self::CrLf => b"\r\n",
        }
    }

    /// `text` followed by this terminator.
    pub fn apply(self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() + 2);
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(self.as_bytes());
        bytes
    }
}

impl FromStr for LineEnding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "lf" => Ok(Self::Lf),
            "cr" => Ok(Self::Cr),
            "crlf" => Ok(Self::CrLf),
            other => Err(format!(
                "unknown line ending '{other}' (expected none, lf, cr or crlf)"
            )),
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Lf => "lf",
            Self::Cr => "cr",
            Self::CrLf => "crlf",
        })
    }
}

/// Terminal front-end configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Terminator appended to each typed command
    pub line_ending: LineEnding,
    /// Echo sent commands into the log as `> cmd`
    pub echo_commands: bool,
    /// Prefix info and error lines with the local time
    pub show_timestamps: bool,
    /// Command history size
    pub history_size: usize,
    /// Lines kept in the TUI log view
    pub buffer_lines: usize,
    /// Theme name: "dark", "light", "nord"
    pub theme: String,
    /// TUI refresh rate in Hz
    pub refresh_rate_hz: u32,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::Lf,
            echo_commands: true,
            show_timestamps: false,
            history_size: 100,
            buffer_lines: 1000,
            theme: "dark".to_string(),
            refresh_rate_hz: 30,
        }
    }
}

impl TerminalConfig {
    /// Get refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.refresh_rate_hz.max(1) as u64)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path (optional); stderr when unset
    pub file: Option<PathBuf>,
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
