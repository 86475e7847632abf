//! serial-term library
//!
//! The core of a serial-port terminal: open a device, stream what it sends
//! to an observer, send it commands, and tear the session down cleanly when
//! asked or when the device fails.
//!
//! # Modules
//!
//! - `port`: port abstraction (`SerialPortAdapter`, `PortOpener`), the
//!   `serialport`-backed implementation and an in-memory mock device
//! - `session`: `SessionController`, the inbound pumps, the command writer
//!   and the observer interface
//! - `discovery`: candidate device listing for the port selectors
//! - `command`: terminal directive parsing
//! - `config`: configuration management with TOML support
//! - `logging`: tracing subscriber setup
//! - `error`: unified error handling
//! - `stdio`: line-mode terminal driver
//! - `utf8`: incremental decoding of inbound chunks for display
//! - `tui`: terminal UI application (when `tui` feature is enabled)

pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod port;
pub mod session;
pub mod stdio;
pub mod utf8;

// TUI module
#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types for convenience
pub use error::{AppError, AppResult, SessionError};
pub use port::{
    BaudRate, MockDevice, MockPortOpener, MockSerialPort, PortDescriptor, PortError, PortOpener,
    SerialPortAdapter, SyncSerialPort, SystemPortOpener,
};
pub use session::{
    ChannelObserver, IoMode, SessionController, SessionEvent, SessionObserver, SessionState,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
