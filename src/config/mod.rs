//! Configuration module for serial-term.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_TERM_CONFIG` environment variable (explicit path)
//! 2. `./serial-term.toml` (current directory)
//! 3. `~/.config/serial-term/config.toml` (or the platform equivalent)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Common values can be overridden via environment variables named
//! `SERIAL_TERM_<SECTION>_<KEY>`, e.g. `SERIAL_TERM_SERIAL_DEFAULT_BAUD=9600`
//! or `SERIAL_TERM_SERIAL_IO_MODE=polling`.
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_term::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//! println!("Default baud: {}", config.serial.default_baud);
//! # Ok::<(), serial_term::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LineEnding, LogFormat, LoggingConfig, SerialConfig, TerminalConfig};
