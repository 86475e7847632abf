//! Application-level error types.
//!
//! Session I/O failures never surface here; the controller turns them into
//! observer events. These types cover caller mistakes and front-end plumbing.

use crate::config::ConfigError;
use crate::port::PortError;
use thiserror::Error;

/// Precondition violations reported by the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A command was submitted with no open session.
    #[error("Not connected to a serial port.")]
    NotConnected,
}

/// Unified error type for the terminal front ends.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Port(#[from] PortError),

    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// A specialized `Result` type for front-end code.
pub type AppResult<T> = Result<T, AppError>;
