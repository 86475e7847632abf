//! Port-specific error types.
//!
//! Defines error types for serial port operations, separate from session-level
//! errors so the controller can decide which failures are fatal to a session.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested baud rate is not one the terminal offers.
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaud(u32),

    /// Attempted to use a port handle that has been closed.
    #[error("Port is not open")]
    NotOpen,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an I/O error of the given kind.
    pub fn io(kind: std::io::ErrorKind, message: &str) -> Self {
        Self::Io(std::io::Error::new(kind, message.to_string()))
    }

    /// Whether this error only means "no data arrived within the read timeout".
    ///
    /// Readers treat these as an empty read, never as a device failure.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::UnsupportedBaud(57600);
        assert_eq!(err.to_string(), "Unsupported baud rate: 57600");

        let err = PortError::NotOpen;
        assert_eq!(err.to_string(), "Port is not open");
    }

    #[test]
    fn test_timeout_classification() {
        assert!(PortError::io(ErrorKind::TimedOut, "t").is_timeout());
        assert!(PortError::io(ErrorKind::WouldBlock, "w").is_timeout());
        assert!(PortError::io(ErrorKind::Interrupted, "i").is_timeout());
        assert!(!PortError::io(ErrorKind::BrokenPipe, "gone").is_timeout());
        assert!(!PortError::NotOpen.is_timeout());
    }
}
