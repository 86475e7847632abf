//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both real serial ports
//! and mock devices to be used interchangeably, and the `PortOpener` seam
//! the session controller opens ports through.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Baud rates offered by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B9600,
    B38400,
    B115200,
    B1200000,
}

impl BaudRate {
    /// All supported rates, slowest first.
    pub const ALL: [BaudRate; 4] = [
        BaudRate::B9600,
        BaudRate::B38400,
        BaudRate::B115200,
        BaudRate::B1200000,
    ];

    /// Bits per second.
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::B9600 => 9600,
            Self::B38400 => 38400,
            Self::B115200 => 115_200,
            Self::B1200000 => 1_200_000,
        }
    }

    /// The next rate in `ALL`, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|b| *b == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self::B115200
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = PortError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_u32() == value)
            .ok_or(PortError::UnsupportedBaud(value))
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.as_u32()
    }
}

impl FromStr for BaudRate {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| PortError::config(format!("not a baud rate: {s:?}")))?;
        Self::try_from(value)
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// What to open: a device path and the rate to open it at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub path: String,
    pub baud_rate: BaudRate,
}

impl PortDescriptor {
    pub fn new(path: impl Into<String>, baud_rate: BaudRate) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.path, self.baud_rate)
    }
}

/// Trait for serial port I/O operations.
///
/// This trait abstracts over an open serial device handle, allowing both
/// real hardware ports and mock devices for testing.
pub trait SerialPortAdapter: Send + fmt::Debug {
    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Number of received bytes waiting to be read. Never blocks.
    fn bytes_available(&self) -> Result<usize, PortError>;

    /// Read bytes into the provided buffer.
    ///
    /// Waits at most the handle's read timeout for the first byte. A timeout
    /// is reported as an error for which [`PortError::is_timeout`] is true.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Open a second, independent handle on the same device.
    ///
    /// Reads on one handle and writes on the other may proceed concurrently.
    fn try_clone_port(&self) -> Result<Box<dyn SerialPortAdapter>, PortError>;

    /// Close this handle.
    ///
    /// Idempotent. On error the handle is still considered closed.
    fn close(&mut self) -> Result<(), PortError>;

    /// Whether this handle is still open.
    fn is_open(&self) -> bool;

    /// Write the whole buffer, retrying short writes.
    fn write_all_bytes(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            match self.write_bytes(data) {
                Ok(0) => {
                    return Err(PortError::io(
                        std::io::ErrorKind::WriteZero,
                        "device accepted no bytes",
                    ))
                }
                Ok(n) => data = &data[n..],
                Err(e) if e.is_timeout() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Drain exactly the bytes that are buffered right now.
    ///
    /// Returns an empty vector when nothing is waiting. Does not wait for
    /// more data than `bytes_available` reported.
    fn read_available(&mut self) -> Result<Vec<u8>, PortError> {
        let pending = self.bytes_available()?;
        let mut data = vec![0u8; pending];
        let mut filled = 0;
        while filled < pending {
            match self.read_bytes(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.is_timeout() => break,
                Err(e) => return Err(e),
            }
        }
        data.truncate(filled);
        Ok(data)
    }
}

/// Opens serial devices for the session controller.
pub trait PortOpener: Send {
    /// Open `descriptor.path` at `descriptor.baud_rate`.
    fn open(&self, descriptor: &PortDescriptor) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
