//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialPortAdapter`
//! trait so the session controller can be driven by real devices or mocks.

use super::error::PortError;
use super::traits::{BaudRate, PortDescriptor, PortOpener, SerialPortAdapter};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

/// Default read timeout for opened ports.
///
/// Bounds how long a blocked reader waits before it re-checks for cancellation.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port; `None` once closed.
    port: Option<Box<dyn serialport::SerialPort>>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial port at the given rate, 8N1 without flow control.
    ///
    /// # Example
    /// ```no_run
    /// use serial_term::port::{BaudRate, SyncSerialPort, DEFAULT_READ_TIMEOUT};
    ///
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", BaudRate::B115200, DEFAULT_READ_TIMEOUT)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(
        port_name: &str,
        baud_rate: BaudRate,
        read_timeout: Duration,
    ) -> Result<Self, PortError> {
        let port = serialport::new(port_name, baud_rate.as_u32())
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
        })
    }

    fn raw(&self) -> Result<&dyn serialport::SerialPort, PortError> {
        self.port.as_deref().ok_or(PortError::NotOpen)
    }

    fn raw_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::NotOpen)
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&self) -> Result<usize, PortError> {
        Ok(self.raw()?.bytes_to_read()? as usize)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.raw_mut()?.read(buffer).map_err(PortError::Io)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.raw_mut()?.write(data).map_err(PortError::Io)
    }

    fn try_clone_port(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = self.raw()?.try_clone()?;
        Ok(Box::new(Self {
            port: Some(port),
            name: self.name.clone(),
        }))
    }

    fn close(&mut self) -> Result<(), PortError> {
        // Taking the handle drops the file descriptor even if the flush fails.
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        debug!("Closing serial port {}", self.name);
        port.flush().map_err(PortError::Io)
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.as_ref().and_then(|p| p.baud_rate().ok()))
            .finish()
    }
}

/// Opens real devices through the `serialport` crate.
#[derive(Debug, Clone)]
pub struct SystemPortOpener {
    read_timeout: Duration,
}

impl SystemPortOpener {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl Default for SystemPortOpener {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT)
    }
}

impl PortOpener for SystemPortOpener {
    fn open(&self, descriptor: &PortDescriptor) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let port = SyncSerialPort::open(&descriptor.path, descriptor.baud_rate, self.read_timeout)?;
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_error() {
        let result = SyncSerialPort::open(
            "/dev/nonexistent_port_12345",
            BaudRate::B9600,
            DEFAULT_READ_TIMEOUT,
        );

        match result {
            Err(PortError::NotFound(name)) => assert!(name.contains("nonexistent")),
            Err(_) => {}
            Ok(port) => panic!("Expected open to fail, got: {:?}", port),
        }
    }

    #[test]
    fn test_system_opener_reports_failure() {
        let opener = SystemPortOpener::default();
        let descriptor = PortDescriptor::new("/dev/nonexistent_port_67890", BaudRate::B38400);
        assert!(opener.open(&descriptor).is_err());
    }
}
