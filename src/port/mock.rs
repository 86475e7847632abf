//! Mock serial devices for testing.
//!
//! A [`MockDevice`] stands in for the far end of a serial cable: tests push
//! bytes into its inbound buffer, inspect what was written, and inject
//! failures. [`MockSerialPort`] is an open handle on such a device and
//! implements [`SerialPortAdapter`], blocking on reads for up to its read
//! timeout exactly like a real port. [`MockPortOpener`] hands out handles by
//! path so a `SessionController` can be exercised end to end.

use super::error::PortError;
use super::traits::{PortDescriptor, PortOpener, SerialPortAdapter};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default read timeout for mock handles.
const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Inner state of the mock device, shared by every handle.
#[derive(Debug, Default)]
struct MockDeviceState {
    /// Bytes the device has sent that no handle has read yet.
    read_queue: VecDeque<u8>,
    /// Log of all writes, one entry per write call.
    write_log: Vec<Vec<u8>>,
    /// Reads fail as if the cable was pulled.
    fail_reads: bool,
    /// Blocking reads return zero bytes, as a hung-up line does.
    hung_up: bool,
    /// Writes fail.
    fail_writes: bool,
    /// Closing a handle reports an error.
    fail_close: bool,
    /// Cloning a handle fails.
    fail_clone: bool,
    /// Opening the device fails as if it was busy.
    busy: bool,
    /// Number of handles currently open.
    open_handles: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockDeviceState>,
    readable: Condvar,
}

/// The device end of a mock serial link.
///
/// Cloning yields another reference to the same device.
///
/// # Example
/// ```
/// use serial_term::port::{MockDevice, SerialPortAdapter};
///
/// let device = MockDevice::new("MOCK0");
/// let mut port = device.open_handle();
///
/// device.push_inbound(b"Hello, World!");
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(device.write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Debug, Clone)]
pub struct MockDevice {
    name: String,
    shared: Arc<Shared>,
}

impl MockDevice {
    /// Create a new mock device with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a handle with the default read timeout.
    pub fn open_handle(&self) -> MockSerialPort {
        self.open_handle_with_timeout(MOCK_READ_TIMEOUT)
    }

    /// Open a handle whose blocking reads give up after `read_timeout`.
    pub fn open_handle_with_timeout(&self, read_timeout: Duration) -> MockSerialPort {
        self.shared.state.lock().open_handles += 1;
        MockSerialPort {
            device: self.clone(),
            read_timeout,
            open: true,
        }
    }

    /// Make bytes available to readers, as if the device had sent them.
    pub fn push_inbound(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.readable.notify_all();
    }

    /// Bytes sent by the device and not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }

    /// Every write performed on any handle, in order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    /// Simulate the device disappearing for readers.
    pub fn set_fail_reads(&self, fail: bool) {
        let mut state = self.shared.state.lock();
        state.fail_reads = fail;
        self.shared.readable.notify_all();
    }

    /// Simulate a hangup: blocking reads return `Ok(0)` immediately.
    pub fn set_hung_up(&self, hung_up: bool) {
        let mut state = self.shared.state.lock();
        state.hung_up = hung_up;
        self.shared.readable.notify_all();
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.shared.state.lock().fail_close = fail;
    }

    pub fn set_fail_clone(&self, fail: bool) {
        self.shared.state.lock().fail_clone = fail;
    }

    /// Make subsequent opens through a [`MockPortOpener`] fail.
    pub fn set_busy(&self, busy: bool) {
        self.shared.state.lock().busy = busy;
    }

    fn is_busy(&self) -> bool {
        self.shared.state.lock().busy
    }

    /// Number of handles on this device that have not been closed.
    pub fn open_handles(&self) -> usize {
        self.shared.state.lock().open_handles
    }
}

/// An open handle on a [`MockDevice`].
#[derive(Debug)]
pub struct MockSerialPort {
    device: MockDevice,
    read_timeout: Duration,
    open: bool,
}

impl MockSerialPort {
    /// Create a new device and return an open handle on it.
    pub fn new(name: impl Into<String>) -> Self {
        MockDevice::new(name).open_handle()
    }

    /// The device this handle is attached to.
    pub fn device(&self) -> &MockDevice {
        &self.device
    }

    fn ensure_open(&self) -> Result<(), PortError> {
        if self.open {
            Ok(())
        } else {
            Err(PortError::NotOpen)
        }
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn name(&self) -> &str {
        &self.device.name
    }

    fn bytes_available(&self) -> Result<usize, PortError> {
        self.ensure_open()?;
        let state = self.device.shared.state.lock();
        if state.fail_reads {
            return Err(PortError::io(ErrorKind::BrokenPipe, "device disconnected"));
        }
        Ok(state.read_queue.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.ensure_open()?;
        if buffer.is_empty() {
            return Ok(0);
        }

        let shared = &self.device.shared;
        let deadline = Instant::now() + self.read_timeout;
        let mut state = shared.state.lock();
        loop {
            if state.fail_reads {
                return Err(PortError::io(ErrorKind::BrokenPipe, "device disconnected"));
            }
            if state.hung_up {
                return Ok(0);
            }
            if !state.read_queue.is_empty() {
                break;
            }
            if shared.readable.wait_until(&mut state, deadline).timed_out() {
                return Err(PortError::io(ErrorKind::TimedOut, "Operation timed out"));
            }
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.ensure_open()?;
        let mut state = self.device.shared.state.lock();
        if state.fail_writes {
            return Err(PortError::io(ErrorKind::BrokenPipe, "device disconnected"));
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn try_clone_port(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        self.ensure_open()?;
        if self.device.shared.state.lock().fail_clone {
            return Err(PortError::io(ErrorKind::Other, "clone failed"));
        }
        Ok(Box::new(
            self.device.open_handle_with_timeout(self.read_timeout),
        ))
    }

    fn close(&mut self) -> Result<(), PortError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let mut state = self.device.shared.state.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
        if state.fail_close {
            return Err(PortError::io(ErrorKind::Other, "close failed"));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Hands out [`MockSerialPort`] handles for registered devices.
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    devices: HashMap<String, MockDevice>,
    read_timeout: Option<Duration>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under its name.
    pub fn with_device(mut self, device: &MockDevice) -> Self {
        self.devices.insert(device.name().to_string(), device.clone());
        self
    }

    /// Read timeout for handles opened from now on.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = Some(read_timeout);
        self
    }
}

impl PortOpener for MockPortOpener {
    fn open(&self, descriptor: &PortDescriptor) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let device = self
            .devices
            .get(&descriptor.path)
            .ok_or_else(|| PortError::not_found(&descriptor.path))?;
        if device.is_busy() {
            return Err(PortError::io(ErrorKind::Other, "device busy"));
        }
        let timeout = self.read_timeout.unwrap_or(MOCK_READ_TIMEOUT);
        Ok(Box::new(device.open_handle_with_timeout(timeout)))
    }
}
