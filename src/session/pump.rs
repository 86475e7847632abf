//! Inbound pumps: move bytes from an open port to the session observer.
//!
//! Two strategies share one contract. Once started they deliver inbound
//! chunks in device order until stopped, or until a read fails, in which
//! case the failure is reported exactly once and nothing more is delivered.
//!
//! - [`ThreadPump`] blocks in `read_bytes` on a dedicated thread. The port's
//!   read timeout bounds each wait so the loop can observe its cancellation
//!   flag; stopping never kills the thread.
//! - [`PollingPump`] is ticked by the controller's own loop and only ever
//!   reads what `bytes_available` reports, so a tick never blocks.

use super::observer::SessionObserver;
use super::IoMode;
use crate::port::{PortError, SerialPortAdapter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Reported once when the inbound side of a session dies.
pub const READER_FAILED: &str = "Reader thread is terminated unexpectedly.";

/// Size of the first blocking read in each reader iteration.
const READ_CHUNK: usize = 1024;

/// Whether a pump is still producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    Running,
    Failed,
}

/// The active inbound strategy of a session.
#[derive(Debug)]
pub enum InboundPump {
    Thread(ThreadPump),
    Polling(PollingPump),
}

impl InboundPump {
    /// Start the strategy selected by `mode` on its own handle to the device.
    pub fn start(
        mode: IoMode,
        port: Box<dyn SerialPortAdapter>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, PortError> {
        match mode {
            IoMode::Threaded => ThreadPump::start(port, observer).map(Self::Thread),
            IoMode::Polling => Ok(Self::Polling(PollingPump::new(port, observer))),
        }
    }

    /// Called from the controller's loop. Ticks the polling pump; checks the
    /// thread pump for failure.
    pub fn poll(&mut self) -> PumpStatus {
        match self {
            Self::Thread(pump) => pump.status(),
            Self::Polling(pump) => pump.tick(),
        }
    }

    /// Stop producing. Returns once no read is in flight.
    pub fn stop(&mut self) {
        match self {
            Self::Thread(pump) => pump.stop(),
            Self::Polling(pump) => pump.stop(),
        }
    }
}

/// Reader loop on a dedicated thread.
#[derive(Debug)]
pub struct ThreadPump {
    cancel: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadPump {
    pub fn start(
        port: Box<dyn SerialPortAdapter>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, PortError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));

        let handle = {
            let cancel = Arc::clone(&cancel);
            let failed = Arc::clone(&failed);
            thread::Builder::new()
                .name("serial-reader".to_string())
                .spawn(move || reader_loop(port, observer.as_ref(), &cancel, &failed))?
        };

        Ok(Self {
            cancel,
            failed,
            handle: Some(handle),
        })
    }

    pub fn status(&self) -> PumpStatus {
        if self.failed.load(Ordering::Acquire) {
            PumpStatus::Failed
        } else {
            PumpStatus::Running
        }
    }

    /// Signal the loop and wait for it to leave its current read.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Serial reader thread panicked");
            }
        }
    }
}

impl Drop for ThreadPump {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop(
    mut port: Box<dyn SerialPortAdapter>,
    observer: &dyn SessionObserver,
    cancel: &AtomicBool,
    failed: &AtomicBool,
) {
    debug!("Reader started on {}", port.name());
    let mut buffer = vec![0u8; READ_CHUNK];

    while !cancel.load(Ordering::Acquire) {
        let n = match port.read_bytes(&mut buffer) {
            // A timeout is an error, so zero bytes into a non-empty buffer is end of stream.
            Ok(0) => {
                warn!("{} hung up", port.name());
                report_failure(observer, failed);
                break;
            }
            Ok(n) => n,
            Err(e) if e.is_timeout() => continue,
            Err(e) => {
                warn!("Read from {} failed: {}", port.name(), e);
                report_failure(observer, failed);
                break;
            }
        };

        let mut chunk = buffer[..n].to_vec();
        let drained = port.read_available();
        if let Ok(rest) = &drained {
            chunk.extend_from_slice(rest);
        }
        observer.on_data(&chunk);

        if let Err(e) = drained {
            warn!("Draining {} failed: {}", port.name(), e);
            report_failure(observer, failed);
            break;
        }
    }

    if let Err(e) = port.close() {
        debug!("Closing reader handle failed: {}", e);
    }
    debug!("Reader stopped");
}

fn report_failure(observer: &dyn SessionObserver, failed: &AtomicBool) {
    failed.store(true, Ordering::Release);
    observer.on_error(READER_FAILED);
}

/// Non-blocking drain, ticked by the owning loop.
pub struct PollingPump {
    port: Box<dyn SerialPortAdapter>,
    observer: Arc<dyn SessionObserver>,
    failed: bool,
}

impl std::fmt::Debug for PollingPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingPump")
            .field("port", &self.port)
            .field("failed", &self.failed)
            .finish()
    }
}

impl PollingPump {
    pub fn new(port: Box<dyn SerialPortAdapter>, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            port,
            observer,
            failed: false,
        }
    }

    /// Deliver whatever is buffered right now, if anything.
    pub fn tick(&mut self) -> PumpStatus {
        if self.failed {
            return PumpStatus::Failed;
        }

        match self.port.read_available() {
            Ok(chunk) => {
                if !chunk.is_empty() {
                    self.observer.on_data(&chunk);
                }
                PumpStatus::Running
            }
            Err(e) if e.is_timeout() => PumpStatus::Running,
            Err(e) => {
                warn!("Poll of {} failed: {}", self.port.name(), e);
                self.failed = true;
                self.observer.on_error(READER_FAILED);
                PumpStatus::Failed
            }
        }
    }

    /// Stop ticking. Releases this pump's handle on the device.
    pub fn stop(&mut self) {
        if let Err(e) = self.port.close() {
            debug!("Closing poller handle failed: {}", e);
        }
    }
}
