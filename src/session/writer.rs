//! Outbound command writes.
//!
//! A submission is one write of exactly the bytes supplied; nothing is
//! appended and nothing is retried. Failures are reported once through the
//! observer and leave the session connected.

use super::observer::SessionObserver;
use super::IoMode;
use crate::port::SerialPortAdapter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Reported once per failed submission.
pub const WRITER_FAILED: &str = "Writer thread is terminated unexpectedly.";

/// The session's write handle, shared with in-flight writer workers.
pub type SharedPort = Arc<Mutex<Box<dyn SerialPortAdapter>>>;

/// Performs command submissions for a session.
///
/// Submissions are not queued. With the `Worker` variant a submit made while
/// the previous write is still in flight first waits for that write to
/// finish, so two writes never run at once.
#[derive(Debug)]
pub enum CommandWriter {
    /// Write on the caller's thread.
    Inline,
    /// Write on a short-lived thread per submission.
    Worker { in_flight: Option<JoinHandle<()>> },
}

impl CommandWriter {
    /// The writer that goes with an inbound strategy.
    pub fn for_mode(mode: IoMode) -> Self {
        match mode {
            IoMode::Threaded => Self::Worker { in_flight: None },
            IoMode::Polling => Self::Inline,
        }
    }

    /// Write `command` to `port`.
    pub fn submit(
        &mut self,
        port: &SharedPort,
        command: Vec<u8>,
        observer: &Arc<dyn SessionObserver>,
    ) {
        match self {
            Self::Inline => write_command(port, &command, observer.as_ref()),
            Self::Worker { in_flight } => {
                if let Some(previous) = in_flight.take() {
                    join_worker(previous);
                }

                let port = Arc::clone(port);
                let worker_observer = Arc::clone(observer);
                let spawned = thread::Builder::new()
                    .name("serial-writer".to_string())
                    .spawn(move || write_command(&port, &command, worker_observer.as_ref()));

                match spawned {
                    Ok(handle) => *in_flight = Some(handle),
                    Err(e) => {
                        error!("Failed to spawn writer thread: {}", e);
                        observer.on_error(WRITER_FAILED);
                    }
                }
            }
        }
    }

    /// Wait for the outstanding write, if any, to complete.
    pub fn wait(&mut self) {
        if let Self::Worker { in_flight } = self {
            if let Some(handle) = in_flight.take() {
                join_worker(handle);
            }
        }
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("Serial writer thread panicked");
    }
}

fn write_command(port: &SharedPort, command: &[u8], observer: &dyn SessionObserver) {
    let result = port.lock().write_all_bytes(command);
    match result {
        Ok(()) => debug!("Wrote {} bytes", command.len()),
        Err(e) => {
            warn!("Write failed: {}", e);
            observer.on_error(WRITER_FAILED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockDevice;
    use crate::session::observer::{ChannelObserver, SessionEvent};
    use std::sync::mpsc;

    fn shared(device: &MockDevice) -> SharedPort {
        let port: Box<dyn SerialPortAdapter> = Box::new(device.open_handle());
        Arc::new(Mutex::new(port))
    }

    #[test]
    fn test_inline_writes_exact_bytes() {
        let device = MockDevice::new("MOCK0");
        let (tx, rx) = mpsc::channel::<SessionEvent>();
        let observer: Arc<dyn SessionObserver> = Arc::new(ChannelObserver::new(tx));
        let port = shared(&device);

        let mut writer = CommandWriter::for_mode(IoMode::Polling);
        writer.submit(&port, b"AT\r".to_vec(), &observer);

        assert_eq!(device.write_log(), vec![b"AT\r".to_vec()]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_worker_writes_after_wait() {
        let device = MockDevice::new("MOCK0");
        let (tx, rx) = mpsc::channel::<SessionEvent>();
        let observer: Arc<dyn SessionObserver> = Arc::new(ChannelObserver::new(tx));
        let port = shared(&device);

        let mut writer = CommandWriter::for_mode(IoMode::Threaded);
        writer.submit(&port, b"first".to_vec(), &observer);
        writer.submit(&port, b"second".to_vec(), &observer);
        writer.wait();

        assert_eq!(device.write_log(), vec![b"first".to_vec(), b"second".to_vec()]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_write_failure_reported_once() {
        let device = MockDevice::new("MOCK0");
        let (tx, rx) = mpsc::channel::<SessionEvent>();
        let observer: Arc<dyn SessionObserver> = Arc::new(ChannelObserver::new(tx));
        let port = shared(&device);
        device.set_fail_writes(true);

        let mut writer = CommandWriter::for_mode(IoMode::Threaded);
        writer.submit(&port, b"lost".to_vec(), &observer);
        writer.wait();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![SessionEvent::Error(WRITER_FAILED.to_string())]);
    }
}
