//! Session lifecycle: connect, stream, send, tear down.
//!
//! A [`SessionController`] owns at most one open port. It selects an inbound
//! strategy at construction ([`IoMode`]), reports everything through a
//! [`SessionObserver`], and never lets an I/O failure escape to its caller.
//!
//! ```text
//! connect ──> PortOpener::open ──> InboundPump::start ──> observer.on_data ...
//! send_command ──> CommandWriter::submit ──> port.write
//! pump failure ──> poll() ──> disconnect path
//! ```
//!
//! The owner must call [`SessionController::poll`] periodically (every
//! [`DEFAULT_POLL_INTERVAL`] or so). For [`IoMode::Polling`] that call is the
//! pump tick; for [`IoMode::Threaded`] it is where a dead reader is noticed
//! and the session torn down on the owner's thread.

pub mod observer;
pub mod pump;
pub mod writer;

pub use observer::{ChannelObserver, SessionEvent, SessionObserver};
pub use pump::{InboundPump, PollingPump, PumpStatus, ThreadPump, READER_FAILED};
pub use writer::{CommandWriter, SharedPort, WRITER_FAILED};

use crate::error::SessionError;
use crate::port::{PortDescriptor, PortError, PortOpener};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const CONNECTED: &str = "Connected successfully.";
pub const CONNECT_FAILED: &str = "Failed to connect!";
pub const DISCONNECTED: &str = "Disconnected successfully.";
pub const DISCONNECT_FAILED: &str = "Failed to disconnect!";

/// How often the owner should call [`SessionController::poll`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The info line emitted when a connection attempt starts.
pub fn connecting_message(descriptor: &PortDescriptor) -> String {
    format!(
        "Connecting to {} with {} baud rate.",
        descriptor.path, descriptor.baud_rate
    )
}

/// Which inbound/outbound scheduling model a controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoMode {
    /// Reader on a dedicated thread, each write on a short-lived worker.
    #[default]
    Threaded,
    /// Reader ticked from the owner's loop, writes inline.
    Polling,
}

impl FromStr for IoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threaded" | "thread" => Ok(Self::Threaded),
            "polling" | "poll" => Ok(Self::Polling),
            other => Err(format!("unknown I/O mode '{other}' (expected threaded or polling)")),
        }
    }
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Threaded => "threaded",
            Self::Polling => "polling",
        })
    }
}

/// Connection state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting",
        })
    }
}

/// Everything that exists only while connected.
struct Session {
    descriptor: PortDescriptor,
    port: SharedPort,
    pump: InboundPump,
    writer: CommandWriter,
}

impl Session {
    /// Stop the pump, let any write finish, then close the port.
    fn shutdown(mut self) -> Result<(), PortError> {
        self.pump.stop();
        self.writer.wait();
        let result = self.port.lock().close();
        result
    }
}

/// Owns the single serial session of a terminal.
pub struct SessionController {
    opener: Box<dyn PortOpener>,
    observer: Arc<dyn SessionObserver>,
    io_mode: IoMode,
    state: SessionState,
    session: Option<Session>,
}

impl SessionController {
    pub fn new(
        opener: impl PortOpener + 'static,
        observer: Arc<dyn SessionObserver>,
        io_mode: IoMode,
    ) -> Self {
        Self {
            opener: Box::new(opener),
            observer,
            io_mode,
            state: SessionState::Disconnected,
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn io_mode(&self) -> IoMode {
        self.io_mode
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// The port of the current session, if connected.
    pub fn descriptor(&self) -> Option<&PortDescriptor> {
        self.session.as_ref().map(|s| &s.descriptor)
    }

    /// Open `descriptor` and start streaming from it.
    ///
    /// Any existing session is torn down first, with its usual events.
    /// Failure is reported as `"Failed to connect!"` and leaves the
    /// controller disconnected.
    pub fn connect(&mut self, descriptor: PortDescriptor) {
        if self.session.is_some() {
            self.disconnect();
        }

        self.transition(SessionState::Connecting);
        self.observer.on_info(&connecting_message(&descriptor));

        match self.open_session(&descriptor) {
            Ok(session) => {
                self.session = Some(session);
                self.transition(SessionState::Connected);
                info!("Connected to {} ({} mode)", descriptor, self.io_mode);
                self.observer.on_info(CONNECTED);
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", descriptor, e);
                self.transition(SessionState::Disconnected);
                self.observer.on_error(CONNECT_FAILED);
            }
        }
    }

    fn open_session(&self, descriptor: &PortDescriptor) -> Result<Session, PortError> {
        let mut port = self.opener.open(descriptor)?;

        let started = port
            .try_clone_port()
            .and_then(|reader| InboundPump::start(self.io_mode, reader, Arc::clone(&self.observer)));
        let pump = match started {
            Ok(pump) => pump,
            Err(e) => {
                if let Err(close_err) = port.close() {
                    debug!("Closing {} after failed start: {}", descriptor, close_err);
                }
                return Err(e);
            }
        };

        Ok(Session {
            descriptor: descriptor.clone(),
            port: Arc::new(Mutex::new(port)),
            pump,
            writer: CommandWriter::for_mode(self.io_mode),
        })
    }

    /// Tear the session down. A no-op when nothing is connected.
    ///
    /// The controller always ends up disconnected; a failing close is
    /// reported as `"Failed to disconnect!"` but does not keep the port.
    pub fn disconnect(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.transition(SessionState::Disconnecting);
        let descriptor = session.descriptor.clone();
        let result = session.shutdown();
        self.transition(SessionState::Disconnected);

        match result {
            Ok(()) => {
                info!("Disconnected from {}", descriptor);
                self.observer.on_info(DISCONNECTED);
            }
            Err(e) => {
                error!("Closing {} failed: {}", descriptor, e);
                self.observer.on_error(DISCONNECT_FAILED);
            }
        }
    }

    /// Send `command` to the device exactly as given.
    ///
    /// Only one submission should be outstanding at a time; see
    /// [`CommandWriter`] for what happens otherwise. Write failures are
    /// reported through the observer, not returned.
    pub fn send_command(&mut self, command: &[u8]) -> Result<(), SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::NotConnected);
        };
        session
            .writer
            .submit(&session.port, command.to_vec(), &self.observer);
        Ok(())
    }

    /// Drive the session from the owner's loop.
    pub fn poll(&mut self) {
        let failed = match self.session.as_mut() {
            Some(session) => session.pump.poll() == PumpStatus::Failed,
            None => false,
        };
        if failed {
            warn!("Inbound pump stopped; tearing the session down");
            self.disconnect();
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {} -> {}", self.state, next);
        self.state = next;
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("io_mode", &self.io_mode)
            .field("state", &self.state)
            .field("descriptor", &self.descriptor())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{BaudRate, MockDevice, MockPortOpener};
    use std::sync::mpsc;

    fn controller(mode: IoMode) -> (SessionController, MockDevice, mpsc::Receiver<SessionEvent>) {
        let device = MockDevice::new("/dev/ttyMOCK0");
        let (tx, rx) = mpsc::channel();
        let controller = SessionController::new(
            MockPortOpener::new().with_device(&device),
            Arc::new(ChannelObserver::new(tx)),
            mode,
        );
        (controller, device, rx)
    }

    #[test]
    fn test_io_mode_parse() {
        assert_eq!("threaded".parse::<IoMode>().unwrap(), IoMode::Threaded);
        assert_eq!("Poll".parse::<IoMode>().unwrap(), IoMode::Polling);
        assert!("async".parse::<IoMode>().is_err());
        assert_eq!(IoMode::Polling.to_string(), "polling");
    }

    #[test]
    fn test_connecting_message() {
        let d = PortDescriptor::new("/dev/ttyUSB0", BaudRate::B115200);
        assert_eq!(
            connecting_message(&d),
            "Connecting to /dev/ttyUSB0 with 115200 baud rate."
        );
    }

    #[test]
    fn test_initial_state() {
        let (controller, _device, rx) = controller(IoMode::Polling);
        assert_eq!(controller.state(), SessionState::Disconnected);
        assert!(controller.descriptor().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_while_disconnected_is_rejected() {
        let (mut controller, device, _rx) = controller(IoMode::Threaded);
        assert!(matches!(
            controller.send_command(b"AT\r\n"),
            Err(SessionError::NotConnected)
        ));
        assert!(device.write_log().is_empty());
    }

    #[test]
    fn test_drop_disconnects() {
        let (mut controller, device, rx) = controller(IoMode::Polling);
        controller.connect(PortDescriptor::new("/dev/ttyMOCK0", BaudRate::B9600));
        assert_eq!(device.open_handles(), 2);

        drop(controller);
        assert_eq!(device.open_handles(), 0);
        let last = rx.try_iter().last();
        assert_eq!(last, Some(SessionEvent::Info(DISCONNECTED.to_string())));
    }
}
