//! Observer interface through which a session reports to its UI.
//!
//! Every method may be called from the reader or writer worker threads, so
//! implementations must be thread-safe. UI layers that need events on their
//! own thread use [`ChannelObserver`].

use super::{DISCONNECTED, DISCONNECT_FAILED};
use serde::Serialize;
use std::sync::mpsc::Sender;

/// Receives everything a session has to say.
pub trait SessionObserver: Send + Sync {
    /// A chunk of inbound bytes, in device order.
    fn on_data(&self, chunk: &[u8]);

    /// A human-readable status line.
    fn on_info(&self, message: &str);

    /// A human-readable failure line.
    fn on_error(&self, message: &str);
}

/// One observer callback, as a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    Data(Vec<u8>),
    Info(String),
    Error(String),
}

impl SessionEvent {
    /// True for the last event of a session: no data of that session follows.
    pub fn ends_stream(&self) -> bool {
        match self {
            Self::Info(message) => message == DISCONNECTED,
            Self::Error(message) => message == DISCONNECT_FAILED,
            Self::Data(_) => false,
        }
    }
}

/// Forwards events into a channel owned by the UI thread.
///
/// Send failures (receiver dropped) are ignored: nobody is listening anymore.
#[derive(Debug)]
pub struct ChannelObserver<T> {
    sender: Sender<T>,
}

impl<T> ChannelObserver<T> {
    pub fn new(sender: Sender<T>) -> Self {
        Self { sender }
    }
}

impl<T> SessionObserver for ChannelObserver<T>
where
    T: From<SessionEvent> + Send,
{
    fn on_data(&self, chunk: &[u8]) {
        let _ = self.sender.send(SessionEvent::Data(chunk.to_vec()).into());
    }

    fn on_info(&self, message: &str) {
        let _ = self.sender.send(SessionEvent::Info(message.to_string()).into());
    }

    fn on_error(&self, message: &str) {
        let _ = self.sender.send(SessionEvent::Error(message.to_string()).into());
    }
}
