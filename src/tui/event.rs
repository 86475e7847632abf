//! Event handling for the TUI.

use crate::session::SessionEvent;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::error;

/// Everything the UI loop reacts to.
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal tick for UI refresh and session polling
    Tick,
    /// Keyboard input
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// Something the serial session reported
    Session(SessionEvent),
}

impl From<SessionEvent> for Event {
    fn from(event: SessionEvent) -> Self {
        Self::Session(event)
    }
}

/// Event handler that polls for terminal events on its own thread.
///
/// Session events arrive on the same channel through
/// [`ChannelObserver<Event>`](crate::session::ChannelObserver), built from
/// [`EventHandler::sender`].
pub struct EventHandler {
    sender: mpsc::Sender<Event>,
    receiver: mpsc::Receiver<Event>,
}

impl EventHandler {
    /// Create a new event handler with the specified tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handler_sender = sender.clone();

        let spawned = thread::Builder::new()
            .name("tui-input".into())
            .spawn(move || {
                let mut last_tick = Instant::now();
                loop {
                    let timeout = tick_rate
                        .checked_sub(last_tick.elapsed())
                        .unwrap_or(Duration::ZERO);

                    if event::poll(timeout).unwrap_or(false) {
                        let forwarded = match event::read() {
                            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                                handler_sender.send(Event::Key(key))
                            }
                            Ok(CrosstermEvent::Resize(width, height)) => {
                                handler_sender.send(Event::Resize(width, height))
                            }
                            _ => Ok(()),
                        };
                        if forwarded.is_err() {
                            break;
                        }
                    }

                    if last_tick.elapsed() >= tick_rate {
                        if handler_sender.send(Event::Tick).is_err() {
                            break;
                        }
                        last_tick = Instant::now();
                    }
                }
            });
        if let Err(e) = spawned {
            error!("Failed to spawn input thread: {}", e);
        }

        Self { sender, receiver }
    }

    /// Get the next event, blocking until one is available.
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Get a sender for pushing session events.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.sender.clone()
    }
}
