//! Terminal user interface for serial-term.
//!
//! A ratatui front end over [`SessionController`](crate::session::SessionController):
//! a port list with baud selection, a scrolling log of everything the
//! session reports, and a command line with history. The session runs in
//! threaded mode and reports through a `ChannelObserver<Event>` into the
//! same channel as keyboard input, so all state changes happen on the UI
//! thread.

mod app;
mod event;
mod log;
mod theme;
mod ui;

pub use app::{App, AppState, FocusArea, Mode};
pub use event::{Event, EventHandler};
pub use log::{LineKind, LogBuffer, LogLine};
pub use theme::{Theme, THEMES};
pub use ui::render;
