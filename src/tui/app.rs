//! TUI Application state and main loop.

use crate::config::Config;
use crate::discovery;
use crate::port::{BaudRate, PortDescriptor, PortOpener};
use crate::session::{ChannelObserver, IoMode, SessionController, SessionState};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::event::{Event, EventHandler};
use super::log::{LineKind, LogBuffer};
use super::theme::Theme;
use super::ui;

/// Application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Navigation, port selection and session keys
    #[default]
    Normal,
    /// Typing a command for the device
    Insert,
    /// Help overlay
    Help,
}

/// Focus area in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusArea {
    /// Port list panel
    #[default]
    PortList,
    /// Log view
    Log,
}

/// Application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Application is running
    Running,
    /// Application should quit
    Quitting,
}

/// Main TUI application.
pub struct App {
    pub state: AppState,
    pub mode: Mode,
    pub theme: Theme,
    pub focus: FocusArea,
    pub config: Config,

    /// The serial session, reporting into the UI event channel
    pub controller: SessionController,

    /// Session output
    pub log: LogBuffer,
    /// Lines scrolled back from the bottom of the log
    pub scroll_offset: usize,

    /// Current input text
    pub input: String,
    /// Cursor position in input, in characters
    pub cursor_pos: usize,
    /// Command history, oldest first
    pub history: VecDeque<String>,
    /// Current history index (for up/down navigation)
    pub history_index: Option<usize>,

    /// Candidate ports, in display order
    pub available_ports: Vec<String>,
    pub selected_port: usize,
    /// Rate used by the next connect
    pub baud: BaudRate,

    /// Connection start time (for uptime display)
    pub connect_time: Option<Instant>,
    /// Status message to display
    pub status_message: Option<String>,
}

impl App {
    /// Create the application; session events are sent to `events`.
    pub fn new(config: Config, opener: impl PortOpener + 'static, events: Sender<Event>) -> Self {
        let theme = Theme::by_name(&config.terminal.theme)
            .cloned()
            .unwrap_or_default();
        let controller = SessionController::new(
            opener,
            Arc::new(ChannelObserver::new(events)),
            IoMode::Threaded,
        );
        let mut log = LogBuffer::new(config.terminal.buffer_lines);
        log.push_line(LineKind::Info, crate::stdio::READY);

        Self {
            state: AppState::Running,
            mode: Mode::Normal,
            theme,
            focus: FocusArea::PortList,
            baud: config.serial.baud_rate(),
            config,
            controller,
            log,
            scroll_offset: 0,
            input: String::new(),
            cursor_pos: 0,
            history: VecDeque::new(),
            history_index: None,
            available_ports: Vec::new(),
            selected_port: 0,
            connect_time: None,
            status_message: None,
        }
    }

    /// Run the application main loop.
    pub fn run(&mut self, events: &EventHandler) -> io::Result<()> {
        let mut terminal = ui::setup_terminal()?;

        self.refresh_ports();
        if let Some(port) = self.config.serial.default_port.clone() {
            let path = self.config.serial.resolve_port(&port);
            self.connect(path);
        }

        while self.state == AppState::Running {
            terminal.draw(|frame| ui::render(self, frame))?;

            match events.next() {
                Ok(event) => self.handle_event(event),
                Err(_) => self.state = AppState::Quitting,
            }
        }

        self.controller.disconnect();
        ui::restore_terminal(terminal)
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => {
                self.controller.poll();
                if !self.controller.is_connected() {
                    self.connect_time = None;
                }
            }
            Event::Key(key) => self.handle_key(key),
            Event::Resize(_, _) => {}
            Event::Session(event) => self.log.push_event(&event),
        }
    }

    /// Handle keyboard input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.state = AppState::Quitting;
            return;
        }
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Insert => self.handle_insert_key(key),
            Mode::Help => self.handle_help_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.state = AppState::Quitting,
            KeyCode::Char('i') => self.mode = Mode::Insert,
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.log.clear();
                self.scroll_offset = 0;
            }
            KeyCode::Char('c') => self.connect_selected_port(),
            KeyCode::Char('d') => self.controller.disconnect(),
            KeyCode::Char('b') => {
                self.baud = self.baud.next();
                self.status_message = Some(format!("Baud rate: {}", self.baud));
            }
            KeyCode::Char('r') => self.refresh_ports(),
            KeyCode::F(1) | KeyCode::Char('?') => self.mode = Mode::Help,
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Up | KeyCode::Char('k') => match self.focus {
                FocusArea::PortList => self.move_selection_up(),
                FocusArea::Log => self.scroll_up(1),
            },
            KeyCode::Down | KeyCode::Char('j') => match self.focus {
                FocusArea::PortList => self.move_selection_down(),
                FocusArea::Log => self.scroll_down(1),
            },
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::PageDown => self.scroll_down(10),
            KeyCode::Enter => {
                if self.focus == FocusArea::PortList && !self.controller.is_connected() {
                    self.connect_selected_port();
                } else {
                    self.mode = Mode::Insert;
                }
            }
            _ => {}
        }
    }

    fn handle_insert_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => self.send_input(),
            KeyCode::Backspace => {
                if self.cursor_pos > 0 {
                    self.cursor_pos -= 1;
                    let at = self.byte_index(self.cursor_pos);
                    self.input.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor_pos < self.input.chars().count() {
                    let at = self.byte_index(self.cursor_pos);
                    self.input.remove(at);
                }
            }
            KeyCode::Left => self.cursor_pos = self.cursor_pos.saturating_sub(1),
            KeyCode::Right => {
                if self.cursor_pos < self.input.chars().count() {
                    self.cursor_pos += 1;
                }
            }
            KeyCode::Home => self.cursor_pos = 0,
            KeyCode::End => self.cursor_pos = self.input.chars().count(),
            KeyCode::Up => self.history_previous(),
            KeyCode::Down => self.history_next(),
            KeyCode::Char(c) => {
                let at = self.byte_index(self.cursor_pos);
                self.input.insert(at, c);
                self.cursor_pos += 1;
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
            self.mode = Mode::Normal;
        }
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusArea::PortList => FocusArea::Log,
            FocusArea::Log => FocusArea::PortList,
        };
    }

    fn move_selection_up(&mut self) {
        self.selected_port = self.selected_port.saturating_sub(1);
    }

    fn move_selection_down(&mut self) {
        if self.selected_port < self.available_ports.len().saturating_sub(1) {
            self.selected_port += 1;
        }
    }

    fn scroll_up(&mut self, lines: usize) {
        let max = self.log.len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    fn history_previous(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let idx = match self.history_index {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.input = self.history[idx].clone();
        self.cursor_pos = self.input.chars().count();
        self.history_index = Some(idx);
    }

    fn history_next(&mut self) {
        let Some(idx) = self.history_index else {
            return;
        };
        if idx + 1 >= self.history.len() {
            self.input.clear();
            self.cursor_pos = 0;
            self.history_index = None;
        } else {
            self.history_index = Some(idx + 1);
            self.input = self.history[idx + 1].clone();
            self.cursor_pos = self.input.chars().count();
        }
    }

    /// Send the current input to the device.
    fn send_input(&mut self) {
        let text = std::mem::take(&mut self.input);
        self.cursor_pos = 0;
        self.history_index = None;

        if !text.is_empty() && self.history.back() != Some(&text) {
            self.history.push_back(text.clone());
            while self.history.len() > self.config.terminal.history_size {
                self.history.pop_front();
            }
        }

        if self.config.terminal.echo_commands {
            self.log.push_line(LineKind::Command, &format!("> {text}"));
        }
        let bytes = self.config.terminal.line_ending.apply(&text);
        if let Err(e) = self.controller.send_command(&bytes) {
            self.status_message = Some(e.to_string());
        }
        self.scroll_offset = 0;
    }

    /// Refresh the list of candidate ports.
    pub fn refresh_ports(&mut self) {
        match discovery::available_port_names(&self.config.serial.port_prefixes) {
            Ok(ports) => {
                self.available_ports = ports;
                if self.selected_port >= self.available_ports.len() {
                    self.selected_port = self.available_ports.len().saturating_sub(1);
                }
                self.status_message = Some(format!("{} port(s) found", self.available_ports.len()));
            }
            Err(e) => {
                self.status_message = Some(format!("Failed to list ports: {}", e));
            }
        }
    }

    fn connect_selected_port(&mut self) {
        match self.available_ports.get(self.selected_port).cloned() {
            Some(port) => self.connect(port),
            None => self.status_message = Some("No ports available".to_string()),
        }
    }

    /// Connect to `path` at the selected baud rate.
    pub fn connect(&mut self, path: String) {
        debug!("Connect requested: {} @ {}", path, self.baud);
        self.controller.connect(PortDescriptor::new(path, self.baud));
        self.connect_time = self.controller.is_connected().then(Instant::now);
        self.scroll_offset = 0;
    }

    pub fn session_state(&self) -> SessionState {
        self.controller.state()
    }

    /// Get uptime string.
    pub fn uptime_string(&self) -> String {
        match self.connect_time {
            Some(start) => {
                let secs = start.elapsed().as_secs();
                format!(
                    "{:02}:{:02}:{:02}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                )
            }
            None => "--:--:--".to_string(),
        }
    }
}
