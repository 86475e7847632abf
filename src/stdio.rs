//! Line-mode terminal on stdin/stdout.
//!
//! Everything runs on one thread: a current-thread tokio runtime selects over
//! stdin lines, a poll tick and Ctrl+C. The tick drives
//! [`SessionController::poll`] and drains the observer channel, so session
//! events are printed from the same loop that handles input.

use crate::command::{TerminalCommand, HELP_TEXT};
use crate::config::Config;
use crate::discovery;
use crate::error::{AppError, AppResult};
use crate::port::{BaudRate, PortDescriptor, PortOpener};
use crate::session::{ChannelObserver, SessionController, SessionEvent, SessionState};
use crate::utf8::Utf8Decoder;
use serde_json::json;
use std::io::Write;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// First line printed once the terminal accepts input.
pub const READY: &str = "Ready...";

/// Whether the input loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The terminal state shared by the input loop and the tick.
pub struct Terminal<W: Write> {
    controller: SessionController,
    events: Receiver<SessionEvent>,
    config: Config,
    baud: BaudRate,
    json: bool,
    out: W,
    at_line_start: bool,
    /// Carries a character split across chunks in JSON mode.
    decoder: Utf8Decoder,
}

impl<W: Write> Terminal<W> {
    pub fn new(opener: impl PortOpener + 'static, config: Config, json: bool, out: W) -> Self {
        let (tx, events) = mpsc::channel();
        let controller = SessionController::new(
            opener,
            Arc::new(ChannelObserver::new(tx)),
            config.serial.io_mode,
        );
        Self {
            controller,
            events,
            baud: config.serial.baud_rate(),
            config,
            json,
            out,
            at_line_start: true,
            decoder: Utf8Decoder::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Baud rate the next `:connect` without an explicit rate uses.
    pub fn baud(&self) -> BaudRate {
        self.baud
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Print the startup line and connect to the configured port, if any.
    pub fn start(&mut self) -> AppResult<()> {
        self.print_line("info", READY)?;
        if self.config.serial.default_port.is_some() {
            self.connect(None, None)?;
        }
        Ok(())
    }

    /// Handle one input line (without its newline).
    pub fn handle_line(&mut self, line: &str) -> AppResult<Flow> {
        let command = match TerminalCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.print_line("error", &e.to_string())?;
                return Ok(Flow::Continue);
            }
        };
        debug!("Terminal command: {:?}", command);

        match command {
            TerminalCommand::Send(text) => self.send(&text)?,
            TerminalCommand::Connect { port, baud } => self.connect(port, baud)?,
            TerminalCommand::Disconnect => self.controller.disconnect(),
            TerminalCommand::ListPorts => self.list_ports()?,
            TerminalCommand::SetBaud(baud) => {
                self.baud = baud;
                self.print_line("info", &format!("Baud rate set to {baud}."))?;
            }
            TerminalCommand::Help => {
                for line in HELP_TEXT.lines() {
                    self.print_line("info", line)?;
                }
            }
            TerminalCommand::Quit => return Ok(Flow::Quit),
        }
        self.drain_events()?;
        Ok(Flow::Continue)
    }

    /// Drive the session and print whatever it reported.
    pub fn tick(&mut self) -> AppResult<()> {
        self.controller.poll();
        self.drain_events()
    }

    /// Disconnect and flush remaining events.
    pub fn shutdown(&mut self) -> AppResult<()> {
        self.controller.disconnect();
        self.drain_events()?;
        if !self.at_line_start {
            writeln!(self.out)?;
            self.at_line_start = true;
        }
        self.out.flush()?;
        Ok(())
    }

    fn send(&mut self, text: &str) -> AppResult<()> {
        if self.config.terminal.echo_commands {
            self.print_line("command", &format!("> {text}"))?;
        }
        let bytes = self.config.terminal.line_ending.apply(text);
        if let Err(e) = self.controller.send_command(&bytes) {
            self.print_line("error", &e.to_string())?;
        }
        Ok(())
    }

    fn connect(&mut self, port: Option<String>, baud: Option<BaudRate>) -> AppResult<()> {
        if let Some(baud) = baud {
            self.baud = baud;
        }
        let path = match port.or_else(|| self.config.serial.default_port.clone()) {
            Some(name) => self.config.serial.resolve_port(&name),
            None => {
                let candidates = discovery::available_port_names(&self.config.serial.port_prefixes)?;
                match candidates.into_iter().next() {
                    Some(first) => first,
                    None => {
                        self.print_line("error", "No serial ports found.")?;
                        return Ok(());
                    }
                }
            }
        };
        self.controller.connect(PortDescriptor::new(path, self.baud));
        self.drain_events()
    }

    fn list_ports(&mut self) -> AppResult<()> {
        let ports = discovery::available_ports(&self.config.serial.port_prefixes)?;
        if self.json {
            let line = serde_json::to_string(&json!({
                "time": chrono::Local::now().to_rfc3339(),
                "type": "ports",
                "payload": ports,
            }))
            .map_err(|e| AppError::Io(e.into()))?;
            self.write_line(&line)?;
            return Ok(());
        }
        if ports.is_empty() {
            return self.print_line("info", "No serial ports found.");
        }
        for port in ports {
            self.print_line("info", &port.name)?;
        }
        Ok(())
    }

    fn drain_events(&mut self) -> AppResult<()> {
        while let Ok(event) = self.events.try_recv() {
            if event.ends_stream() {
                self.finish_data()?;
            }
            match event {
                SessionEvent::Data(bytes) => self.print_data(&bytes)?,
                SessionEvent::Info(text) => self.print_line("info", &text)?,
                SessionEvent::Error(text) => self.print_line("error", &text)?,
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn print_data(&mut self, bytes: &[u8]) -> AppResult<()> {
        if self.json {
            let text = self.decoder.decode(bytes);
            if text.is_empty() {
                return Ok(());
            }
            return self.print_line("data", &text);
        }
        self.out.write_all(bytes)?;
        if let Some(last) = bytes.last() {
            self.at_line_start = *last == b'\n';
        }
        Ok(())
    }

    fn finish_data(&mut self) -> AppResult<()> {
        let rest = self.decoder.finish();
        if rest.is_empty() {
            return Ok(());
        }
        self.print_line("data", &rest)
    }

    /// Info, error and echo lines always start on a fresh line.
    fn print_line(&mut self, kind: &str, text: &str) -> AppResult<()> {
        if self.json {
            let line = serde_json::to_string(&json!({
                "time": chrono::Local::now().to_rfc3339(),
                "type": kind,
                "payload": text,
            }))
            .map_err(|e| AppError::Io(e.into()))?;
            return self.write_line(&line);
        }
        if self.config.terminal.show_timestamps && kind != "command" {
            let stamp = chrono::Local::now().format("%H:%M:%S%.3f");
            return self.write_line(&format!("[{stamp}] {text}"));
        }
        self.write_line(text)
    }

    fn write_line(&mut self, line: &str) -> AppResult<()> {
        if !self.at_line_start {
            writeln!(self.out)?;
        }
        writeln!(self.out, "{line}")?;
        self.at_line_start = true;
        Ok(())
    }
}

/// Run the terminal until EOF, `:quit` or Ctrl+C.
pub async fn run(opener: impl PortOpener + 'static, config: Config, json: bool) -> AppResult<()> {
    let poll_interval = config.serial.poll_interval();
    let mut terminal = Terminal::new(opener, config, json, std::io::stdout());
    terminal.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(poll_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim_end_matches('\r');
                    if terminal.handle_line(line)? == Flow::Quit {
                        break;
                    }
                }
                None => {
                    debug!("stdin closed");
                    break;
                }
            },
            _ = tick.tick() => terminal.tick()?,
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    terminal.shutdown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockDevice, MockPortOpener};
    use crate::session::{IoMode, CONNECTED, DISCONNECTED, READER_FAILED};
    use std::time::{Duration, Instant};

    fn terminal(mode: IoMode, json: bool) -> (Terminal<Vec<u8>>, MockDevice) {
        let device = MockDevice::new("/dev/ttyUSB0");
        let mut config = Config::default();
        config.serial.io_mode = mode;
        let terminal = Terminal::new(
            MockPortOpener::new().with_device(&device),
            config,
            json,
            Vec::new(),
        );
        (terminal, device)
    }

    fn output(terminal: &Terminal<Vec<u8>>) -> String {
        String::from_utf8_lossy(terminal.writer()).into_owned()
    }

    #[test]
    fn test_ready_then_connect_and_echo() {
        let (mut term, device) = terminal(IoMode::Polling, false);
        term.start().unwrap();
        term.handle_line(":connect /dev/ttyUSB0 9600").unwrap();
        assert_eq!(term.state(), SessionState::Connected);

        term.handle_line("AT").unwrap();
        assert_eq!(device.written(), b"AT\n");

        let out = output(&term);
        let expected = format!(
            "{READY}\nConnecting to /dev/ttyUSB0 with 9600 baud rate.\n{CONNECTED}\n> AT\n"
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_inbound_data_is_raw_and_info_starts_new_line() {
        let (mut term, device) = terminal(IoMode::Polling, false);
        term.handle_line(":connect /dev/ttyUSB0").unwrap();
        device.push_inbound(b"OK");
        term.tick().unwrap();
        term.handle_line(":disconnect").unwrap();

        let out = output(&term);
        assert!(out.ends_with(&format!("{CONNECTED}\nOK\n{DISCONNECTED}\n")));
    }

    #[test]
    fn test_send_while_disconnected_prints_error() {
        let (mut term, device) = terminal(IoMode::Polling, false);
        term.handle_line("hello").unwrap();
        assert!(device.write_log().is_empty());
        assert!(output(&term).contains("Not connected to a serial port."));
    }

    #[test]
    fn test_invalid_directive_keeps_running() {
        let (mut term, _device) = terminal(IoMode::Polling, false);
        assert_eq!(term.handle_line(":baud 300").unwrap(), Flow::Continue);
        assert_eq!(term.handle_line(":baud 38400").unwrap(), Flow::Continue);
        assert_eq!(term.baud(), BaudRate::B38400);
        assert_eq!(term.handle_line(":quit").unwrap(), Flow::Quit);
        assert!(output(&term).contains("Unsupported baud rate: 300"));
    }

    #[test]
    fn test_json_output() {
        let (mut term, _device) = terminal(IoMode::Polling, true);
        term.handle_line(":connect /dev/ttyUSB0").unwrap();
        let out = output(&term);
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["type"], "info");
        assert_eq!(lines[1]["payload"], CONNECTED);
        assert!(lines[1]["time"].is_string());
    }

    fn json_payloads(terminal: &Terminal<Vec<u8>>, kind: &str) -> Vec<String> {
        output(terminal)
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .filter(|v| v["type"] == kind)
            .map(|v| v["payload"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_json_data_keeps_character_split_across_chunks() {
        let (mut term, device) = terminal(IoMode::Polling, true);
        term.handle_line(":connect /dev/ttyUSB0").unwrap();

        device.push_inbound(&[0xC3]);
        term.tick().unwrap();
        device.push_inbound(&[0xA9]);
        term.tick().unwrap();

        assert_eq!(json_payloads(&term, "data"), vec!["é".to_string()]);
    }

    #[test]
    fn test_json_data_flushes_partial_character_on_disconnect() {
        let (mut term, device) = terminal(IoMode::Polling, true);
        term.handle_line(":connect /dev/ttyUSB0").unwrap();

        device.push_inbound(b"ok\xE2\x82");
        term.tick().unwrap();
        term.handle_line(":disconnect").unwrap();

        assert_eq!(
            json_payloads(&term, "data"),
            vec!["ok".to_string(), "\u{FFFD}".to_string()]
        );
        assert_eq!(json_payloads(&term, "info").last().unwrap(), DISCONNECTED);
    }

    #[test]
    fn test_reader_failure_in_thread_mode_tears_down() {
        let (mut term, device) = terminal(IoMode::Threaded, false);
        term.handle_line(":connect /dev/ttyUSB0").unwrap();
        device.set_fail_reads(true);

        let deadline = Instant::now() + Duration::from_secs(2);
        while term.state() != SessionState::Disconnected && Instant::now() < deadline {
            term.tick().unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(term.state(), SessionState::Disconnected);
        let out = output(&term);
        assert!(out.contains(&format!("{READER_FAILED}\n{DISCONNECTED}\n")));
        assert_eq!(device.open_handles(), 0);
    }

    #[test]
    fn test_shutdown_disconnects() {
        let (mut term, device) = terminal(IoMode::Threaded, false);
        term.handle_line(":connect /dev/ttyUSB0").unwrap();
        term.shutdown().unwrap();
        assert_eq!(device.open_handles(), 0);
        assert!(output(&term).ends_with(&format!("{DISCONNECTED}\n")));
    }
}
