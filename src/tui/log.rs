//! Scrollback for the log view.
//!
//! Inbound data is appended in place, continuing the last line until the
//! device sends a newline. Info, error and echoed command lines always get a
//! line of their own.

use crate::session::SessionEvent;
use crate::utf8::Utf8Decoder;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Data,
    Info,
    Error,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub kind: LineKind,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    capacity: usize,
    /// The last line is data without a terminating newline yet.
    open: bool,
    decoder: Utf8Decoder,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
            open: false,
            decoder: Utf8Decoder::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &LogLine> + ExactSizeIterator {
        self.lines.iter()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.open = false;
        self.decoder.reset();
    }

    pub fn push_event(&mut self, event: &SessionEvent) {
        if event.ends_stream() {
            self.finish_data();
        }
        match event {
            SessionEvent::Data(bytes) => self.push_data(bytes),
            SessionEvent::Info(text) => self.push_line(LineKind::Info, text),
            SessionEvent::Error(text) => self.push_line(LineKind::Error, text),
        }
    }

    pub fn push_data(&mut self, bytes: &[u8]) {
        let decoded = self.decoder.decode(bytes);
        self.append_data(&decoded);
    }

    /// The session ended: show a held-back partial character as U+FFFD.
    pub fn finish_data(&mut self) {
        let rest = self.decoder.finish();
        self.append_data(&rest);
    }

    fn append_data(&mut self, decoded: &str) {
        if decoded.is_empty() {
            return;
        }
        let text = decoded.replace('\r', "");
        let mut segments = text.split('\n');

        if let Some(first) = segments.next() {
            match self.lines.back_mut() {
                Some(last) if self.open => last.text.push_str(first),
                _ => self.push_raw(LineKind::Data, first.to_string()),
            }
        }
        for segment in segments {
            self.push_raw(LineKind::Data, segment.to_string());
        }
        // A trailing newline leaves an empty open line; drop it until more data comes.
        if text.ends_with('\n') {
            if self.lines.back().is_some_and(|l| l.text.is_empty()) {
                self.lines.pop_back();
            }
            self.open = false;
        } else {
            self.open = true;
        }
    }

    pub fn push_line(&mut self, kind: LineKind, text: &str) {
        self.push_raw(kind, text.to_string());
        self.open = false;
    }

    fn push_raw(&mut self, kind: LineKind, text: String) {
        self.lines.push_back(LogLine { kind, text });
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(buffer: &LogBuffer) -> Vec<&str> {
        buffer.lines().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_chunks_continue_the_same_line() {
        let mut log = LogBuffer::new(100);
        log.push_data(b"OK");
        log.push_data(b" 1\r\nready");
        log.push_data(b">");
        assert_eq!(texts(&log), vec!["OK 1", "ready>"]);
    }

    #[test]
    fn test_info_breaks_the_line() {
        let mut log = LogBuffer::new(100);
        log.push_data(b"partial");
        log.push_event(&SessionEvent::Info("Disconnected successfully.".into()));
        log.push_data(b"more");
        assert_eq!(
            texts(&log),
            vec!["partial", "Disconnected successfully.", "more"]
        );
        assert_eq!(log.lines().nth(1).unwrap().kind, LineKind::Info);
    }

    #[test]
    fn test_newline_terminated_data_starts_fresh() {
        let mut log = LogBuffer::new(100);
        log.push_data(b"line one\n");
        log.push_data(b"line two\n");
        assert_eq!(texts(&log), vec!["line one", "line two"]);
    }

    #[test]
    fn test_character_split_across_chunks() {
        let mut log = LogBuffer::new(100);
        log.push_data(&[0xC3]);
        assert!(log.is_empty());
        log.push_data(&[0xA9]);
        assert_eq!(texts(&log), vec!["é"]);

        log.push_data("t\u{e9}l\u{e9}".as_bytes().split_at(2).0);
        log.push_data("t\u{e9}l\u{e9}".as_bytes().split_at(2).1);
        assert_eq!(texts(&log), vec!["étélé"]);
    }

    #[test]
    fn test_disconnect_flushes_partial_character() {
        let mut log = LogBuffer::new(100);
        log.push_data(b"abc\xE2\x82");
        log.push_event(&SessionEvent::Info("Disconnected successfully.".into()));
        assert_eq!(texts(&log), vec!["abc\u{FFFD}", "Disconnected successfully."]);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut log = LogBuffer::new(2);
        log.push_line(LineKind::Command, "> a");
        log.push_line(LineKind::Command, "> b");
        log.push_line(LineKind::Error, "Failed to connect!");
        assert_eq!(texts(&log), vec!["> b", "Failed to connect!"]);
    }
}
