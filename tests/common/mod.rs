//! Shared test utilities for serial-term tests.
//!
//! - A recording observer that keeps every session event in order
//! - A controller harness wired to an in-memory device
//! - Polling wait helpers for threaded-mode assertions

#![allow(dead_code)]

use parking_lot::Mutex;
use serial_term::port::{MockDevice, MockPortOpener};
use serial_term::session::{IoMode, SessionController, SessionEvent, SessionObserver};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEVICE_PATH: &str = "/dev/ttyMOCK0";

/// How long threaded assertions wait before giving up.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Observer that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Info and error texts in order, data events skipped.
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Info(t) | SessionEvent::Error(t) => Some(t.clone()),
                SessionEvent::Data(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Error(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    /// All data chunks concatenated.
    pub fn data(&self) -> Vec<u8> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Data(d) => Some(d.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn data_chunks(&self) -> Vec<Vec<u8>> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Data(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count_error(&self, text: &str) -> usize {
        self.errors().iter().filter(|e| e.as_str() == text).count()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_data(&self, data: &[u8]) {
        self.events.lock().push(SessionEvent::Data(data.to_vec()));
    }

    fn on_info(&self, text: &str) {
        self.events.lock().push(SessionEvent::Info(text.to_string()));
    }

    fn on_error(&self, text: &str) {
        self.events.lock().push(SessionEvent::Error(text.to_string()));
    }
}

/// A controller bound to one mock device.
pub struct Harness {
    pub controller: SessionController,
    pub device: MockDevice,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(mode: IoMode) -> Self {
        let device = MockDevice::new(DEVICE_PATH);
        let observer = RecordingObserver::new();
        let controller = SessionController::new(
            MockPortOpener::new().with_device(&device),
            observer.clone(),
            mode,
        );
        Self {
            controller,
            device,
            observer,
        }
    }

    /// Poll the controller until `done` holds or the timeout passes.
    pub fn poll_until(&mut self, done: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            self.controller.poll();
            if done(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

/// Wait without polling anything, e.g. for a worker thread.
pub fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
