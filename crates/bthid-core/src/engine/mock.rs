//! Recording [`ReportSink`] for tests.
//!
//! The real sinks either need a Bluetooth adapter (L2CAP session) or a
//! GATT host (BLE notifier), and their output cannot be observed from test
//! code. `MockSink` records every report in memory so assertions can
//! inspect exactly what was emitted and in what order, and can inject a
//! transport failure after a chosen number of sends to exercise abort
//! paths.

use std::io;
use std::sync::Mutex;

use crate::engine::ReportSink;
use crate::report::{KeyboardReport, MouseReport};
use crate::server::SendError;

/// One recorded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
}

/// In-memory sink recording every report it receives.
#[derive(Default)]
pub struct MockSink {
    events: Mutex<Vec<SinkEvent>>,
    /// `Some(n)`: the n-th send from now fails with a broken-pipe error.
    fail_after: Mutex<Option<usize>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the sink fail after `remaining` further successful sends.
    pub fn fail_after(&self, remaining: usize) {
        *self.fail_after.lock().unwrap() = Some(remaining);
    }

    /// All recorded events, in send order.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Only the mouse reports, in send order.
    pub fn mouse_reports(&self) -> Vec<MouseReport> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Mouse(report) => Some(report),
                SinkEvent::Keyboard(_) => None,
            })
            .collect()
    }

    /// Only the keyboard reports, in send order.
    pub fn keyboard_reports(&self) -> Vec<KeyboardReport> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Keyboard(report) => Some(report),
                SinkEvent::Mouse(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, event: SinkEvent) -> Result<(), SendError> {
        let mut fail_after = self.fail_after.lock().unwrap();
        if let Some(remaining) = *fail_after {
            if remaining == 0 {
                return Err(SendError::Transport(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "injected sink failure",
                )));
            }
            *fail_after = Some(remaining - 1);
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl ReportSink for MockSink {
    fn send_keyboard(&self, report: &KeyboardReport) -> Result<(), SendError> {
        self.record(SinkEvent::Keyboard(*report))
    }

    fn send_mouse(&self, report: &MouseReport) -> Result<(), SendError> {
        self.record(SinkEvent::Mouse(*report))
    }
}
