//! The notification hub: live characteristic values and subscriber fan-out.
//!
//! On BLE the interrupt channel is a set of notifying characteristics.
//! Each input characteristic is a [`ValueCell`] the GATT host reads and
//! subscribes to; the hub implements [`ReportSink`], so every report the
//! engine emits updates both the report-protocol characteristic and its
//! boot-mode sibling, mirroring what a dual-mode host expects.
//!
//! Inbound GATT writes (HID Control Point, Protocol Mode) land in the hub
//! as well, keeping the last written byte readable for the host.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use bthid_core::engine::ReportSink;
use bthid_core::report::{
    encode_keyboard, encode_mouse, KeyboardReport, MouseReport, ProtocolMode,
};
use bthid_core::server::SendError;

// ── Value cell ────────────────────────────────────────────────────────────────

/// One characteristic value with notify fan-out.
pub struct ValueCell {
    value: Mutex<Vec<u8>>,
    subscribers: Mutex<Vec<Sender<Vec<u8>>>>,
}

impl ValueCell {
    pub fn new(initial: Vec<u8>) -> Self {
        Self {
            value: Mutex::new(initial),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Current value, as a host read would see it.
    pub fn read(&self) -> Vec<u8> {
        self.value.lock().unwrap().clone()
    }

    /// Stores a value without notifying (host writes).
    pub fn write(&self, value: Vec<u8>) {
        *self.value.lock().unwrap() = value;
    }

    /// Stores a value and pushes it to every live subscriber.
    pub fn notify(&self, value: Vec<u8>) {
        self.write(value.clone());
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|subscriber| subscriber.send(value.clone()).is_ok());
    }

    /// Registers a subscriber; dropped receivers are pruned on the next
    /// notify.
    pub fn subscribe(&self) -> Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

// ── Hub ───────────────────────────────────────────────────────────────────────

/// All live characteristic values of the HID service.
pub struct NotifyHub {
    keyboard_input: ValueCell,
    mouse_input: ValueCell,
    boot_keyboard_input: ValueCell,
    boot_mouse_input: ValueCell,
    protocol_mode: ValueCell,
    control_point: ValueCell,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            keyboard_input: ValueCell::new(encode_keyboard(
                &KeyboardReport::release(),
                ProtocolMode::Report,
            )),
            mouse_input: ValueCell::new(encode_mouse(&MouseReport::release(), ProtocolMode::Report)),
            boot_keyboard_input: ValueCell::new(encode_keyboard(
                &KeyboardReport::release(),
                ProtocolMode::Boot,
            )),
            boot_mouse_input: ValueCell::new(encode_mouse(
                &MouseReport::release(),
                ProtocolMode::Boot,
            )),
            protocol_mode: ValueCell::new(vec![ProtocolMode::Report.as_u8()]),
            control_point: ValueCell::new(vec![0x00]),
        }
    }

    pub fn keyboard_input(&self) -> &ValueCell {
        &self.keyboard_input
    }

    pub fn mouse_input(&self) -> &ValueCell {
        &self.mouse_input
    }

    pub fn boot_keyboard_input(&self) -> &ValueCell {
        &self.boot_keyboard_input
    }

    pub fn boot_mouse_input(&self) -> &ValueCell {
        &self.boot_mouse_input
    }

    /// Host write to the HID Control Point characteristic.
    pub fn write_control_point(&self, value: &[u8]) {
        if let Some(&byte) = value.first() {
            self.control_point.write(vec![byte]);
        }
    }

    pub fn control_point(&self) -> &ValueCell {
        &self.control_point
    }

    /// Host write to the Protocol Mode characteristic.
    pub fn write_protocol_mode(&self, value: &[u8]) {
        if let Some(&byte) = value.first() {
            self.protocol_mode
                .write(vec![ProtocolMode::from_param(byte).as_u8()]);
        }
    }

    pub fn protocol_mode(&self) -> ProtocolMode {
        ProtocolMode::from_param(self.protocol_mode.read().first().copied().unwrap_or(0x01))
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportSink for NotifyHub {
    fn send_keyboard(&self, report: &KeyboardReport) -> Result<(), SendError> {
        self.keyboard_input
            .notify(encode_keyboard(report, ProtocolMode::Report));
        self.boot_keyboard_input
            .notify(encode_keyboard(report, ProtocolMode::Boot));
        Ok(())
    }

    fn send_mouse(&self, report: &MouseReport) -> Result<(), SendError> {
        self.mouse_input
            .notify(encode_mouse(report, ProtocolMode::Report));
        self.boot_mouse_input
            .notify(encode_mouse(report, ProtocolMode::Boot));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
