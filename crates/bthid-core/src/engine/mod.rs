//! High-level input intents reduced to paced report sequences.
//!
//! The engine is the only producer of input reports. Every intent becomes a
//! deterministic sequence of framed transmissions through a [`ReportSink`]
//! with safety pacing between them:
//!
//! - `type_text` – press/release pair per mappable character.
//! - `move_mouse` – relative motion report followed by a zero report.
//! - `click` – button press, hold, release.
//! - `move_to` / `click_at` – absolute pointer walking used by the BLE
//!   variant: the engine tracks the last commanded position and walks the
//!   delta in bounded steps.
//!
//! All per-axis deltas saturate to signed 8-bit, step sizes are clamped to
//! at most 127, and pacing applies even to single-character input.

pub mod mock;

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::keymap::map_char;
use crate::report::{KeyboardReport, MouseButton, MouseReport};
use crate::server::SendError;

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Where finished reports go. Implemented by the L2CAP session server and
/// the BLE notification hub; tests use [`mock::MockSink`].
pub trait ReportSink: Send + Sync {
    fn send_keyboard(&self, report: &KeyboardReport) -> Result<(), SendError>;
    fn send_mouse(&self, report: &MouseReport) -> Result<(), SendError>;
}

impl<S: ReportSink + ?Sized> ReportSink for std::sync::Arc<S> {
    fn send_keyboard(&self, report: &KeyboardReport) -> Result<(), SendError> {
        (**self).send_keyboard(report)
    }

    fn send_mouse(&self, report: &MouseReport) -> Result<(), SendError> {
        (**self).send_mouse(report)
    }
}

// ── Safety limits ─────────────────────────────────────────────────────────────

/// Pacing and clamping applied to every reduced intent.
#[derive(Debug, Clone)]
pub struct SafetyLimits {
    /// Delay after a key press report.
    pub post_press_delay: Duration,
    /// Delay after a key release report (the inter-keystroke gap).
    pub post_release_delay: Duration,
    /// How long a clicked button stays down.
    pub click_hold: Duration,
    /// Delay between steps of an absolute pointer walk, and between press
    /// and release in `click_at`.
    pub mouse_move_delay: Duration,
    /// Largest per-step pointer delta; clamped to `1..=127`.
    pub mouse_step_limit: i32,
}

impl SafetyLimits {
    /// Pacing used by the classic BR/EDR variant: 8 ms between keystrokes,
    /// 20 ms click hold.
    pub fn classic() -> Self {
        Self {
            post_press_delay: Duration::ZERO,
            post_release_delay: Duration::from_millis(8),
            click_hold: Duration::from_millis(20),
            mouse_move_delay: Duration::ZERO,
            mouse_step_limit: 127,
        }
    }

    /// Applies the hard bounds: step limit within `1..=127`.
    pub fn clamped(mut self) -> Self {
        self.mouse_step_limit = self.mouse_step_limit.clamp(1, 127);
        self
    }
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self::classic()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Reduces input intents to report sequences over a sink.
pub struct InputEngine<S> {
    sink: S,
    limits: SafetyLimits,
    /// Last commanded absolute pointer position (BLE walker).
    pointer: Mutex<(i32, i32)>,
}

impl<S: ReportSink> InputEngine<S> {
    pub fn new(sink: S, limits: SafetyLimits) -> Self {
        Self {
            sink,
            limits: limits.clamped(),
            pointer: Mutex::new((0, 0)),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    /// Types `text` one character at a time.
    ///
    /// Characters without a HID mapping are skipped with a warning and never
    /// fail the call; the first transport failure aborts the remainder.
    pub fn type_text(&self, text: &str) -> Result<(), SendError> {
        for ch in text.chars() {
            let Some(key) = map_char(ch) else {
                warn!("skipping character with no HID mapping: {ch:?}");
                continue;
            };
            self.sink
                .send_keyboard(&KeyboardReport::press(key.usage, key.requires_shift))?;
            pause(self.limits.post_press_delay);
            self.sink.send_keyboard(&KeyboardReport::release())?;
            pause(self.limits.post_release_delay);
        }
        Ok(())
    }

    /// Sends one relative motion report (each axis saturated to ±127)
    /// followed by a zero report.
    pub fn move_mouse(&self, dx: i32, dy: i32, wheel: i32) -> Result<(), SendError> {
        let motion = MouseReport::motion(clamp_axis(dx), clamp_axis(dy), clamp_axis(wheel));
        self.sink.send_mouse(&motion)?;
        self.sink.send_mouse(&MouseReport::release())
    }

    /// Presses the buttons in `mask`, holds, and releases.
    pub fn click(&self, mask: u8) -> Result<(), SendError> {
        self.sink.send_mouse(&MouseReport::buttons(mask))?;
        pause(self.limits.click_hold);
        self.sink.send_mouse(&MouseReport::release())
    }

    /// Walks the pointer to the absolute position `(x, y)` in steps of at
    /// most `mouse_step_limit`, pacing between steps.
    ///
    /// The engine only tracks what it has commanded; the position starts at
    /// the origin when the engine is created.
    pub fn move_to(&self, x: i32, y: i32) -> Result<(), SendError> {
        let step = self.limits.mouse_step_limit;
        let mut position = self.pointer.lock().unwrap();
        let (mut dx, mut dy) = (x - position.0, y - position.1);

        while dx != 0 || dy != 0 {
            let step_x = dx.clamp(-step, step);
            let step_y = dy.clamp(-step, step);
            self.sink
                .send_mouse(&MouseReport::motion(step_x as i8, step_y as i8, 0))?;
            pause(self.limits.mouse_move_delay);
            position.0 += step_x;
            position.1 += step_y;
            dx -= step_x;
            dy -= step_y;
        }
        Ok(())
    }

    /// Moves to `(x, y)`, then toggles `button` with the move delay between
    /// press and release.
    pub fn click_at(&self, x: i32, y: i32, button: MouseButton) -> Result<(), SendError> {
        self.move_to(x, y)?;
        self.sink.send_mouse(&MouseReport::buttons(button.mask()))?;
        pause(self.limits.mouse_move_delay);
        self.sink.send_mouse(&MouseReport::release())
    }
}

fn clamp_axis(value: i32) -> i8 {
    value.clamp(-127, 127) as i8
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
