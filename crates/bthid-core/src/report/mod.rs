//! HID report model: report structs, report IDs, and boot/report-mode framing.
//!
//! The device declares two reports (see [`descriptor`]):
//!
//! | Report ID | Device   | Report-mode frame                        | Boot-mode frame        |
//! |-----------|----------|------------------------------------------|------------------------|
//! | 1         | keyboard | `[0x01, modifiers, reserved, keys[0..6]]` | report ID stripped     |
//! | 2         | mouse    | `[0x02, buttons, dx, dy, wheel]`          | ID and wheel stripped  |
//!
//! In boot mode the host expects the legacy BIOS-compatible layout, so the
//! leading report-ID byte is omitted and the mouse report drops the wheel.
//! On the interrupt channel the report-ID byte doubles as the first byte of
//! the framed packet; no additional HIDP header is prepended.

pub mod descriptor;

// ── Report IDs and masks ──────────────────────────────────────────────────────

/// Report ID of the keyboard input/output report.
pub const KEYBOARD_REPORT_ID: u8 = 0x01;

/// Report ID of the mouse input report.
pub const MOUSE_REPORT_ID: u8 = 0x02;

/// Modifier-byte mask for the left Shift key.
pub const LEFT_SHIFT_MASK: u8 = 0x02;

// ── Protocol mode ─────────────────────────────────────────────────────────────

/// HID protocol mode negotiated over the control channel.
///
/// Report mode is the default after every (re)connection; hosts that cannot
/// parse the report descriptor (BIOS, bootloaders) switch to boot mode via
/// SET_PROTOCOL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ProtocolMode {
    Boot = 0x00,
    #[default]
    Report = 0x01,
}

impl ProtocolMode {
    /// Decodes the low bit of a SET_PROTOCOL parameter.
    pub fn from_param(param: u8) -> Self {
        if param & 0x01 == 0 {
            ProtocolMode::Boot
        } else {
            ProtocolMode::Report
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lower-case name used in the STATUS JSON payload.
    pub fn name(self) -> &'static str {
        match self {
            ProtocolMode::Boot => "boot",
            ProtocolMode::Report => "report",
        }
    }
}

// ── Report structs ────────────────────────────────────────────────────────────

/// One keyboard input report: a modifier bitmask plus up to six concurrently
/// pressed key usages. The all-zero default is the release report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub reserved: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    /// A press report for a single key, with the left-Shift modifier applied
    /// when the character requires it.
    pub fn press(usage: u8, requires_shift: bool) -> Self {
        let mut report = Self::default();
        if requires_shift {
            report.modifiers = LEFT_SHIFT_MASK;
        }
        report.keys[0] = usage;
        report
    }

    /// The all-zero release report.
    pub fn release() -> Self {
        Self::default()
    }
}

/// One mouse input report: button bitmask plus relative X/Y/wheel deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseReport {
    pub buttons: u8,
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
}

impl MouseReport {
    pub fn motion(dx: i8, dy: i8, wheel: i8) -> Self {
        Self {
            buttons: 0,
            dx,
            dy,
            wheel,
        }
    }

    pub fn buttons(mask: u8) -> Self {
        Self {
            buttons: mask,
            ..Self::default()
        }
    }

    /// The all-zero release report.
    pub fn release() -> Self {
        Self::default()
    }
}

// ── Mouse buttons ─────────────────────────────────────────────────────────────

/// The three pointer buttons the report descriptor declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Bit in the mouse report's button byte.
    pub fn mask(self) -> u8 {
        match self {
            MouseButton::Left => 0x01,
            MouseButton::Right => 0x02,
            MouseButton::Middle => 0x04,
        }
    }

    /// Parses the button names accepted by the command surfaces.
    ///
    /// Both the semantic names (`left`/`right`/`middle`, plus `mid`) and the
    /// positional aliases (`button1`..`button3`) are recognized,
    /// case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "left" | "button1" => Some(MouseButton::Left),
            "right" | "button2" => Some(MouseButton::Right),
            "middle" | "mid" | "button3" => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

// ── Framing ───────────────────────────────────────────────────────────────────

/// Frames a keyboard report for the interrupt channel.
///
/// 9 bytes in report mode, 8 in boot mode (the report-ID byte is stripped).
pub fn encode_keyboard(report: &KeyboardReport, mode: ProtocolMode) -> Vec<u8> {
    let mut frame = Vec::with_capacity(9);
    frame.push(KEYBOARD_REPORT_ID);
    frame.push(report.modifiers);
    frame.push(report.reserved);
    frame.extend_from_slice(&report.keys);
    if mode == ProtocolMode::Boot {
        frame.remove(0);
    }
    frame
}

/// Frames a mouse report for the interrupt channel.
///
/// 5 bytes in report mode; boot mode strips the report ID and the wheel,
/// leaving the legacy 3-byte buttons/X/Y layout.
pub fn encode_mouse(report: &MouseReport, mode: ProtocolMode) -> Vec<u8> {
    match mode {
        ProtocolMode::Report => vec![
            MOUSE_REPORT_ID,
            report.buttons,
            report.dx as u8,
            report.dy as u8,
            report.wheel as u8,
        ],
        ProtocolMode::Boot => vec![report.buttons, report.dx as u8, report.dy as u8],
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
