//! Character table: US-ASCII characters to USB HID usage codes.
//!
//! HID usage codes (keyboard/keypad page 0x07) name *physical keys*, not
//! characters: `a` and `A` share usage 0x04 and differ only in whether the
//! Shift modifier accompanies the press. The table therefore yields a
//! [`KeyInfo`] pairing the usage with a shift requirement, and the input
//! engine turns that into the modifier byte of the keyboard report.
//!
//! The mapping covers the printable US-ASCII set plus the control
//! characters a host expects from typed text (newline, tab, backspace,
//! escape). Characters outside the recognized set yield `None` and are
//! skipped by callers.

/// A single resolved keystroke: the HID usage code and whether left Shift
/// must be held to produce the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    pub usage: u8,
    pub requires_shift: bool,
}

impl KeyInfo {
    const fn plain(usage: u8) -> Self {
        Self {
            usage,
            requires_shift: false,
        }
    }

    const fn shifted(usage: u8) -> Self {
        Self {
            usage,
            requires_shift: true,
        }
    }
}

/// Maps one character to its keystroke, or `None` when the character has no
/// representation on a US keyboard.
///
/// The mapping is total over the recognized set and deterministic.
pub fn map_char(ch: char) -> Option<KeyInfo> {
    let info = match ch {
        'a'..='z' => KeyInfo::plain(0x04 + (ch as u8 - b'a')),
        'A'..='Z' => KeyInfo::shifted(0x04 + (ch as u8 - b'A')),
        '1'..='9' => KeyInfo::plain(0x1E + (ch as u8 - b'1')),
        '0' => KeyInfo::plain(0x27),
        '!' => KeyInfo::shifted(0x1E),
        '@' => KeyInfo::shifted(0x1F),
        '#' => KeyInfo::shifted(0x20),
        '$' => KeyInfo::shifted(0x21),
        '%' => KeyInfo::shifted(0x22),
        '^' => KeyInfo::shifted(0x23),
        '&' => KeyInfo::shifted(0x24),
        '*' => KeyInfo::shifted(0x25),
        '(' => KeyInfo::shifted(0x26),
        ')' => KeyInfo::shifted(0x27),
        '\n' | '\r' => KeyInfo::plain(0x28),
        '\x1b' => KeyInfo::plain(0x29),
        '\x08' => KeyInfo::plain(0x2A),
        '\t' => KeyInfo::plain(0x2B),
        ' ' => KeyInfo::plain(0x2C),
        '-' => KeyInfo::plain(0x2D),
        '_' => KeyInfo::shifted(0x2D),
        '=' => KeyInfo::plain(0x2E),
        '+' => KeyInfo::shifted(0x2E),
        '[' => KeyInfo::plain(0x2F),
        '{' => KeyInfo::shifted(0x2F),
        ']' => KeyInfo::plain(0x30),
        '}' => KeyInfo::shifted(0x30),
        '\\' => KeyInfo::plain(0x31),
        '|' => KeyInfo::shifted(0x31),
        ';' => KeyInfo::plain(0x33),
        ':' => KeyInfo::shifted(0x33),
        '\'' => KeyInfo::plain(0x34),
        '"' => KeyInfo::shifted(0x34),
        '`' => KeyInfo::plain(0x35),
        '~' => KeyInfo::shifted(0x35),
        ',' => KeyInfo::plain(0x36),
        '<' => KeyInfo::shifted(0x36),
        '.' => KeyInfo::plain(0x37),
        '>' => KeyInfo::shifted(0x37),
        '/' => KeyInfo::plain(0x38),
        '?' => KeyInfo::shifted(0x38),
        _ => return None,
    };
    Some(info)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
