//! The line-delimited command protocol served on the UNIX socket.
//!
//! One ASCII line in, one line out:
//!
//! | Command                      | Reply                         |
//! |------------------------------|-------------------------------|
//! | `TYPE <text>`                | `OK` / `ERR Failed to type text` |
//! | `MOVE <dx> <dy> [wheel]`     | `OK` / `ERR ...`              |
//! | `CLICK <button>`             | `OK` / `ERR ...`              |
//! | `STATUS`                     | `OK {"connected":...}`        |
//! | `DISCONNECT`                 | `OK`                          |
//! | `SHUTDOWN`                   | `OK`, then the daemon exits   |
//!
//! `TYPE` recognizes the escapes `\n`, `\r`, `\t`, and `\\` so clients can
//! send control characters through the line protocol. Command words are
//! case-insensitive.

use serde::Serialize;
use tracing::debug;

use bthid_core::report::MouseButton;
use bthid_core::server::{SendError, StatusSnapshot};

// ── Engine seam ───────────────────────────────────────────────────────────────

/// What the command executor needs from the HID engine. The daemon's
/// [`HidService`](crate::application::service::HidService) implements this;
/// tests substitute a recorder.
pub trait HidControl: Send + Sync {
    fn type_text(&self, text: &str) -> Result<(), SendError>;
    fn move_mouse(&self, dx: i32, dy: i32, wheel: i32) -> Result<(), SendError>;
    fn click(&self, mask: u8) -> Result<(), SendError>;
    fn status(&self) -> StatusSnapshot;
    fn disconnect(&self);
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of executing one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The full response line, without the trailing newline.
    pub response: String,
    /// The client asked the daemon to exit (reply is still sent first).
    pub shutdown: bool,
}

impl CommandOutcome {
    fn ok() -> Self {
        Self {
            response: "OK".to_string(),
            shutdown: false,
        }
    }

    fn ok_with(payload: String) -> Self {
        Self {
            response: format!("OK {payload}"),
            shutdown: false,
        }
    }

    fn err(message: &str) -> Self {
        Self {
            response: format!("ERR {message}"),
            shutdown: false,
        }
    }
}

/// STATUS reply payload.
#[derive(Serialize)]
struct StatusPayload {
    connected: bool,
    protocol: &'static str,
    led_state: u8,
}

impl From<StatusSnapshot> for StatusPayload {
    fn from(status: StatusSnapshot) -> Self {
        Self {
            connected: status.connected,
            protocol: status.protocol.name(),
            led_state: status.led_state,
        }
    }
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// Executes one command line against the engine.
pub fn execute(line: &str, hid: &dyn HidControl) -> CommandOutcome {
    let line = line.trim_end_matches(['\r', '\n']);
    let (word, rest) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (line, ""),
    };
    if word.is_empty() {
        return CommandOutcome::err("Missing command");
    }
    debug!(command = word, "executing command");

    match word.to_ascii_uppercase().as_str() {
        "TYPE" => {
            if rest.is_empty() {
                return CommandOutcome::err("Missing text");
            }
            let decoded = decode_escapes(rest);
            match hid.type_text(&decoded) {
                Ok(()) => CommandOutcome::ok(),
                Err(_) => CommandOutcome::err("Failed to type text"),
            }
        }
        "MOVE" => {
            let mut args = rest.split_whitespace();
            let (Some(dx), Some(dy)) = (parse_i32(args.next()), parse_i32(args.next())) else {
                return CommandOutcome::err("MOVE requires X and Y");
            };
            let wheel = parse_i32(args.next()).unwrap_or(0);
            match hid.move_mouse(dx, dy, wheel) {
                Ok(()) => CommandOutcome::ok(),
                Err(_) => CommandOutcome::err("Failed to move mouse"),
            }
        }
        "CLICK" => {
            let Some(name) = rest.split_whitespace().next() else {
                return CommandOutcome::err("CLICK requires button");
            };
            let Some(button) = MouseButton::from_name(name) else {
                return CommandOutcome::err("Unknown button");
            };
            match hid.click(button.mask()) {
                Ok(()) => CommandOutcome::ok(),
                Err(_) => CommandOutcome::err("Failed to click"),
            }
        }
        "STATUS" => {
            let payload = StatusPayload::from(hid.status());
            match serde_json::to_string(&payload) {
                Ok(json) => CommandOutcome::ok_with(json),
                Err(_) => CommandOutcome::err("Failed to serialize status"),
            }
        }
        "DISCONNECT" => {
            hid.disconnect();
            CommandOutcome::ok()
        }
        "SHUTDOWN" => CommandOutcome {
            response: "OK".to_string(),
            shutdown: true,
        },
        _ => CommandOutcome::err("Unknown command"),
    }
}

fn parse_i32(token: Option<&str>) -> Option<i32> {
    token.and_then(|t| t.parse().ok())
}

/// Decodes the `\n`, `\r`, `\t`, and `\\` escapes; an unknown escape keeps
/// the escaped character as-is.
pub fn decode_escapes(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some('\\') => output.push('\\'),
            Some(other) => output.push(other),
            None => output.push('\\'),
        }
    }
    output
}

/// Escapes text for transport over the line protocol (the client-side
/// inverse of [`decode_escapes`]).
pub fn encode_escapes(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            _ => output.push(ch),
        }
    }
    output
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bthid_core::report::ProtocolMode;
    use std::sync::Mutex;

    struct RecordingHid {
        typed: Mutex<Vec<String>>,
        moves: Mutex<Vec<(i32, i32, i32)>>,
        clicks: Mutex<Vec<u8>>,
        disconnects: Mutex<usize>,
        fail_sends: bool,
        status: StatusSnapshot,
    }

    impl RecordingHid {
        fn new() -> Self {
            Self {
                typed: Mutex::new(Vec::new()),
                moves: Mutex::new(Vec::new()),
                clicks: Mutex::new(Vec::new()),
                disconnects: Mutex::new(0),
                fail_sends: false,
                status: StatusSnapshot {
                    connected: false,
                    protocol: ProtocolMode::Report,
                    led_state: 0,
                },
            }
        }
    }

    impl HidControl for RecordingHid {
        fn type_text(&self, text: &str) -> Result<(), SendError> {
            if self.fail_sends {
                return Err(SendError::NotConnected);
            }
            self.typed.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn move_mouse(&self, dx: i32, dy: i32, wheel: i32) -> Result<(), SendError> {
            if self.fail_sends {
                return Err(SendError::NotConnected);
            }
            self.moves.lock().unwrap().push((dx, dy, wheel));
            Ok(())
        }

        fn click(&self, mask: u8) -> Result<(), SendError> {
            if self.fail_sends {
                return Err(SendError::NotConnected);
            }
            self.clicks.lock().unwrap().push(mask);
            Ok(())
        }

        fn status(&self) -> StatusSnapshot {
            self.status
        }

        fn disconnect(&self) {
            *self.disconnects.lock().unwrap() += 1;
        }
    }

    // ── TYPE ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_type_passes_decoded_text_to_the_engine() {
        let hid = RecordingHid::new();
        let outcome = execute("TYPE hello world\\n", &hid);
        assert_eq!(outcome.response, "OK");
        assert!(!outcome.shutdown);
        assert_eq!(*hid.typed.lock().unwrap(), vec!["hello world\n".to_string()]);
    }

    #[test]
    fn test_type_preserves_interior_spaces() {
        let hid = RecordingHid::new();
        execute("TYPE a  b   c", &hid);
        assert_eq!(*hid.typed.lock().unwrap(), vec!["a  b   c".to_string()]);
    }

    #[test]
    fn test_type_without_text_is_an_error() {
        let hid = RecordingHid::new();
        assert_eq!(execute("TYPE", &hid).response, "ERR Missing text");
    }

    #[test]
    fn test_type_reports_transport_failure() {
        let mut hid = RecordingHid::new();
        hid.fail_sends = true;
        assert_eq!(execute("TYPE hi", &hid).response, "ERR Failed to type text");
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        let hid = RecordingHid::new();
        assert_eq!(execute("type hi", &hid).response, "OK");
        assert_eq!(execute("Type hi", &hid).response, "OK");
    }

    // ── MOVE ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_move_with_and_without_wheel() {
        let hid = RecordingHid::new();
        assert_eq!(execute("MOVE 10 -20", &hid).response, "OK");
        assert_eq!(execute("MOVE 1 2 3", &hid).response, "OK");
        assert_eq!(*hid.moves.lock().unwrap(), vec![(10, -20, 0), (1, 2, 3)]);
    }

    #[test]
    fn test_move_requires_both_axes() {
        let hid = RecordingHid::new();
        assert_eq!(execute("MOVE 10", &hid).response, "ERR MOVE requires X and Y");
        assert_eq!(execute("MOVE", &hid).response, "ERR MOVE requires X and Y");
        assert_eq!(execute("MOVE a b", &hid).response, "ERR MOVE requires X and Y");
    }

    // ── CLICK ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_click_maps_button_names_to_masks() {
        let hid = RecordingHid::new();
        execute("CLICK left", &hid);
        execute("CLICK button2", &hid);
        execute("CLICK MIDDLE", &hid);
        assert_eq!(*hid.clicks.lock().unwrap(), vec![0x01, 0x02, 0x04]);
    }

    #[test]
    fn test_click_with_unknown_button_is_an_error() {
        let hid = RecordingHid::new();
        assert_eq!(execute("CLICK side", &hid).response, "ERR Unknown button");
    }

    #[test]
    fn test_click_without_button_is_an_error() {
        let hid = RecordingHid::new();
        assert_eq!(execute("CLICK", &hid).response, "ERR CLICK requires button");
    }

    // ── STATUS / DISCONNECT / SHUTDOWN ────────────────────────────────────────

    #[test]
    fn test_status_returns_json_payload() {
        let mut hid = RecordingHid::new();
        hid.status = StatusSnapshot {
            connected: true,
            protocol: ProtocolMode::Boot,
            led_state: 2,
        };
        let outcome = execute("STATUS", &hid);
        assert_eq!(
            outcome.response,
            "OK {\"connected\":true,\"protocol\":\"boot\",\"led_state\":2}"
        );
    }

    #[test]
    fn test_disconnect_forwards_to_the_engine() {
        let hid = RecordingHid::new();
        assert_eq!(execute("DISCONNECT", &hid).response, "OK");
        assert_eq!(*hid.disconnects.lock().unwrap(), 1);
    }

    #[test]
    fn test_shutdown_acknowledges_and_flags_exit() {
        let hid = RecordingHid::new();
        let outcome = execute("SHUTDOWN", &hid);
        assert_eq!(outcome.response, "OK");
        assert!(outcome.shutdown);
    }

    #[test]
    fn test_unknown_and_empty_commands_are_errors() {
        let hid = RecordingHid::new();
        assert_eq!(execute("FROBNICATE", &hid).response, "ERR Unknown command");
        assert_eq!(execute("", &hid).response, "ERR Missing command");
    }

    // ── Escapes ───────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_escapes_round_trips_with_encode() {
        let original = "line1\nline2\ttabbed \\ backslash\r";
        assert_eq!(decode_escapes(&encode_escapes(original)), original);
    }

    #[test]
    fn test_decode_unknown_escape_keeps_the_character() {
        assert_eq!(decode_escapes("\\x"), "x");
    }

    #[test]
    fn test_decode_trailing_backslash_is_kept() {
        assert_eq!(decode_escapes("abc\\"), "abc\\");
    }
}
