//! HIDP control-channel message handling.
//!
//! Every control message starts with a single header byte `H`. The high
//! nibble (`H & 0xF0`) selects the message type and the low nibble
//! (`H & 0x0F`) carries a type-specific parameter:
//!
//! | Type | Mnemonic      | Parameter use                                  |
//! |------|---------------|------------------------------------------------|
//! | 0x00 | HANDSHAKE     | result code from the host                      |
//! | 0x10 | HID_CONTROL   | control operation (0x05 = virtual cable unplug)|
//! | 0x40 | GET_REPORT    | report type                                    |
//! | 0x50 | SET_REPORT    | bit 3 = report ID present, bits 0-1 = type     |
//! | 0x60 | GET_PROTOCOL  | –                                              |
//! | 0x70 | SET_PROTOCOL  | bit 0 = requested mode                         |
//! | 0xA0 | DATA          | report type                                    |
//!
//! Handling is pure: [`handle_control_message`] mutates only the protocol
//! mode and LED byte it is given and describes everything else (the reply
//! to send, whether to reset the session) in the returned
//! [`ControlOutcome`]. The caller owns the I/O and the ordering guarantee
//! that the reply is written before a reset is applied.

use crate::report::{ProtocolMode, KEYBOARD_REPORT_ID};

// ── HIDP message types (high nibble of the header byte) ───────────────────────

pub const MSG_HANDSHAKE: u8 = 0x00;
pub const MSG_HID_CONTROL: u8 = 0x10;
pub const MSG_GET_REPORT: u8 = 0x40;
pub const MSG_SET_REPORT: u8 = 0x50;
pub const MSG_GET_PROTOCOL: u8 = 0x60;
pub const MSG_SET_PROTOCOL: u8 = 0x70;
pub const MSG_DATA: u8 = 0xA0;

// ── Handshake result codes ────────────────────────────────────────────────────

pub const HANDSHAKE_SUCCESS: u8 = 0x00;
pub const HANDSHAKE_ERR_UNSUPPORTED: u8 = 0x03;

/// HID_CONTROL parameter: the host asks the device to forget the pairing.
pub const CONTROL_VIRTUAL_CABLE_UNPLUG: u8 = 0x05;

/// Output report type in the SET_REPORT parameter bits 0-1.
const REPORT_TYPE_OUTPUT: u8 = 0x02;

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Session-level effect of a control message, applied by the caller after
/// the reply has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    None,
    /// Virtual cable unplug: close both peers and return to idle.
    Reset,
}

/// What the caller must do with a handled control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    /// Bytes to write back on the control channel, if any.
    pub reply: Option<Vec<u8>>,
    pub action: ControlAction,
}

impl ControlOutcome {
    fn reply(bytes: Vec<u8>) -> Self {
        Self {
            reply: Some(bytes),
            action: ControlAction::None,
        }
    }

    fn silent() -> Self {
        Self {
            reply: None,
            action: ControlAction::None,
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Handles one inbound HIDP control message.
///
/// `mode` and `led_status` are the session's protocol mode and LED byte;
/// the caller passes them in under its state lock. An empty message yields
/// no reply (a zero-length *receive* additionally signals peer closure,
/// which the caller handles before dispatch).
pub fn handle_control_message(
    data: &[u8],
    mode: &mut ProtocolMode,
    led_status: &mut u8,
) -> ControlOutcome {
    let Some(&header) = data.first() else {
        return ControlOutcome::silent();
    };
    let msg_type = header & 0xF0;
    let param = header & 0x0F;

    match msg_type {
        MSG_HANDSHAKE => {
            // The host acknowledging a previous response. Nothing to do.
            ControlOutcome::silent()
        }
        MSG_HID_CONTROL => {
            if param == CONTROL_VIRTUAL_CABLE_UNPLUG {
                ControlOutcome {
                    reply: Some(vec![HANDSHAKE_SUCCESS]),
                    action: ControlAction::Reset,
                }
            } else {
                ControlOutcome::reply(vec![HANDSHAKE_SUCCESS])
            }
        }
        MSG_GET_REPORT => ControlOutcome::reply(vec![HANDSHAKE_ERR_UNSUPPORTED]),
        MSG_SET_REPORT => {
            handle_set_report(param, &data[1..], led_status);
            ControlOutcome::reply(vec![HANDSHAKE_SUCCESS])
        }
        MSG_GET_PROTOCOL => {
            // DATA header with the "other" report type, then the mode byte.
            ControlOutcome::reply(vec![MSG_DATA | 0x03, mode.as_u8()])
        }
        MSG_SET_PROTOCOL => {
            *mode = ProtocolMode::from_param(param);
            ControlOutcome::reply(vec![HANDSHAKE_SUCCESS])
        }
        MSG_DATA => {
            // Reports belong on the interrupt channel; ignored here.
            ControlOutcome::silent()
        }
        _ => ControlOutcome::reply(vec![HANDSHAKE_SUCCESS]),
    }
}

/// Captures the LED byte from a keyboard output report.
///
/// The report ID may be explicit (parameter bit 3) or implied; an output
/// report with an empty payload is a no-op.
fn handle_set_report(param: u8, mut payload: &[u8], led_status: &mut u8) {
    let has_report_id = param & 0x08 != 0;
    let report_type = param & 0x03;

    let mut report_id = 0;
    if has_report_id {
        if let Some((&id, rest)) = payload.split_first() {
            report_id = id;
            payload = rest;
        }
    }

    if report_type == REPORT_TYPE_OUTPUT
        && !payload.is_empty()
        && (!has_report_id || report_id == KEYBOARD_REPORT_ID)
    {
        *led_status = payload[0];
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatch(data: &[u8]) -> (ControlOutcome, ProtocolMode, u8) {
        let mut mode = ProtocolMode::Report;
        let mut led = 0;
        let outcome = handle_control_message(data, &mut mode, &mut led);
        (outcome, mode, led)
    }

    // ── SET_PROTOCOL / GET_PROTOCOL ───────────────────────────────────────────

    #[test]
    fn test_set_protocol_boot_applies_low_bit_and_replies_success() {
        let (outcome, mode, _) = dispatch(&[0x70]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(outcome.action, ControlAction::None);
        assert_eq!(mode, ProtocolMode::Boot);
    }

    #[test]
    fn test_set_protocol_report_round_trip() {
        let mut mode = ProtocolMode::Boot;
        let mut led = 0;
        let outcome = handle_control_message(&[0x71], &mut mode, &mut led);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(mode, ProtocolMode::Report);
    }

    #[test]
    fn test_set_protocol_only_low_parameter_bit_matters() {
        // 0x7E: parameter 0xE, low bit clear -> boot mode.
        let (_, mode, _) = dispatch(&[0x7E]);
        assert_eq!(mode, ProtocolMode::Boot);
    }

    #[test]
    fn test_get_protocol_replies_data_header_and_current_mode() {
        let mut mode = ProtocolMode::Boot;
        let mut led = 0;
        let outcome = handle_control_message(&[0x60], &mut mode, &mut led);
        assert_eq!(outcome.reply, Some(vec![0xA3, 0x00]));

        mode = ProtocolMode::Report;
        let outcome = handle_control_message(&[0x60], &mut mode, &mut led);
        assert_eq!(outcome.reply, Some(vec![0xA3, 0x01]));
    }

    #[test]
    fn test_protocol_round_trip_scenario() {
        // SET_PROTOCOL boot, then GET_PROTOCOL must report boot.
        let mut mode = ProtocolMode::Report;
        let mut led = 0;

        let set = handle_control_message(&[0x70], &mut mode, &mut led);
        assert_eq!(set.reply, Some(vec![0x00]));

        let get = handle_control_message(&[0x60], &mut mode, &mut led);
        assert_eq!(get.reply, Some(vec![0xA3, 0x00]));
    }

    // ── SET_REPORT ────────────────────────────────────────────────────────────

    #[test]
    fn test_set_report_output_with_explicit_keyboard_id_captures_led_byte() {
        // 0x52: type=output, has_report_id set via 0x08 -> header 0x5A.
        let (outcome, _, led) = dispatch(&[0x5A, 0x01, 0x02]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(led, 0x02, "caps-lock bit must be stored");
    }

    #[test]
    fn test_set_report_output_without_id_implies_keyboard() {
        let (outcome, _, led) = dispatch(&[0x52, 0x07]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(led, 0x07);
    }

    #[test]
    fn test_set_report_output_for_other_report_id_is_ignored() {
        let (outcome, _, led) = dispatch(&[0x5A, 0x02, 0xFF]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(led, 0, "mouse output must not touch the LED byte");
    }

    #[test]
    fn test_set_report_with_empty_payload_is_a_no_op() {
        let (outcome, _, led) = dispatch(&[0x52]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(led, 0);
    }

    #[test]
    fn test_set_report_with_id_but_no_data_is_a_no_op() {
        let (outcome, _, led) = dispatch(&[0x5A, 0x01]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(led, 0);
    }

    #[test]
    fn test_set_report_feature_type_does_not_capture_leds() {
        // type bits = 0x03 (feature).
        let (outcome, _, led) = dispatch(&[0x53, 0x02]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(led, 0);
    }

    // ── HID_CONTROL ───────────────────────────────────────────────────────────

    #[test]
    fn test_virtual_cable_unplug_replies_then_resets() {
        let (outcome, _, _) = dispatch(&[0x15]);
        assert_eq!(outcome.reply, Some(vec![0x00]));
        assert_eq!(outcome.action, ControlAction::Reset);
    }

    #[test]
    fn test_other_hid_control_operations_reply_without_reset() {
        for param in [0x00, 0x01, 0x03, 0x04] {
            let (outcome, _, _) = dispatch(&[MSG_HID_CONTROL | param]);
            assert_eq!(outcome.reply, Some(vec![0x00]));
            assert_eq!(outcome.action, ControlAction::None);
        }
    }

    // ── Remaining types ───────────────────────────────────────────────────────

    #[test]
    fn test_get_report_is_unsupported() {
        let (outcome, _, _) = dispatch(&[0x40]);
        assert_eq!(outcome.reply, Some(vec![0x03]));
    }

    #[test]
    fn test_handshake_from_host_produces_no_reply() {
        let (outcome, _, _) = dispatch(&[0x00]);
        assert_eq!(outcome.reply, None);
        assert_eq!(outcome.action, ControlAction::None);
    }

    #[test]
    fn test_data_on_control_channel_is_ignored() {
        let (outcome, mode, led) = dispatch(&[0xA1, 0x01, 0xFF]);
        assert_eq!(outcome.reply, None);
        assert_eq!(mode, ProtocolMode::Report);
        assert_eq!(led, 0);
    }

    #[test]
    fn test_unknown_message_types_get_a_success_handshake() {
        for header in [0x20, 0x30, 0x80, 0x90, 0xB0, 0xF7] {
            let (outcome, _, _) = dispatch(&[header]);
            assert_eq!(outcome.reply, Some(vec![0x00]), "header {header:#04x}");
        }
    }

    #[test]
    fn test_empty_message_is_silent() {
        let (outcome, _, _) = dispatch(&[]);
        assert_eq!(outcome.reply, None);
    }
}
