//! The SDP service record for the HID service, as BlueZ record XML.
//!
//! Record publication itself is the hosting system's job (BlueZ's profile
//! manager takes this XML verbatim); the daemon's contract is the exact
//! content: the HID service class, both L2CAP/HIDP protocol stacks, and
//! the HID attribute block hosts read before connecting. `jadeai-bthid
//! sdp-record` prints the record for manual registration.

use std::fmt::Write;

use bthid_core::report::descriptor::REPORT_DESCRIPTOR;

use super::l2cap::{PSM_HID_CONTROL, PSM_HID_INTERRUPT};

pub const SERVICE_NAME: &str = "JadeAI HID";
pub const SERVICE_DESCRIPTION: &str = "Combined keyboard and mouse";
pub const PROVIDER_NAME: &str = "JadeAI";

/// HID service class / profile UUID.
const UUID_HID_SERVICE: u16 = 0x1124;
/// L2CAP protocol UUID.
const UUID_L2CAP: u16 = 0x0100;
/// HIDP protocol UUID.
const UUID_HIDP: u16 = 0x0011;
/// Public browse group UUID.
const UUID_PUBLIC_BROWSE_GROUP: u16 = 0x1002;

/// Builds the complete service record.
pub fn service_record_xml() -> String {
    let mut xml = String::with_capacity(4096);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<record>\n");

    // ServiceClassIDList: HID.
    attribute(&mut xml, 0x0001, |body| {
        sequence(body, |seq| uuid16(seq, UUID_HID_SERVICE));
    });

    // ProtocolDescriptorList: L2CAP (control PSM) then HIDP.
    attribute(&mut xml, 0x0004, |body| {
        sequence(body, |seq| {
            sequence(seq, |proto| {
                uuid16(proto, UUID_L2CAP);
                uint16(proto, PSM_HID_CONTROL);
            });
            sequence(seq, |proto| uuid16(proto, UUID_HIDP));
        });
    });

    // BrowseGroupList: public.
    attribute(&mut xml, 0x0005, |body| {
        sequence(body, |seq| uuid16(seq, UUID_PUBLIC_BROWSE_GROUP));
    });

    // LanguageBaseAttributeIDList: English, UTF-8, base 0x0100.
    attribute(&mut xml, 0x0006, |body| {
        sequence(body, |seq| {
            uint16(seq, 0x656E); // "en"
            uint16(seq, 0x006A); // UTF-8 (MIBenum 106)
            uint16(seq, 0x0100);
        });
    });

    // BluetoothProfileDescriptorList: HID v1.0.
    attribute(&mut xml, 0x0009, |body| {
        sequence(body, |seq| {
            sequence(seq, |profile| {
                uuid16(profile, UUID_HID_SERVICE);
                uint16(profile, 0x0100);
            });
        });
    });

    // AdditionalProtocolDescriptorLists: the interrupt channel.
    attribute(&mut xml, 0x000D, |body| {
        sequence(body, |outer| {
            sequence(outer, |stack| {
                sequence(stack, |proto| {
                    uuid16(proto, UUID_L2CAP);
                    uint16(proto, PSM_HID_INTERRUPT);
                });
                sequence(stack, |proto| uuid16(proto, UUID_HIDP));
            });
        });
    });

    // Service info strings.
    attribute(&mut xml, 0x0100, |body| text(body, SERVICE_NAME));
    attribute(&mut xml, 0x0101, |body| text(body, SERVICE_DESCRIPTION));
    attribute(&mut xml, 0x0102, |body| text(body, PROVIDER_NAME));

    // HID attribute block.
    attribute(&mut xml, 0x0200, |body| uint16(body, 0x0100)); // DeviceReleaseNumber
    attribute(&mut xml, 0x0201, |body| uint16(body, 0x0111)); // ParserVersion
    attribute(&mut xml, 0x0202, |body| uint8(body, 0xC0)); // DeviceSubclass: combo keyboard/pointer
    attribute(&mut xml, 0x0203, |body| uint8(body, 0x00)); // CountryCode
    attribute(&mut xml, 0x0204, |body| boolean(body, true)); // VirtualCable
    attribute(&mut xml, 0x0205, |body| boolean(body, true)); // ReconnectInitiate

    // HIDDescriptorList: one report descriptor (class descriptor type 0x22).
    attribute(&mut xml, 0x0206, |body| {
        sequence(body, |seq| {
            sequence(seq, |descriptor| {
                uint8(descriptor, 0x22);
                hex_text(descriptor, &REPORT_DESCRIPTOR);
            });
        });
    });

    // HIDLANGIDBaseList: English (US), base 0x0100.
    attribute(&mut xml, 0x0207, |body| {
        sequence(body, |seq| {
            sequence(seq, |lang| {
                uint16(lang, 0x0409);
                uint16(lang, 0x0100);
            });
        });
    });

    attribute(&mut xml, 0x0209, |body| boolean(body, true)); // BatteryPower
    attribute(&mut xml, 0x020A, |body| boolean(body, true)); // RemoteWakeup
    attribute(&mut xml, 0x020B, |body| uint16(body, 0x0100)); // ProfileVersion
    attribute(&mut xml, 0x020C, |body| uint16(body, 0x0C80)); // SupervisionTimeout
    attribute(&mut xml, 0x020D, |body| boolean(body, false)); // NormallyConnectable
    attribute(&mut xml, 0x020E, |body| boolean(body, true)); // BootDevice

    xml.push_str("</record>\n");
    xml
}

// ── XML helpers ───────────────────────────────────────────────────────────────

fn attribute(xml: &mut String, id: u16, body: impl FnOnce(&mut String)) {
    let _ = write!(xml, "  <attribute id=\"{id:#06x}\">\n");
    body(xml);
    xml.push_str("  </attribute>\n");
}

fn sequence(xml: &mut String, body: impl FnOnce(&mut String)) {
    xml.push_str("    <sequence>\n");
    body(xml);
    xml.push_str("    </sequence>\n");
}

fn uuid16(xml: &mut String, value: u16) {
    let _ = write!(xml, "    <uuid value=\"{value:#06x}\" />\n");
}

fn uint16(xml: &mut String, value: u16) {
    let _ = write!(xml, "    <uint16 value=\"{value:#06x}\" />\n");
}

fn uint8(xml: &mut String, value: u8) {
    let _ = write!(xml, "    <uint8 value=\"{value:#04x}\" />\n");
}

fn boolean(xml: &mut String, value: bool) {
    let _ = write!(xml, "    <boolean value=\"{value}\" />\n");
}

fn text(xml: &mut String, value: &str) {
    let _ = write!(xml, "    <text value=\"{value}\" />\n");
}

fn hex_text(xml: &mut String, bytes: &[u8]) {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(encoded, "{byte:02x}");
    }
    let _ = write!(xml, "    <text encoding=\"hex\" value=\"{encoded}\" />\n");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_names_hid_service_class_and_profile() {
        let xml = service_record_xml();
        assert!(xml.contains("<uuid value=\"0x1124\" />"));
        // Profile descriptor carries version 1.00.
        assert!(xml.contains("<attribute id=\"0x0009\">"));
    }

    #[test]
    fn test_record_declares_both_psms() {
        let xml = service_record_xml();
        assert!(xml.contains("<uint16 value=\"0x0011\" />"), "control PSM");
        assert!(xml.contains("<uint16 value=\"0x0013\" />"), "interrupt PSM");
    }

    #[test]
    fn test_record_carries_the_full_report_descriptor_in_hex() {
        let xml = service_record_xml();
        // The descriptor opens with Usage Page (Generic Desktop), Usage
        // (Keyboard), Collection (Application), Report ID 1.
        assert!(xml.contains("value=\"05010906a1018501"));
        // 119 descriptor bytes -> 238 hex characters.
        let hex = xml
            .split("encoding=\"hex\" value=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .expect("hex descriptor present");
        assert_eq!(hex.len(), REPORT_DESCRIPTOR.len() * 2);
    }

    #[test]
    fn test_record_hid_attribute_block_values() {
        let xml = service_record_xml();
        assert!(xml.contains("<attribute id=\"0x0200\">")); // release
        assert!(xml.contains("<uint16 value=\"0x0111\" />")); // parser version
        assert!(xml.contains("<uint8 value=\"0xc0\" />")); // combo subclass
        assert!(xml.contains("<uint16 value=\"0x0c80\" />")); // supervision timeout
    }

    #[test]
    fn test_record_boolean_flags_match_the_device_profile() {
        let xml = service_record_xml();
        for id in ["0x0204", "0x0205", "0x0209", "0x020a", "0x020e"] {
            let attr = format!("<attribute id=\"{id}\">\n    <boolean value=\"true\" />");
            assert!(xml.contains(&attr), "attribute {id} must be true");
        }
        // NormallyConnectable is the one false flag.
        assert!(xml.contains("<attribute id=\"0x020d\">\n    <boolean value=\"false\" />"));
    }

    #[test]
    fn test_record_service_info_strings() {
        let xml = service_record_xml();
        assert!(xml.contains("<text value=\"JadeAI HID\" />"));
        assert!(xml.contains("<text value=\"JadeAI\" />"));
        assert!(xml.contains("<text value=\"Combined keyboard and mouse\" />"));
    }

    #[test]
    fn test_record_xml_tags_are_balanced() {
        let xml = service_record_xml();
        for tag in ["attribute", "sequence", "record"] {
            let opens = xml.matches(&format!("<{tag}")).count();
            let closes = xml.matches(&format!("</{tag}>")).count();
            assert_eq!(opens, closes, "unbalanced <{tag}> elements");
        }
    }
}
