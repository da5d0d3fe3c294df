//! Declarative GATT layout of the BLE HID device.
//!
//! The hosting process registers this application with BlueZ
//! (`GattManager1.RegisterApplication` / `LEAdvertisingManager1.
//! RegisterAdvertisement` on the configured adapter); the layout here is
//! the contract hosts discover:
//!
//! - HID service `1812`: HID Information, Report Map (the report
//!   descriptor), HID Control Point, Protocol Mode, one input Report per
//!   device with its Report Reference descriptor, and the boot-mode input
//!   characteristics.
//! - Device Information service `180A`: Manufacturer Name and PnP ID.
//!
//! Live values (input reports, protocol mode, control point) are backed by
//! the [`NotifyHub`](crate::infrastructure::notify::NotifyHub); this module
//! only describes the static shape and initial values.

use bthid_core::report::descriptor::REPORT_DESCRIPTOR;

use super::config::HidConfig;

// ── UUIDs ─────────────────────────────────────────────────────────────────────

pub const HID_SERVICE_UUID: &str = "00001812-0000-1000-8000-00805f9b34fb";
pub const DEVICE_INFO_SERVICE_UUID: &str = "0000180a-0000-1000-8000-00805f9b34fb";

pub const HID_INFORMATION_UUID: &str = "00002a4a-0000-1000-8000-00805f9b34fb";
pub const REPORT_MAP_UUID: &str = "00002a4b-0000-1000-8000-00805f9b34fb";
pub const HID_CONTROL_POINT_UUID: &str = "00002a4c-0000-1000-8000-00805f9b34fb";
pub const REPORT_UUID: &str = "00002a4d-0000-1000-8000-00805f9b34fb";
pub const PROTOCOL_MODE_UUID: &str = "00002a4e-0000-1000-8000-00805f9b34fb";
pub const BOOT_KEYBOARD_INPUT_UUID: &str = "00002a22-0000-1000-8000-00805f9b34fb";
pub const BOOT_MOUSE_INPUT_UUID: &str = "00002a33-0000-1000-8000-00805f9b34fb";
pub const REPORT_REFERENCE_UUID: &str = "00002908-0000-1000-8000-00805f9b34fb";
pub const MANUFACTURER_NAME_UUID: &str = "00002a29-0000-1000-8000-00805f9b34fb";
pub const PNP_ID_UUID: &str = "00002a50-0000-1000-8000-00805f9b34fb";

// ── Fixed values ──────────────────────────────────────────────────────────────

/// HID Information: bcdHID 1.11, country code 0, flags remote-wake +
/// normally-connectable.
pub fn hid_information() -> Vec<u8> {
    vec![0x11, 0x01, 0x00, 0x02]
}

/// PnP ID: vendor ID source USB, vendor 0x04D4, product 0x1234, version 0.01.
pub fn pnp_id() -> Vec<u8> {
    vec![0x02, 0xD4, 0x04, 0x34, 0x12, 0x01, 0x00]
}

/// Report Reference descriptor value for the keyboard input report
/// (report ID 1, input).
pub const KEYBOARD_REPORT_REFERENCE: [u8; 2] = [0x01, 0x01];

/// Report Reference descriptor value for the mouse input report
/// (report ID 2, input).
pub const MOUSE_REPORT_REFERENCE: [u8; 2] = [0x02, 0x01];

// ── Layout types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorDef {
    pub uuid: &'static str,
    pub flags: &'static [&'static str],
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub uuid: &'static str,
    pub flags: &'static [&'static str],
    pub initial_value: Vec<u8>,
    pub descriptors: Vec<DescriptorDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: &'static str,
    pub primary: bool,
    pub characteristics: Vec<CharacteristicDef>,
}

/// LE advertisement content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementDef {
    pub advertisement_type: &'static str,
    pub service_uuids: Vec<&'static str>,
    pub local_name: String,
    pub appearance: u16,
    pub discoverable: bool,
}

fn characteristic(
    uuid: &'static str,
    flags: &'static [&'static str],
    initial_value: Vec<u8>,
) -> CharacteristicDef {
    CharacteristicDef {
        uuid,
        flags,
        initial_value,
        descriptors: Vec::new(),
    }
}

// ── Layout builders ───────────────────────────────────────────────────────────

/// The primary HID service.
pub fn hid_service() -> ServiceDef {
    let keyboard_release = vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0];
    let mouse_release = vec![0x02, 0, 0, 0, 0];

    let mut keyboard_report = characteristic(REPORT_UUID, &["read", "notify"], keyboard_release);
    keyboard_report.descriptors.push(DescriptorDef {
        uuid: REPORT_REFERENCE_UUID,
        flags: &["read"],
        value: KEYBOARD_REPORT_REFERENCE.to_vec(),
    });

    let mut mouse_report = characteristic(REPORT_UUID, &["read", "notify"], mouse_release);
    mouse_report.descriptors.push(DescriptorDef {
        uuid: REPORT_REFERENCE_UUID,
        flags: &["read"],
        value: MOUSE_REPORT_REFERENCE.to_vec(),
    });

    ServiceDef {
        uuid: HID_SERVICE_UUID,
        primary: true,
        characteristics: vec![
            characteristic(HID_INFORMATION_UUID, &["read"], hid_information()),
            characteristic(REPORT_MAP_UUID, &["read"], REPORT_DESCRIPTOR.to_vec()),
            characteristic(HID_CONTROL_POINT_UUID, &["write-without-response"], vec![0x00]),
            characteristic(
                PROTOCOL_MODE_UUID,
                &["read", "write-without-response"],
                vec![0x01],
            ),
            keyboard_report,
            mouse_report,
            characteristic(
                BOOT_KEYBOARD_INPUT_UUID,
                &["read", "notify"],
                vec![0; 8],
            ),
            characteristic(BOOT_MOUSE_INPUT_UUID, &["read", "notify"], vec![0; 3]),
        ],
    }
}

/// The companion Device Information service.
pub fn device_information_service(config: &HidConfig) -> ServiceDef {
    ServiceDef {
        uuid: DEVICE_INFO_SERVICE_UUID,
        primary: true,
        characteristics: vec![
            characteristic(
                MANUFACTURER_NAME_UUID,
                &["read"],
                config.device.manufacturer.as_bytes().to_vec(),
            ),
            characteristic(PNP_ID_UUID, &["read"], pnp_id()),
        ],
    }
}

/// The complete application as handed to the GATT registrar.
pub fn application(config: &HidConfig) -> Vec<ServiceDef> {
    vec![hid_service(), device_information_service(config)]
}

/// The LE advertisement for the configured device.
pub fn advertisement(config: &HidConfig) -> AdvertisementDef {
    AdvertisementDef {
        advertisement_type: "peripheral",
        service_uuids: vec![HID_SERVICE_UUID, DEVICE_INFO_SERVICE_UUID],
        local_name: config.device.device_name.clone(),
        appearance: config.device.appearance,
        discoverable: true,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(service: &'a ServiceDef, uuid: &str) -> Vec<&'a CharacteristicDef> {
        service
            .characteristics
            .iter()
            .filter(|c| c.uuid == uuid)
            .collect()
    }

    #[test]
    fn test_hid_service_is_primary_with_eight_characteristics() {
        let service = hid_service();
        assert_eq!(service.uuid, HID_SERVICE_UUID);
        assert!(service.primary);
        assert_eq!(service.characteristics.len(), 8);
    }

    #[test]
    fn test_report_map_serves_the_report_descriptor() {
        let service = hid_service();
        let report_map = &find(&service, REPORT_MAP_UUID)[0];
        assert_eq!(report_map.initial_value, REPORT_DESCRIPTOR.to_vec());
        assert_eq!(report_map.flags, &["read"]);
    }

    #[test]
    fn test_hid_information_value() {
        let service = hid_service();
        let info = &find(&service, HID_INFORMATION_UUID)[0];
        assert_eq!(info.initial_value, vec![0x11, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn test_two_input_reports_with_report_references() {
        let service = hid_service();
        let reports = find(&service, REPORT_UUID);
        assert_eq!(reports.len(), 2);

        let references: Vec<&[u8]> = reports
            .iter()
            .map(|r| r.descriptors[0].value.as_slice())
            .collect();
        assert_eq!(references, vec![&[0x01, 0x01][..], &[0x02, 0x01][..]]);
        for report in reports {
            assert_eq!(report.flags, &["read", "notify"]);
            assert_eq!(report.descriptors[0].uuid, REPORT_REFERENCE_UUID);
        }
    }

    #[test]
    fn test_protocol_mode_defaults_to_report() {
        let service = hid_service();
        let mode = &find(&service, PROTOCOL_MODE_UUID)[0];
        assert_eq!(mode.initial_value, vec![0x01]);
        assert_eq!(mode.flags, &["read", "write-without-response"]);
    }

    #[test]
    fn test_control_point_is_write_without_response() {
        let service = hid_service();
        let control_point = &find(&service, HID_CONTROL_POINT_UUID)[0];
        assert_eq!(control_point.flags, &["write-without-response"]);
    }

    #[test]
    fn test_boot_characteristics_have_boot_frame_sizes() {
        let service = hid_service();
        assert_eq!(
            find(&service, BOOT_KEYBOARD_INPUT_UUID)[0].initial_value.len(),
            8
        );
        assert_eq!(
            find(&service, BOOT_MOUSE_INPUT_UUID)[0].initial_value.len(),
            3
        );
    }

    #[test]
    fn test_device_information_service_values() {
        let config = HidConfig::default();
        let service = device_information_service(&config);
        assert_eq!(service.uuid, DEVICE_INFO_SERVICE_UUID);
        let manufacturer = &find(&service, MANUFACTURER_NAME_UUID)[0];
        assert_eq!(manufacturer.initial_value, b"JadeAI".to_vec());
        let pnp = &find(&service, PNP_ID_UUID)[0];
        assert_eq!(
            pnp.initial_value,
            vec![0x02, 0xD4, 0x04, 0x34, 0x12, 0x01, 0x00]
        );
    }

    #[test]
    fn test_advertisement_exposes_both_services_and_identity() {
        let mut config = HidConfig::default();
        config.device.device_name = "Bench HID".to_string();
        config.device.appearance = 962;

        let advertisement = advertisement(&config);

        assert_eq!(advertisement.advertisement_type, "peripheral");
        assert_eq!(
            advertisement.service_uuids,
            vec![HID_SERVICE_UUID, DEVICE_INFO_SERVICE_UUID]
        );
        assert_eq!(advertisement.local_name, "Bench HID");
        assert_eq!(advertisement.appearance, 962);
        assert!(advertisement.discoverable);
    }
}
