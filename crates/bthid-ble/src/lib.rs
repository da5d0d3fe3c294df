//! # bthid-ble
//!
//! The Bluetooth Low Energy variant of the JadeAI HID peripheral.
//!
//! Instead of L2CAP channels, a BLE HID device serves the same report model
//! through GATT: the report descriptor becomes the Report Map
//! characteristic and input reports become notifications on the Report
//! characteristics. This crate contains:
//!
//! - `domain` – YAML configuration (with `${NAME:default}` env tokens) and
//!   the declarative GATT layout the BlueZ registrar publishes.
//! - `application` – the `BleHidService` facade: enable flags, operation
//!   serialization, and the absolute pointer semantics of this variant.
//! - `infrastructure` – the notification hub backing the GATT
//!   characteristics and the axum HTTP API that drives the service.
//!
//! GATT registration and advertising are performed by the hosting system
//! against the layout in [`domain::gatt`]; the engine itself is
//! transport-agnostic and lives in `bthid-core`.

pub mod application;
pub mod domain;
pub mod infrastructure;
