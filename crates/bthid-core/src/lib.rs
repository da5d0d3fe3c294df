//! # bthid-core
//!
//! Transport-agnostic engine for presenting a Linux host as a Bluetooth HID
//! combo device (keyboard + pointer).
//!
//! This crate contains everything two transports (classic L2CAP and BLE GATT
//! notifications) have in common:
//!
//! - **`report`** – The HID report model: fixed report descriptor bytes,
//!   keyboard/mouse report structs, and boot/report-mode framing.
//!
//! - **`keymap`** – The character table translating US-ASCII characters to
//!   USB HID usage codes plus the shift modifier.
//!
//! - **`link`** – Connection state shared between the accept loop, the
//!   control-channel reader, and report senders: which peers are attached,
//!   the negotiated protocol mode, and the host-written LED byte.
//!
//! - **`protocol`** – The HIDP control-channel state machine: parses inbound
//!   control messages and produces handshake replies and state mutations.
//!
//! - **`transport`** – The channel-pair seam. A transport supplies one
//!   control and one interrupt channel; the engine never touches sockets
//!   directly.
//!
//! - **`server`** – The concurrent session: accept thread, control thread,
//!   and the serialized interrupt emitter.
//!
//! - **`engine`** – High-level input intents (type text, move pointer,
//!   click) reduced to paced report sequences.
//!
//! The crate has no OS or socket dependencies; concrete transports live in
//! the `bthid-daemon` (L2CAP) and `bthid-ble` (GATT) crates.

pub mod engine;
pub mod keymap;
pub mod link;
pub mod protocol;
pub mod report;
pub mod server;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `bthid_core::KeyboardReport` instead of the full module path.
pub use engine::{InputEngine, ReportSink, SafetyLimits};
pub use keymap::{map_char, KeyInfo};
pub use link::{ConnectionState, LinkState, SharedLink};
pub use report::{
    encode_keyboard, encode_mouse, KeyboardReport, MouseButton, MouseReport, ProtocolMode,
};
pub use server::{EmitterConfig, HidServer, SendError, StatusSnapshot};
pub use transport::{Channel, ChannelEndpoint, TransportPair};
