//! # bthid-daemon
//!
//! The classic Bluetooth (BR/EDR) variant of the JadeAI HID peripheral.
//!
//! The daemon serves the HID profile over two L2CAP SOCK_SEQPACKET channels
//! (control on PSM 0x11, interrupt on PSM 0x13) and is driven through a
//! line-delimited UNIX command socket. The same binary doubles as the
//! client: subcommands forward one command to a running daemon and map the
//! reply to the exit code.
//!
//! - `application` – command parsing/execution and the service facade over
//!   the core engine.
//! - `infrastructure` – the L2CAP transport, the SDP service record, and
//!   the UNIX command socket.

pub mod application;
pub mod infrastructure;
