//! Application layer: the command-line protocol executor and the service
//! facade that binds it to the HID engine.

pub mod commands;
pub mod service;
