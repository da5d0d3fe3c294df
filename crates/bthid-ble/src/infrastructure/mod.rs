//! Infrastructure of the BLE variant: the notification hub backing the
//! GATT characteristics and the HTTP control API.

pub mod http;
pub mod notify;
