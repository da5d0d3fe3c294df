//! The channel-pair seam between the profile engine and a concrete transport.
//!
//! A Bluetooth HID session always runs over two channels: a *control*
//! channel carrying HIDP request/response traffic and an *interrupt*
//! channel carrying input reports. The classic variant backs these with
//! L2CAP SOCK_SEQPACKET sockets (PSMs 0x11 and 0x13); the BLE variant backs
//! them with GATT characteristic writes and notifications. Everything above
//! this seam is transport-agnostic.

use std::io;
use std::time::Duration;

/// Which of the two HID channels a peer attached on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Control,
    Interrupt,
}

/// One attached peer endpoint.
///
/// Endpoints are shared between the control thread and the interrupt
/// emitter, so all operations take `&self`. `shutdown` must unblock any
/// thread currently parked in [`ChannelEndpoint::recv`] (a subsequent recv
/// returns `Ok(0)` or an error); dropping the last handle releases the
/// underlying resource.
pub trait ChannelEndpoint: Send + Sync + 'static {
    /// Writes one complete framed message.
    fn send(&self, bytes: &[u8]) -> io::Result<()>;

    /// Blocking read of the next message. `Ok(0)` signals peer closure.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Closes both directions, unblocking any in-flight recv.
    fn shutdown(&self);
}

/// A pair of listening endpoints handed to the engine by the hosting
/// process once the device is advertised.
pub trait TransportPair: Send + 'static {
    type Endpoint: ChannelEndpoint;

    /// Waits up to `timeout` for an inbound peer on either channel.
    ///
    /// Returns `Ok(None)` when the quantum elapses with no peer. The accept
    /// thread calls this in a loop with a 500 ms quantum so shutdown is
    /// observed promptly.
    fn poll_accept(&mut self, timeout: Duration) -> io::Result<Option<(Channel, Self::Endpoint)>>;

    /// Closes both listening endpoints.
    fn close(&mut self);
}
