//! OS-facing pieces of the classic daemon: L2CAP sockets, the SDP service
//! record, and the UNIX command socket.

pub mod command_socket;
pub mod l2cap;
pub mod sdp;
