//! L2CAP SOCK_SEQPACKET transport for the HID channel pair.
//!
//! The HID profile reserves two fixed PSMs: 0x11 for the control channel
//! and 0x13 for the interrupt channel. Both listeners request encryption,
//! authentication, and the master role via the L2CAP link-mode socket
//! option; a kernel that refuses the option still accepts connections, so
//! that failure is only logged.
//!
//! `libc` is used directly because the standard library has no cover for
//! `AF_BLUETOOTH` sockets; `sockaddr_l2` is declared locally for the same
//! reason.

use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use bthid_core::transport::{Channel, ChannelEndpoint, TransportPair};

/// PSM of the HID control channel.
pub const PSM_HID_CONTROL: u16 = 0x0011;

/// PSM of the HID interrupt channel.
pub const PSM_HID_INTERRUPT: u16 = 0x0013;

const BTPROTO_L2CAP: libc::c_int = 0;
const SOL_L2CAP: libc::c_int = 6;
const L2CAP_LM: libc::c_int = 0x03;
const L2CAP_LM_MASTER: libc::c_int = 0x0001;
const L2CAP_LM_AUTH: libc::c_int = 0x0002;
const L2CAP_LM_ENCRYPT: libc::c_int = 0x0004;

/// `struct sockaddr_l2` from `<bluetooth/l2cap.h>`; not exported by libc.
#[repr(C)]
#[derive(Clone, Copy)]
struct SockaddrL2 {
    l2_family: libc::sa_family_t,
    l2_psm: u16,
    l2_bdaddr: [u8; 6],
    l2_cid: u16,
    l2_bdaddr_type: u8,
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Transport setup failure; fatal for the session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to create L2CAP socket for PSM {psm:#06x}: {source}")]
    Socket { psm: u16, source: io::Error },

    #[error("failed to bind L2CAP socket to PSM {psm:#06x}: {source}")]
    Bind { psm: u16, source: io::Error },

    #[error("failed to listen on L2CAP PSM {psm:#06x}: {source}")]
    Listen { psm: u16, source: io::Error },
}

// ── Listener ──────────────────────────────────────────────────────────────────

/// One listening L2CAP endpoint bound to `BDADDR_ANY`.
pub struct L2capListener {
    fd: RawFd,
}

impl L2capListener {
    pub fn bind(psm: u16) -> Result<Self, TransportError> {
        let fd = unsafe { libc::socket(libc::AF_BLUETOOTH, libc::SOCK_SEQPACKET, BTPROTO_L2CAP) };
        if fd < 0 {
            return Err(TransportError::Socket {
                psm,
                source: io::Error::last_os_error(),
            });
        }
        let listener = Self { fd };

        let addr = SockaddrL2 {
            l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            l2_psm: psm.to_le(),
            l2_bdaddr: [0; 6], // BDADDR_ANY
            l2_cid: 0,
            l2_bdaddr_type: 0,
        };
        let rc = unsafe {
            libc::bind(
                listener.fd,
                &addr as *const SockaddrL2 as *const libc::sockaddr,
                mem::size_of::<SockaddrL2>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(TransportError::Bind {
                psm,
                source: io::Error::last_os_error(),
            });
        }

        let link_mode: libc::c_int = L2CAP_LM_ENCRYPT | L2CAP_LM_AUTH | L2CAP_LM_MASTER;
        let rc = unsafe {
            libc::setsockopt(
                listener.fd,
                SOL_L2CAP,
                L2CAP_LM,
                &link_mode as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            warn!(
                psm = format_args!("{psm:#06x}"),
                "unable to set link mode on L2CAP socket: {}",
                io::Error::last_os_error()
            );
        }

        let rc = unsafe { libc::listen(listener.fd, 1) };
        if rc < 0 {
            return Err(TransportError::Listen {
                psm,
                source: io::Error::last_os_error(),
            });
        }
        Ok(listener)
    }

    fn accept(&self) -> io::Result<L2capStream> {
        let fd = unsafe { libc::accept(self.fd, std::ptr::null_mut(), std::ptr::null_mut()) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(L2capStream { fd })
    }

    fn close(&mut self) {
        if self.fd >= 0 {
            unsafe { libc::close(self.fd) };
            self.fd = -1;
        }
    }
}

impl Drop for L2capListener {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Stream ────────────────────────────────────────────────────────────────────

/// One accepted peer. Shared between the control thread and the emitter;
/// the fd is closed when the last handle is dropped.
pub struct L2capStream {
    fd: RawFd,
}

impl ChannelEndpoint for L2capStream {
    fn send(&self, bytes: &[u8]) -> io::Result<()> {
        let written = unsafe {
            libc::send(
                self.fd,
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
                libc::MSG_NOSIGNAL,
            )
        };
        if written < 0 {
            return Err(io::Error::last_os_error());
        }
        if (written as usize) != bytes.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write on L2CAP channel",
            ));
        }
        Ok(())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let received =
            unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
        if received < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(received as usize)
    }

    fn shutdown(&self) {
        unsafe { libc::shutdown(self.fd, libc::SHUT_RDWR) };
    }
}

impl Drop for L2capStream {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd) };
    }
}

// ── Transport pair ────────────────────────────────────────────────────────────

/// The control + interrupt listener pair handed to the HID server.
pub struct L2capTransport {
    control: L2capListener,
    interrupt: L2capListener,
}

impl L2capTransport {
    /// Binds both HID PSMs.
    pub fn bind() -> Result<Self, TransportError> {
        Ok(Self {
            control: L2capListener::bind(PSM_HID_CONTROL)?,
            interrupt: L2capListener::bind(PSM_HID_INTERRUPT)?,
        })
    }
}

impl TransportPair for L2capTransport {
    type Endpoint = L2capStream;

    fn poll_accept(
        &mut self,
        timeout: Duration,
    ) -> io::Result<Option<(Channel, L2capStream)>> {
        let mut fds = [
            libc::pollfd {
                fd: self.control.fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.interrupt.fd,
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        let rc = unsafe { libc::poll(fds.as_mut_ptr(), 2, timeout.as_millis() as libc::c_int) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(None);
        }

        if fds[0].revents & libc::POLLIN != 0 {
            return Ok(Some((Channel::Control, self.control.accept()?)));
        }
        if fds[1].revents & libc::POLLIN != 0 {
            return Ok(Some((Channel::Interrupt, self.interrupt.accept()?)));
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.control.close();
        self.interrupt.close();
    }
}
