//! The concurrent HID session: accept loop, control-channel reader, and the
//! serialized interrupt emitter.
//!
//! # Threading model
//!
//! Three kinds of threads cooperate around one mutex-protected
//! [`LinkState`](crate::link::LinkState):
//!
//! - The **accept thread** polls the transport's two listeners with a
//!   500 ms quantum and installs accepted peers into the link. It spawns
//!   the control thread the first time a control peer arrives.
//! - The **control thread** performs blocking reads on the control peer,
//!   dispatches each message through
//!   [`protocol::handle_control_message`](crate::protocol::handle_control_message),
//!   writes the reply, and applies any reset. It outlives individual peers:
//!   after a peer closes it resets the session and waits for the next one.
//! - **Caller threads** send reports through the emitter. Sends serialize
//!   on the emitter lock; the state lock is held only long enough to wait
//!   for *Connected*, read the protocol mode, and snapshot the interrupt
//!   endpoint, so a blocking write never delays a control-thread reset.
//!
//! Shutdown clears the running flag, closes all endpoints, broadcasts the
//! condition variable, and joins both worker threads.

use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::engine::ReportSink;
use crate::link::SharedLink;
use crate::protocol::{self, ControlAction};
use crate::report::{encode_keyboard, encode_mouse, KeyboardReport, MouseReport, ProtocolMode};
use crate::transport::{Channel, ChannelEndpoint, TransportPair};

/// How long the accept thread blocks in one poll before re-checking the
/// running flag.
const ACCEPT_POLL_QUANTUM: Duration = Duration::from_millis(500);

/// Largest control message we expect from a host.
const CONTROL_BUF_LEN: usize = 128;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a report could not be delivered.
#[derive(Debug, Error)]
pub enum SendError {
    /// No host attached within the emitter's wait window, or the engine is
    /// shutting down.
    #[error("no host connected")]
    NotConnected,

    /// The interrupt-channel write failed; the session has been reset and
    /// the next send will wait for a host again.
    #[error("interrupt channel write failed: {0}")]
    Transport(#[source] io::Error),
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Tunables for the interrupt emitter.
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// How long a send waits for a host before giving up with
    /// [`SendError::NotConnected`].
    pub connect_timeout: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time view of the session for status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub connected: bool,
    pub protocol: ProtocolMode,
    pub led_state: u8,
}

// ── Server ────────────────────────────────────────────────────────────────────

/// One running HID session over a [`TransportPair`].
pub struct HidServer<T: TransportPair> {
    link: Arc<SharedLink<T::Endpoint>>,
    config: EmitterConfig,
    /// Serializes interrupt-channel writes: at most one report in flight.
    send_lock: Mutex<()>,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
    control_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<T: TransportPair> HidServer<T> {
    /// Takes ownership of an advertised transport pair and starts serving.
    pub fn start(transport: T, config: EmitterConfig) -> Self {
        let link = SharedLink::new();
        let control_handle = Arc::new(Mutex::new(None));

        let accept_link = Arc::clone(&link);
        let accept_control_handle = Arc::clone(&control_handle);
        let accept_handle =
            thread::spawn(move || accept_loop(transport, accept_link, accept_control_handle));

        Self {
            link,
            config,
            send_lock: Mutex::new(()),
            accept_handle: Mutex::new(Some(accept_handle)),
            control_handle,
        }
    }

    /// Stops the session: closes listeners and peers, wakes blocked senders,
    /// and joins the worker threads. Idempotent.
    pub fn stop(&self) {
        self.link.shutdown();
        let accept = self.accept_handle.lock().unwrap().take();
        if let Some(handle) = accept {
            let _ = handle.join();
        }
        let control = self.control_handle.lock().unwrap().take();
        if let Some(handle) = control {
            let _ = handle.join();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn current_protocol(&self) -> ProtocolMode {
        self.link.current_protocol()
    }

    pub fn led_state(&self) -> u8 {
        self.link.led_state()
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            connected: self.link.is_connected(),
            protocol: self.link.current_protocol(),
            led_state: self.link.led_state(),
        }
    }

    /// Drops the current host, if any. The session returns to idle and
    /// accepts the next pair of connections.
    pub fn force_disconnect(&self) {
        self.link.force_disconnect();
    }

    /// Frames and sends one keyboard report under the current protocol mode.
    pub fn send_keyboard_report(&self, report: &KeyboardReport) -> Result<(), SendError> {
        self.send_framed(|mode| encode_keyboard(report, mode))
    }

    /// Frames and sends one mouse report under the current protocol mode.
    pub fn send_mouse_report(&self, report: &MouseReport) -> Result<(), SendError> {
        self.send_framed(|mode| encode_mouse(report, mode))
    }

    /// The emitter: waits (bounded) for a connected host, snapshots the
    /// interrupt endpoint under the state lock, then writes with the state
    /// lock released. A failed write resets the session.
    fn send_framed(&self, frame: impl FnOnce(ProtocolMode) -> Vec<u8>) -> Result<(), SendError> {
        let _in_flight = self.send_lock.lock().unwrap();

        let (bytes, endpoint) = {
            let mut state = self.link.lock();
            if !state.is_connected() {
                let (guard, wait) = self
                    .link
                    .condvar()
                    .wait_timeout_while(state, self.config.connect_timeout, |s| {
                        self.link.is_running() && !s.is_connected()
                    })
                    .unwrap();
                state = guard;
                if wait.timed_out() && !state.is_connected() {
                    warn!("timed out waiting for a host to connect");
                    return Err(SendError::NotConnected);
                }
            }
            if !self.link.is_running() {
                return Err(SendError::NotConnected);
            }
            let endpoint = state.interrupt_endpoint().ok_or(SendError::NotConnected)?;
            (frame(state.protocol_mode()), endpoint)
        };

        match endpoint.send(&bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("failed to send interrupt report: {e}");
                self.link.reset();
                Err(SendError::Transport(e))
            }
        }
    }
}

impl<T: TransportPair> ReportSink for HidServer<T> {
    fn send_keyboard(&self, report: &KeyboardReport) -> Result<(), SendError> {
        self.send_keyboard_report(report)
    }

    fn send_mouse(&self, report: &MouseReport) -> Result<(), SendError> {
        self.send_mouse_report(report)
    }
}

impl<T: TransportPair> Drop for HidServer<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Accept thread ─────────────────────────────────────────────────────────────

fn accept_loop<T: TransportPair>(
    mut transport: T,
    link: Arc<SharedLink<T::Endpoint>>,
    control_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
) {
    while link.is_running() {
        match transport.poll_accept(ACCEPT_POLL_QUANTUM) {
            Ok(Some((Channel::Control, endpoint))) => {
                info!("control channel peer attached");
                link.attach(Channel::Control, endpoint);
                let mut handle = control_handle.lock().unwrap();
                if handle.is_none() {
                    let control_link = Arc::clone(&link);
                    *handle = Some(thread::spawn(move || control_loop(control_link)));
                }
            }
            Ok(Some((Channel::Interrupt, endpoint))) => {
                info!("interrupt channel peer attached");
                if link.attach(Channel::Interrupt, endpoint) {
                    info!("host connected");
                }
            }
            Ok(None) => {}
            Err(e) => {
                if link.is_running() {
                    warn!("accept poll failed: {e}");
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }
    transport.close();
    debug!("accept thread exiting");
}

// ── Control thread ────────────────────────────────────────────────────────────

/// Serves successive control peers until shutdown.
fn control_loop<E: ChannelEndpoint>(link: Arc<SharedLink<E>>) {
    let mut buf = [0u8; CONTROL_BUF_LEN];

    while link.is_running() {
        // Wait for a control peer to be attached.
        let endpoint = {
            let mut state = link.lock();
            loop {
                if !link.is_running() {
                    return;
                }
                if let Some(endpoint) = state.control_endpoint() {
                    break endpoint;
                }
                state = link.condvar().wait(state).unwrap();
            }
        };

        // Blocking read loop for this peer. A zero-length receive (or any
        // receive error) means the peer went away.
        loop {
            let received = match endpoint.recv(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    if link.is_running() {
                        debug!("control channel receive failed: {e}");
                    }
                    0
                }
            };
            if received == 0 {
                break;
            }

            let outcome = {
                let mut state = link.lock();
                let mut mode = state.protocol_mode();
                let mut led = state.led_status();
                let outcome = protocol::handle_control_message(&buf[..received], &mut mode, &mut led);
                state.set_protocol_mode(mode);
                state.set_led_status(led);
                outcome
            };

            // The reply goes out before any reset takes effect.
            if let Some(reply) = outcome.reply {
                if let Err(e) = endpoint.send(&reply) {
                    warn!("failed to send control response: {e}");
                    break;
                }
            }
            if outcome.action == ControlAction::Reset {
                info!("virtual cable unplug received, resetting session");
                break;
            }
        }

        link.reset();
    }
    debug!("control thread exiting");
}
