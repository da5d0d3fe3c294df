//! Connection state shared by the accept loop, the control-channel reader,
//! the interrupt emitter, and status queries.
//!
//! The state machine:
//!
//! ```text
//!           accept(control)                 accept(interrupt), both present
//!   Idle ───────────────────▶ HalfAttached ───────────────────▶ Connected
//!    ▲                            │                                 │
//!    └──────────── reset ─────────┴── VCU received / peer drops ────┘
//! ```
//!
//! Either channel may attach first. Entering *Connected* resets the
//! protocol mode to report and clears the LED byte; `reset` is idempotent
//! and closes whatever peers are attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::report::ProtocolMode;
use crate::transport::{Channel, ChannelEndpoint};

// ── Connection state ──────────────────────────────────────────────────────────

/// Where the session stands in the two-channel attach cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No peer on either channel.
    Idle,
    /// Exactly one channel has an accepted peer (transient).
    HalfAttached,
    /// Both channels attached; reports may flow.
    Connected,
}

// ── Link state record ─────────────────────────────────────────────────────────

/// The mutable session record guarded by [`SharedLink`]'s mutex.
///
/// Peer endpoints are stored as `Arc` so the emitter can snapshot the
/// interrupt endpoint under the lock and perform the blocking write with
/// the lock released.
#[derive(Debug)]
pub struct LinkState<E> {
    control: Option<Arc<E>>,
    interrupt: Option<Arc<E>>,
    protocol_mode: ProtocolMode,
    led_status: u8,
}

impl<E> Default for LinkState<E> {
    fn default() -> Self {
        Self {
            control: None,
            interrupt: None,
            protocol_mode: ProtocolMode::Report,
            led_status: 0,
        }
    }
}

impl<E: ChannelEndpoint> LinkState<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_state(&self) -> ConnectionState {
        match (&self.control, &self.interrupt) {
            (None, None) => ConnectionState::Idle,
            (Some(_), Some(_)) => ConnectionState::Connected,
            _ => ConnectionState::HalfAttached,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Installs a peer on `channel`, replacing (and closing) any previous
    /// peer on that channel. Returns `true` when this attach completed the
    /// pair and the session entered *Connected*.
    pub fn attach(&mut self, channel: Channel, endpoint: E) -> bool {
        let was_connected = self.is_connected();
        let slot = match channel {
            Channel::Control => &mut self.control,
            Channel::Interrupt => &mut self.interrupt,
        };
        if let Some(old) = slot.take() {
            old.shutdown();
        }
        *slot = Some(Arc::new(endpoint));

        let now_connected = self.is_connected();
        if now_connected && !was_connected {
            // Entering Connected: report mode, LEDs dark.
            self.protocol_mode = ProtocolMode::Report;
            self.led_status = 0;
        }
        now_connected && !was_connected
    }

    /// Closes both peers and restores the idle defaults. Idempotent.
    pub fn reset(&mut self) {
        if let Some(control) = self.control.take() {
            control.shutdown();
        }
        if let Some(interrupt) = self.interrupt.take() {
            interrupt.shutdown();
        }
        self.protocol_mode = ProtocolMode::Report;
        self.led_status = 0;
    }

    pub fn control_endpoint(&self) -> Option<Arc<E>> {
        self.control.clone()
    }

    pub fn interrupt_endpoint(&self) -> Option<Arc<E>> {
        self.interrupt.clone()
    }

    pub fn protocol_mode(&self) -> ProtocolMode {
        self.protocol_mode
    }

    pub fn set_protocol_mode(&mut self, mode: ProtocolMode) {
        self.protocol_mode = mode;
    }

    pub fn led_status(&self) -> u8 {
        self.led_status
    }

    pub fn set_led_status(&mut self, value: u8) {
        self.led_status = value;
    }
}

// ── Shared form ───────────────────────────────────────────────────────────────

/// [`LinkState`] behind a mutex, with the condition variable senders wait on
/// for *Connected* and the engine-wide running flag.
///
/// Every state change that could satisfy a waiter (attach, reset, shutdown)
/// broadcasts the condvar.
pub struct SharedLink<E> {
    state: Mutex<LinkState<E>>,
    connected_cv: Condvar,
    running: AtomicBool,
}

impl<E: ChannelEndpoint> SharedLink<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LinkState::new()),
            connected_cv: Condvar::new(),
            running: AtomicBool::new(true),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the running flag, drops both peers, and wakes every waiter so
    /// blocked sends return `NotConnected` and worker threads exit.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut state = self.lock();
        state.reset();
        self.connected_cv.notify_all();
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_connected()
    }

    pub fn current_protocol(&self) -> ProtocolMode {
        self.lock().protocol_mode()
    }

    pub fn led_state(&self) -> u8 {
        self.lock().led_status()
    }

    /// Installs a peer and broadcasts the change.
    pub fn attach(&self, channel: Channel, endpoint: E) -> bool {
        let became_connected = self.lock().attach(channel, endpoint);
        self.connected_cv.notify_all();
        became_connected
    }

    /// Drops both peers, restores defaults, and broadcasts the change.
    pub fn reset(&self) {
        self.lock().reset();
        self.connected_cv.notify_all();
    }

    /// Operator-requested disconnect; identical to a protocol reset.
    pub fn force_disconnect(&self) {
        self.reset();
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, LinkState<E>> {
        self.state.lock().unwrap()
    }

    pub(crate) fn condvar(&self) -> &Condvar {
        &self.connected_cv
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;

    /// Endpoint stub counting shutdown calls.
    #[derive(Default)]
    struct StubEndpoint {
        shutdowns: Arc<AtomicUsize>,
    }

    impl ChannelEndpoint for StubEndpoint {
        fn send(&self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn recv(&self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stub() -> StubEndpoint {
        StubEndpoint::default()
    }

    #[test]
    fn test_new_link_is_idle_with_report_mode() {
        let state: LinkState<StubEndpoint> = LinkState::new();
        assert_eq!(state.connection_state(), ConnectionState::Idle);
        assert_eq!(state.protocol_mode(), ProtocolMode::Report);
        assert_eq!(state.led_status(), 0);
    }

    #[test]
    fn test_single_attach_is_half_attached_either_order() {
        let mut control_first: LinkState<StubEndpoint> = LinkState::new();
        assert!(!control_first.attach(Channel::Control, stub()));
        assert_eq!(control_first.connection_state(), ConnectionState::HalfAttached);

        let mut interrupt_first: LinkState<StubEndpoint> = LinkState::new();
        assert!(!interrupt_first.attach(Channel::Interrupt, stub()));
        assert_eq!(interrupt_first.connection_state(), ConnectionState::HalfAttached);
    }

    #[test]
    fn test_both_attached_is_connected_either_order() {
        let mut state: LinkState<StubEndpoint> = LinkState::new();
        state.attach(Channel::Control, stub());
        assert!(state.attach(Channel::Interrupt, stub()));
        assert_eq!(state.connection_state(), ConnectionState::Connected);

        let mut reversed: LinkState<StubEndpoint> = LinkState::new();
        reversed.attach(Channel::Interrupt, stub());
        assert!(reversed.attach(Channel::Control, stub()));
        assert_eq!(reversed.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_entering_connected_resets_protocol_and_leds() {
        // Arrange: a half-attached session with stale mode and LED state.
        let mut state: LinkState<StubEndpoint> = LinkState::new();
        state.attach(Channel::Control, stub());
        state.set_protocol_mode(ProtocolMode::Boot);
        state.set_led_status(0x1F);

        // Act
        state.attach(Channel::Interrupt, stub());

        // Assert
        assert_eq!(state.protocol_mode(), ProtocolMode::Report);
        assert_eq!(state.led_status(), 0);
    }

    #[test]
    fn test_reattach_while_connected_does_not_re_reset_mode() {
        let mut state: LinkState<StubEndpoint> = LinkState::new();
        state.attach(Channel::Control, stub());
        state.attach(Channel::Interrupt, stub());
        state.set_protocol_mode(ProtocolMode::Boot);

        // Replacing one peer of an already-connected pair is not a fresh
        // Idle -> Connected transition.
        let became_connected = state.attach(Channel::Interrupt, stub());
        assert!(!became_connected);
        assert_eq!(state.protocol_mode(), ProtocolMode::Boot);
    }

    #[test]
    fn test_attach_closes_replaced_peer() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let first = StubEndpoint {
            shutdowns: Arc::clone(&shutdowns),
        };

        let mut state: LinkState<StubEndpoint> = LinkState::new();
        state.attach(Channel::Control, first);
        state.attach(Channel::Control, stub());

        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_closes_both_peers_and_restores_defaults() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let mut state: LinkState<StubEndpoint> = LinkState::new();
        state.attach(
            Channel::Control,
            StubEndpoint {
                shutdowns: Arc::clone(&shutdowns),
            },
        );
        state.attach(
            Channel::Interrupt,
            StubEndpoint {
                shutdowns: Arc::clone(&shutdowns),
            },
        );
        state.set_protocol_mode(ProtocolMode::Boot);
        state.set_led_status(0x02);

        state.reset();

        assert_eq!(state.connection_state(), ConnectionState::Idle);
        assert_eq!(state.protocol_mode(), ProtocolMode::Report);
        assert_eq!(state.led_status(), 0);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut state: LinkState<StubEndpoint> = LinkState::new();
        state.attach(Channel::Control, stub());
        state.reset();
        state.reset();
        assert_eq!(state.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn test_shared_link_shutdown_clears_running_and_disconnects() {
        let link: Arc<SharedLink<StubEndpoint>> = SharedLink::new();
        link.attach(Channel::Control, stub());
        link.attach(Channel::Interrupt, stub());
        assert!(link.is_running());
        assert!(link.is_connected());

        link.shutdown();

        assert!(!link.is_running());
        assert!(!link.is_connected());
    }

    #[test]
    fn test_shared_link_attach_reports_connected_transition_once() {
        let link: Arc<SharedLink<StubEndpoint>> = SharedLink::new();
        assert!(!link.attach(Channel::Control, stub()));
        assert!(link.attach(Channel::Interrupt, stub()));
        assert!(!link.attach(Channel::Interrupt, stub()));
    }

    #[test]
    fn test_force_disconnect_returns_to_idle() {
        let link: Arc<SharedLink<StubEndpoint>> = SharedLink::new();
        link.attach(Channel::Control, stub());
        link.attach(Channel::Interrupt, stub());

        link.force_disconnect();

        assert!(!link.is_connected());
        assert!(link.is_running(), "disconnect must not stop the engine");
    }
}
