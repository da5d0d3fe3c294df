//! The service facade the command executor drives.
//!
//! Bundles the running [`HidServer`] with an [`InputEngine`] over it and
//! exposes both through the [`HidControl`] seam.

use std::sync::Arc;

use bthid_core::engine::{InputEngine, SafetyLimits};
use bthid_core::server::{HidServer, SendError, StatusSnapshot};
use bthid_core::transport::TransportPair;

use super::commands::HidControl;

pub struct HidService<T: TransportPair> {
    server: Arc<HidServer<T>>,
    engine: InputEngine<Arc<HidServer<T>>>,
}

impl<T: TransportPair> HidService<T> {
    pub fn new(server: Arc<HidServer<T>>, limits: SafetyLimits) -> Self {
        let engine = InputEngine::new(Arc::clone(&server), limits);
        Self { server, engine }
    }
}

impl<T: TransportPair> HidControl for HidService<T> {
    fn type_text(&self, text: &str) -> Result<(), SendError> {
        self.engine.type_text(text)
    }

    fn move_mouse(&self, dx: i32, dy: i32, wheel: i32) -> Result<(), SendError> {
        self.engine.move_mouse(dx, dy, wheel)
    }

    fn click(&self, mask: u8) -> Result<(), SendError> {
        self.engine.click(mask)
    }

    fn status(&self) -> StatusSnapshot {
        self.server.status()
    }

    fn disconnect(&self) {
        self.server.force_disconnect();
    }
}
