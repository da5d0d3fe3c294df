//! `BleHidService`: configuration-aware facade over the core input engine.
//!
//! High-level operations serialize on one lock so concurrent HTTP requests
//! cannot interleave their report sequences. The keyboard/mouse enable
//! flags from the configuration gate each operation; pacing comes from the
//! safety block (the keypress delay applies after the press *and* after
//! the release in this variant).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use bthid_core::engine::{InputEngine, SafetyLimits};
use bthid_core::report::MouseButton;
use bthid_core::server::SendError;

use crate::domain::config::HidConfig;
use crate::domain::gatt::{self, AdvertisementDef, ServiceDef};
use crate::infrastructure::notify::NotifyHub;

/// Why a high-level operation was refused.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("keyboard input is disabled in configuration")]
    KeyboardDisabled,

    #[error("mouse input is disabled in configuration")]
    MouseDisabled,

    #[error("unsupported mouse button: {0}")]
    UnknownButton(String),

    #[error(transparent)]
    Send(#[from] SendError),
}

pub struct BleHidService {
    config: HidConfig,
    hub: Arc<NotifyHub>,
    engine: InputEngine<Arc<NotifyHub>>,
    running: AtomicBool,
    /// One high-level operation at a time.
    op_lock: Mutex<()>,
}

impl BleHidService {
    pub fn new(config: HidConfig) -> Self {
        let hub = Arc::new(NotifyHub::new());
        let keypress_delay = Duration::from_millis(u64::from(config.safety.keypress_delay_ms));
        let mouse_move_delay = Duration::from_millis(u64::from(config.safety.mouse_move_delay_ms));
        let limits = SafetyLimits {
            post_press_delay: keypress_delay,
            post_release_delay: keypress_delay,
            click_hold: mouse_move_delay,
            mouse_move_delay,
            mouse_step_limit: config.safety.mouse_step_limit.min(127) as i32,
        };
        let engine = InputEngine::new(Arc::clone(&hub), limits);
        Self {
            config,
            hub,
            engine,
            running: AtomicBool::new(false),
            op_lock: Mutex::new(()),
        }
    }

    /// Marks the service live once the hosting process has registered the
    /// GATT application.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            device = %self.config.device.device_name,
            adapter = %self.config.device.adapter_path(),
            "BLE HID service started"
        );
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &HidConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<NotifyHub> {
        &self.hub
    }

    /// The GATT application the registrar publishes for this service.
    pub fn gatt_application(&self) -> Vec<ServiceDef> {
        gatt::application(&self.config)
    }

    /// The LE advertisement for this service.
    pub fn advertisement(&self) -> AdvertisementDef {
        gatt::advertisement(&self.config)
    }

    /// Types `text`; carriage returns are dropped (newlines carry the line
    /// break).
    pub fn send_text(&self, text: &str) -> Result<(), ServiceError> {
        if !self.config.keyboard.enabled {
            return Err(ServiceError::KeyboardDisabled);
        }
        let _op = self.op_lock.lock().unwrap();
        let filtered: String = text.chars().filter(|&ch| ch != '\r').collect();
        self.engine.type_text(&filtered)?;
        Ok(())
    }

    /// Walks the pointer to the absolute position `(x, y)`.
    pub fn move_pointer(&self, x: i32, y: i32) -> Result<(), ServiceError> {
        if !self.config.mouse.enabled {
            return Err(ServiceError::MouseDisabled);
        }
        let _op = self.op_lock.lock().unwrap();
        self.engine.move_to(x, y)?;
        Ok(())
    }

    /// Moves to `(x, y)` and clicks `button`.
    pub fn click(&self, x: i32, y: i32, button: MouseButton) -> Result<(), ServiceError> {
        if !self.config.mouse.enabled {
            return Err(ServiceError::MouseDisabled);
        }
        let _op = self.op_lock.lock().unwrap();
        self.engine.click_at(x, y, button)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
