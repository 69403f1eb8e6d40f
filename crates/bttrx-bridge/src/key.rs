//! Transmit-key controller.
//!
//! Drives the radio's key output and its indicator. Unkeying after a
//! button release is two-phase: [`KeyController::request_delayed_unkey`]
//! records when the release happened, and a later [`KeyController::tick`]
//! drops the key once the hang time has passed. The controller reads no
//! clock of its own; every time-dependent call takes `now`.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use bttrx_core::{Indicator, KeyOutput};

/// Snapshot of the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    /// Whether the key output is asserted.
    pub is_keyed: bool,
    /// When the key was asserted.
    pub keyed_at: Option<Instant>,
    /// When a delayed unkey was requested.
    pub unkey_requested_at: Option<Instant>,
    /// Hang time of the pending unkey request.
    pub unkey_delay: Duration,
}

/// Owns the key output and its indicator.
pub struct KeyController {
    output: Box<dyn KeyOutput>,
    indicator: Box<dyn Indicator>,
    state: KeyState,
}

impl KeyController {
    pub fn new(output: Box<dyn KeyOutput>, indicator: Box<dyn Indicator>) -> Self {
        KeyController {
            output,
            indicator,
            state: KeyState::default(),
        }
    }

    pub fn state(&self) -> KeyState {
        self.state
    }

    #[inline]
    pub fn is_keyed(&self) -> bool {
        self.state.is_keyed
    }

    #[inline]
    pub fn unkey_pending(&self) -> bool {
        self.state.unkey_requested_at.is_some()
    }

    /// Assert the key.
    ///
    /// Keying while already keyed only cancels a pending delayed unkey; the
    /// timeout keeps counting from the first assertion.
    pub fn key(&mut self, now: Instant) {
        self.state.unkey_requested_at = None;
        if self.state.is_keyed {
            return;
        }
        self.output.set_keyed(true);
        self.indicator.on();
        self.state.is_keyed = true;
        self.state.keyed_at = Some(now);
        debug!("key asserted");
    }

    /// Release the key immediately.
    pub fn unkey(&mut self) {
        self.state.unkey_requested_at = None;
        if !self.state.is_keyed {
            return;
        }
        self.output.set_keyed(false);
        self.indicator.off();
        self.state.is_keyed = false;
        self.state.keyed_at = None;
        debug!("key released");
    }

    /// Release the key once `delay` has passed since the first request.
    ///
    /// A zero delay unkeys at once. Repeated requests while one is pending
    /// keep the original request time.
    pub fn request_delayed_unkey(&mut self, delay: Duration, now: Instant) {
        if delay.is_zero() {
            self.unkey();
            return;
        }
        if !self.state.is_keyed || self.state.unkey_requested_at.is_some() {
            return;
        }
        self.state.unkey_requested_at = Some(now);
        self.state.unkey_delay = delay;
    }

    /// Key when unkeyed, otherwise request a delayed unkey.
    pub fn toggle(&mut self, delay: Duration, now: Instant) {
        if self.state.is_keyed {
            self.request_delayed_unkey(delay, now);
        } else {
            self.key(now);
        }
    }

    /// Perform a pending delayed unkey whose hang time has passed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(requested_at) = self.state.unkey_requested_at {
            if now.saturating_duration_since(requested_at) >= self.state.unkey_delay {
                self.unkey();
            }
        }
    }

    /// Force an unkey once the key has been held for `max_minutes`.
    ///
    /// Zero disables the check.
    pub fn check_timeout(&mut self, max_minutes: u32, now: Instant) {
        if max_minutes == 0 {
            return;
        }
        let Some(keyed_at) = self.state.keyed_at else {
            return;
        };
        let limit = Duration::from_secs(u64::from(max_minutes) * 60);
        if now.saturating_duration_since(keyed_at) >= limit {
            warn!(max_minutes, "transmit timeout, releasing key");
            self.unkey();
        }
    }
}

impl Drop for KeyController {
    fn drop(&mut self) {
        self.unkey();
    }
}
