//! Bridge event types.
//!
//! Events are published by the call-control state machine through a
//! tokio `broadcast` channel. The local display subscribes to them;
//! nothing in the control path depends on a subscriber being present.

use crate::types::{DeviceAddress, SessionState};

/// An event emitted while the bridge runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The session state machine moved to a new state.
    StateChanged {
        /// State before the transition.
        from: SessionState,
        /// State after the transition.
        to: SessionState,
    },

    /// The transmit key was asserted or released.
    KeyChanged {
        /// `true` while transmitting.
        keyed: bool,
    },

    /// A remote device reported its friendly name.
    RemoteName {
        /// Address of the remote device.
        address: DeviceAddress,
        /// Friendly name without quotes.
        name: String,
    },

    /// Free-form status text for the display.
    Status(String),
}
