//! Domain types shared across the bridge crates.

use std::fmt;

/// Identifier of one active Bluetooth connection on the module.
pub type LinkId = u8;

/// A Bluetooth device address as printed by iWrap, e.g. `de:ad:be:ef:ca:fe`.
///
/// The text is kept verbatim; iWrap is the only producer and the address is
/// only ever echoed back to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        DeviceAddress(address.into())
    }

    /// The address as printed by the module.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address with all colon separators removed.
    ///
    /// ```
    /// use bttrx_core::DeviceAddress;
    /// let addr = DeviceAddress::new("00:07:80:ab:cd:ef");
    /// assert_eq!(addr.compact(), "000780abcdef");
    /// ```
    pub fn compact(&self) -> String {
        self.0.chars().filter(|c| *c != ':').collect()
    }

    /// The last `n` hex digits of the compact address.
    ///
    /// Returns the whole compact address if it is shorter than `n`, and
    /// `None` if anything other than hex digits and colons is present.
    pub fn suffix(&self, n: usize) -> Option<String> {
        let compact = self.compact();
        if !compact.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let start = compact.len().saturating_sub(n);
        Some(compact[start..].to_string())
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(s: &str) -> Self {
        DeviceAddress::new(s)
    }
}

/// Session lifecycle of the call-control state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// Waiting for the Bluetooth module to answer `AT`.
    #[default]
    Init,
    /// Pushing the fixed configuration batch to the module.
    Configure,
    /// Waiting for a phone; periodically scanning for devices.
    Inquiry,
    /// A non-blocking HFP-AG connect has been issued.
    Connecting,
    /// HFP-AG link established, no call running.
    Connected,
    /// A call is running; the PTT button drives the transmit key.
    CallRunning,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Init => "INIT",
            SessionState::Configure => "CONFIGURE",
            SessionState::Inquiry => "INQUIRY",
            SessionState::Connecting => "CONNECTING",
            SessionState::Connected => "CONNECTED",
            SessionState::CallRunning => "CALL_RUNNING",
        };
        f.write_str(s)
    }
}

/// A logical user button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// The push-to-talk button.
    Ptt,
    /// The helper button (dial / hang up / pairing reset).
    Helper,
}

/// A debounced edge reported for a [`Button`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonEdge {
    /// The button went down.
    Pressed,
    /// The button went up.
    Released,
    /// Three presses in quick succession.
    TripleClick,
}

/// One button edge event, produced upstream by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonEvent {
    /// Which button.
    pub button: Button,
    /// Which edge.
    pub edge: ButtonEdge,
}

impl ButtonEvent {
    /// Construct an event.
    pub fn new(button: Button, edge: ButtonEdge) -> Self {
        ButtonEvent { button, edge }
    }

    /// Shorthand for a press edge.
    pub fn pressed(button: Button) -> Self {
        ButtonEvent::new(button, ButtonEdge::Pressed)
    }

    /// Shorthand for a release edge.
    pub fn released(button: Button) -> Self {
        ButtonEvent::new(button, ButtonEdge::Released)
    }
}

/// Which serial control line carries the transmit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyLine {
    /// Key via the RTS serial line (default).
    #[default]
    Rts,
    /// Key via the DTR serial line.
    Dtr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_address_suffix() {
        let addr = DeviceAddress::new("00:07:80:12:ab:cd");
        assert_eq!(addr.suffix(6).as_deref(), Some("12abcd"));
    }

    #[test]
    fn device_address_suffix_short() {
        let addr = DeviceAddress::new("ab:cd");
        assert_eq!(addr.suffix(6).as_deref(), Some("abcd"));
    }

    #[test]
    fn device_address_suffix_rejects_non_hex() {
        assert_eq!(DeviceAddress::new("éééaé").suffix(6), None);
        assert_eq!(DeviceAddress::new("00:07:80:12:ab:zz").suffix(6), None);
    }

    #[test]
    fn device_address_display() {
        let addr = DeviceAddress::from("de:ad:be:ef:ca:fe");
        assert_eq!(addr.to_string(), "de:ad:be:ef:ca:fe");
        assert_eq!(addr.as_str(), "de:ad:be:ef:ca:fe");
    }

    #[test]
    fn session_state_default_is_init() {
        assert_eq!(SessionState::default(), SessionState::Init);
    }

    #[test]
    fn session_state_display() {
        assert_eq!(SessionState::CallRunning.to_string(), "CALL_RUNNING");
        assert_eq!(SessionState::Inquiry.to_string(), "INQUIRY");
    }

    #[test]
    fn button_event_shorthands() {
        assert_eq!(
            ButtonEvent::pressed(Button::Ptt),
            ButtonEvent::new(Button::Ptt, ButtonEdge::Pressed)
        );
        assert_eq!(
            ButtonEvent::released(Button::Helper).edge,
            ButtonEdge::Released
        );
    }
}
