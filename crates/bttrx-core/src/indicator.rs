//! Output seams: status indicators and the physical transmit key.
//!
//! Both are fire-and-forget. Implementations that can fail (a serial control
//! line, a GPIO) log the failure and carry on; the callers treat these
//! outputs as total functions.

use std::time::Duration;

/// Display mode of a status indicator (LED).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndicatorMode {
    /// Dark.
    #[default]
    Off,
    /// Solid on.
    On,
    /// Toggling with the given half-period.
    Blink(Duration),
}

/// A status indicator.
///
/// The state machine re-asserts the desired mode every tick, so
/// implementations should treat repeated identical modes as a no-op.
pub trait Indicator: Send {
    /// Switch the indicator to `mode`.
    fn set_mode(&mut self, mode: IndicatorMode);

    /// Solid on.
    fn on(&mut self) {
        self.set_mode(IndicatorMode::On);
    }

    /// Dark.
    fn off(&mut self) {
        self.set_mode(IndicatorMode::Off);
    }

    /// Blink with the given half-period.
    fn blink(&mut self, interval: Duration) {
        self.set_mode(IndicatorMode::Blink(interval));
    }
}

/// The physical transmit-key output of the radio.
pub trait KeyOutput: Send {
    /// Assert (`true`) or release (`false`) the transmit key.
    fn set_keyed(&mut self, keyed: bool);
}

/// Indicator that goes nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl Indicator for NullIndicator {
    fn set_mode(&mut self, _mode: IndicatorMode) {}
}

/// Key output that goes nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullKeyOutput;

impl KeyOutput for NullKeyOutput {
    fn set_keyed(&mut self, _keyed: bool) {}
}
