//! Outputs that remember what they were told.
//!
//! Both types are cheap clones over shared state: box one clone into the
//! bridge and keep another in the test.

use std::sync::{Arc, Mutex, MutexGuard};

use bttrx_core::indicator::{Indicator, IndicatorMode, KeyOutput};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Records every mode an indicator was switched to.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    modes: Arc<Mutex<Vec<IndicatorMode>>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent mode, `Off` if never set.
    pub fn current(&self) -> IndicatorMode {
        lock(&self.modes).last().copied().unwrap_or_default()
    }

    /// All modes in the order they were set.
    pub fn history(&self) -> Vec<IndicatorMode> {
        lock(&self.modes).clone()
    }
}

impl Indicator for RecordingIndicator {
    fn set_mode(&mut self, mode: IndicatorMode) {
        lock(&self.modes).push(mode);
    }
}

/// Records every transition of the transmit key.
#[derive(Debug, Clone, Default)]
pub struct RecordingKeyOutput {
    levels: Arc<Mutex<Vec<bool>>>,
}

impl RecordingKeyOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the key is currently asserted.
    pub fn is_keyed(&self) -> bool {
        lock(&self.levels).last().copied().unwrap_or(false)
    }

    /// All levels in the order they were driven.
    pub fn history(&self) -> Vec<bool> {
        lock(&self.levels).clone()
    }
}

impl KeyOutput for RecordingKeyOutput {
    fn set_keyed(&mut self, keyed: bool) {
        lock(&self.levels).push(keyed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn indicator_records_through_clone() {
        let probe = RecordingIndicator::new();
        let mut boxed: Box<dyn Indicator> = Box::new(probe.clone());
        boxed.on();
        boxed.blink(Duration::from_millis(500));
        assert_eq!(probe.current(), IndicatorMode::Blink(Duration::from_millis(500)));
        assert_eq!(probe.history().len(), 2);
    }

    #[test]
    fn key_output_records_levels() {
        let probe = RecordingKeyOutput::new();
        assert!(!probe.is_keyed());
        let mut boxed: Box<dyn KeyOutput> = Box::new(probe.clone());
        boxed.set_keyed(true);
        assert!(probe.is_keyed());
        boxed.set_keyed(false);
        assert_eq!(probe.history(), vec![true, false]);
    }
}
