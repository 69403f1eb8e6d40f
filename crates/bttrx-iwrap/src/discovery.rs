//! Device lists maintained while classifying module output.

use bttrx_core::DeviceAddress;

/// Devices seen by the last inquiry and links listed by the last `LIST`.
///
/// Each list is cleared when its query is issued, so it never holds entries
/// from an earlier query.
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    inquired: Vec<DeviceAddress>,
    active: Vec<DeviceAddress>,
    inquiry_running: bool,
}

impl Discovery {
    /// Devices found by the current or last inquiry, in discovery order.
    pub fn inquired_devices(&self) -> &[DeviceAddress] {
        &self.inquired
    }

    /// Addresses of the links reported by the last `LIST`.
    pub fn active_connections(&self) -> &[DeviceAddress] {
        &self.active
    }

    /// Whether a non-blocking inquiry is still in progress.
    pub fn inquiry_running(&self) -> bool {
        self.inquiry_running
    }

    pub(crate) fn begin_inquiry(&mut self, running: bool) {
        self.inquired.clear();
        self.inquiry_running = running;
    }

    pub(crate) fn finish_inquiry(&mut self) {
        self.inquiry_running = false;
    }

    pub(crate) fn begin_list(&mut self) {
        self.active.clear();
    }

    pub(crate) fn add_inquired(&mut self, address: DeviceAddress) {
        self.inquired.push(address);
    }

    pub(crate) fn add_active(&mut self, address: DeviceAddress) {
        self.active.push(address);
    }
}
