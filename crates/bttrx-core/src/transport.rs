//! Transport trait for communication with the Bluetooth module.
//!
//! The [`Transport`] trait abstracts over the physical link to the iWrap
//! module. The serial implementation lives in `bttrx-transport`; the
//! scripted mock used by tests lives in `bttrx-test-harness`.
//!
//! Line framing is not a transport concern: the line channel in
//! `bttrx-line-io` operates on a `Transport` and turns its bytes into
//! newline-terminated lines.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to the Bluetooth module.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// Implementations should return once all bytes have been handed to the
    /// underlying device.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
