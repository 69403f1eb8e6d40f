//! IwrapClientBuilder -- fluent builder for [`IwrapClient`] instances.
//!
//! Timing defaults match the WT32i firmware: one second for ordinary
//! replies, eight seconds for the inquiry header and fifteen seconds for
//! pairing plus link setup.
//!
//! # Example
//!
//! ```no_run
//! use bttrx_iwrap::IwrapClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> bttrx_core::Result<()> {
//! let client = IwrapClientBuilder::new()
//!     .serial_port("/dev/ttyS1")
//!     .reply_timeout(Duration::from_millis(1500))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use bttrx_core::error::{Error, Result};
use bttrx_core::transport::Transport;
use bttrx_line_io::{LineChannel, LineConfig};
use bttrx_transport::serial::DEFAULT_BAUD_RATE;

use crate::client::{IwrapClient, IwrapConfig};

/// Longest inquiry iWrap accepts, in units of 1.28 s.
const MAX_INQUIRY_DURATION: u8 = 48;

/// Fluent builder for [`IwrapClient`].
pub struct IwrapClientBuilder {
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    config: IwrapConfig,
    line_config: LineConfig,
}

impl Default for IwrapClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IwrapClientBuilder {
    pub fn new() -> Self {
        IwrapClientBuilder {
            serial_port: None,
            baud_rate: None,
            config: IwrapConfig::default(),
            line_config: LineConfig::default(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyS1`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Timeout for ordinary blocking replies (default: 1000ms).
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply_timeout = timeout;
        self
    }

    /// Timeout for the header of a blocking inquiry (default: 8000ms).
    pub fn inquiry_header_timeout(mut self, timeout: Duration) -> Self {
        self.config.inquiry_header_timeout = timeout;
        self
    }

    /// Bound on pairing and link setup in `connect_hfp_ag` (default: 15s).
    pub fn connect_deadline(mut self, deadline: Duration) -> Self {
        self.config.connect_deadline = deadline;
        self
    }

    /// Inquiry length in units of 1.28 s (default: 5, range 1..=48).
    pub fn inquiry_duration(mut self, units: u8) -> Self {
        self.config.inquiry_duration = units;
        self
    }

    /// Request remote names on non-blocking inquiries.
    pub fn inquiry_with_names(mut self, enabled: bool) -> Self {
        self.config.inquiry_with_names = enabled;
        self
    }

    /// Suffix used when the module does not report its address.
    pub fn address_suffix_fallback(mut self, suffix: &str) -> Self {
        self.config.address_suffix_fallback = suffix.to_string();
        self
    }

    /// Longest accepted line (default: 128 bytes).
    pub fn max_line_len(mut self, len: usize) -> Self {
        self.line_config.max_line_len = len;
        self
    }

    /// How long a single poll waits for input (default: 10ms).
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.line_config.poll_timeout = timeout;
        self
    }

    /// Build an [`IwrapClient`] with a caller-provided transport.
    ///
    /// Tests pass a `MockTransport` from `bttrx-test-harness` here.
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<IwrapClient> {
        if !(1..=MAX_INQUIRY_DURATION).contains(&self.config.inquiry_duration) {
            return Err(Error::InvalidParameter(format!(
                "inquiry_duration must be 1..={MAX_INQUIRY_DURATION}, got {}",
                self.config.inquiry_duration
            )));
        }
        if self.line_config.max_line_len == 0 {
            return Err(Error::InvalidParameter("max_line_len must be non-zero".into()));
        }

        let channel = LineChannel::with_config(transport, self.line_config);
        Ok(IwrapClient::new(channel, self.config))
    }

    /// Build an [`IwrapClient`] on a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<IwrapClient> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let baud = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

        let transport = bttrx_transport::SerialTransport::open(port, baud).await?;
        self.build_with_transport(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bttrx_test_harness::MockTransport;

    #[test]
    fn builder_defaults() {
        let client = IwrapClientBuilder::new()
            .build_with_transport(Box::new(MockTransport::new()))
            .unwrap();

        assert_eq!(client.config().reply_timeout, Duration::from_millis(1000));
        assert_eq!(client.config().inquiry_header_timeout, Duration::from_millis(8000));
        assert_eq!(client.config().inquiry_duration, 5);
        assert!(!client.inquiry_running());
    }

    #[test]
    fn builder_custom_settings() {
        let client = IwrapClientBuilder::new()
            .serial_port("/dev/ttyS1")
            .baud_rate(9600)
            .reply_timeout(Duration::from_millis(200))
            .connect_deadline(Duration::from_secs(30))
            .inquiry_duration(10)
            .inquiry_with_names(true)
            .address_suffix_fallback("abcdef")
            .max_line_len(256)
            .poll_timeout(Duration::from_millis(5))
            .build_with_transport(Box::new(MockTransport::new()))
            .unwrap();

        assert_eq!(client.config().reply_timeout, Duration::from_millis(200));
        assert_eq!(client.config().connect_deadline, Duration::from_secs(30));
        assert_eq!(client.config().inquiry_duration, 10);
        assert!(client.config().inquiry_with_names);
        assert_eq!(client.config().address_suffix_fallback, "abcdef");
    }

    #[test]
    fn builder_rejects_inquiry_duration() {
        for units in [0, 49] {
            let result = IwrapClientBuilder::new()
                .inquiry_duration(units)
                .build_with_transport(Box::new(MockTransport::new()));
            assert!(matches!(result, Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn builder_rejects_zero_line_len() {
        let result = IwrapClientBuilder::new()
            .max_line_len(0)
            .build_with_transport(Box::new(MockTransport::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = IwrapClientBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
