//! Line channel over a byte transport.
//!
//! [`LineChannel`] owns the transport exclusively and buffers whatever the
//! module sends until a full line is available. The call-control loop is a
//! single task, so the channel is used directly rather than through a
//! spawned IO task: a blocking wait simply holds that task until the line
//! arrives or the deadline passes.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use bttrx_core::error::{Error, Result};
use bttrx_core::transport::Transport;

use crate::protocol::{self, DecodeResult};

/// Size of one transport read.
const READ_CHUNK: usize = 128;

/// Line channel options.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Longest line accepted from the module; longer input is dropped.
    pub max_line_len: usize,
    /// How long [`LineChannel::read_line_or_empty`] waits for more bytes.
    pub poll_timeout: Duration,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_len: protocol::DEFAULT_MAX_LINE_LEN,
            poll_timeout: Duration::from_millis(10),
        }
    }
}

/// Bidirectional stream of text lines to the module.
pub struct LineChannel {
    transport: Box<dyn Transport>,
    config: LineConfig,
    rx_buf: Vec<u8>,
    /// Inside an overlong line; drop input through the next terminator.
    discarding: bool,
}

impl LineChannel {
    /// Wrap a transport with default options.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_config(transport, LineConfig::default())
    }

    /// Wrap a transport.
    pub fn with_config(transport: Box<dyn Transport>, config: LineConfig) -> Self {
        Self {
            transport,
            config,
            rx_buf: Vec::new(),
            discarding: false,
        }
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Whether the underlying transport is still open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Send one line. Returns the number of bytes written, terminator included.
    pub async fn write_line(&mut self, text: &str) -> Result<usize> {
        let bytes = protocol::encode_line(text);
        debug!(line = %text, "> ");
        self.transport.send(&bytes).await?;
        Ok(bytes.len())
    }

    /// Next complete line, or `""` if none arrives within the poll timeout.
    pub async fn read_line_or_empty(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.next_buffered_line() {
                return Ok(line);
            }
            if !self.fill(self.config.poll_timeout).await? {
                return Ok(String::new());
            }
        }
    }

    /// Wait for a line whose first word equals `first_word`.
    ///
    /// Lines with a different first word are discarded. Returns
    /// [`Error::Timeout`] once `timeout` has passed without a match.
    pub async fn wait_for_line(&mut self, first_word: &str, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(line) = self.next_buffered_line() {
                if protocol::first_word(&line) == first_word {
                    return Ok(line);
                }
                debug!(line = %line, expected = first_word, "skipping line");
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(expected = first_word, ?timeout, "timed out waiting for line");
                return Err(Error::Timeout);
            }
            self.fill(deadline - now).await?;
        }
    }

    /// Close the transport. Buffered input is dropped.
    pub async fn close(&mut self) -> Result<()> {
        self.rx_buf.clear();
        self.discarding = false;
        self.transport.close().await
    }

    /// Read once from the transport. `Ok(false)` means the read timed out.
    async fn fill(&mut self, timeout: Duration) -> Result<bool> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.transport.receive(&mut chunk, timeout).await {
            Ok(n) => {
                self.rx_buf.extend_from_slice(&chunk[..n]);
                Ok(true)
            }
            Err(Error::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn next_buffered_line(&mut self) -> Option<String> {
        loop {
            if self.discarding {
                match self.rx_buf.iter().position(|&b| b == protocol::TERMINATOR) {
                    Some(pos) => {
                        self.rx_buf.drain(..=pos);
                        self.discarding = false;
                        debug!(bytes = pos + 1, "end of overlong line");
                    }
                    None => {
                        self.rx_buf.clear();
                        return None;
                    }
                }
            }

            match protocol::decode_line(&self.rx_buf, self.config.max_line_len) {
                DecodeResult::Line { text, consumed } => {
                    self.rx_buf.drain(..consumed);
                    debug!(line = %text, "< ");
                    return Some(text);
                }
                DecodeResult::Error(consumed) => {
                    self.rx_buf.drain(..consumed);
                    tracing::warn!(bytes = consumed, "dropping non-UTF-8 line");
                }
                DecodeResult::Overflow(consumed) => {
                    let terminated =
                        self.rx_buf[..consumed].last() == Some(&protocol::TERMINATOR);
                    self.rx_buf.drain(..consumed);
                    self.discarding = !terminated;
                    tracing::warn!(
                        bytes = consumed,
                        max = self.config.max_line_len,
                        "dropping overlong line"
                    );
                }
                DecodeResult::Incomplete => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bttrx_test_harness::MockTransport;

    fn channel(mock: &MockTransport) -> LineChannel {
        LineChannel::new(Box::new(mock.clone()))
    }

    #[tokio::test]
    async fn write_line_appends_terminator() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let mut chan = channel(&mock);

        let n = chan.write_line("SET BT PAIR *").await.unwrap();
        assert_eq!(n, 14);
        assert_eq!(handle.sent_data(), vec![b"SET BT PAIR *\n".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn read_line_or_empty_returns_empty_when_idle() {
        let mock = MockTransport::new();
        let mut chan = channel(&mock);
        assert_eq!(chan.read_line_or_empty().await.unwrap(), "");
    }

    #[tokio::test]
    async fn read_line_or_empty_strips_cr() {
        let mock = MockTransport::new();
        mock.handle().push_bytes(b"HFP-AG 0 READY\r\n");
        let mut chan = channel(&mock);
        assert_eq!(chan.read_line_or_empty().await.unwrap(), "HFP-AG 0 READY");
    }

    #[tokio::test(start_paused = true)]
    async fn read_line_or_empty_keeps_partial_line() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_bytes(b"HFP-AG 0 ");
        let mut chan = channel(&mock);

        assert_eq!(chan.read_line_or_empty().await.unwrap(), "");
        handle.push_bytes(b"CALLING\n");
        assert_eq!(chan.read_line_or_empty().await.unwrap(), "HFP-AG 0 CALLING");
    }

    #[tokio::test]
    async fn wait_for_line_skips_other_lines() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_line("SSP CONFIRM aa:bb:cc:dd:ee:ff 123456");
        handle.push_line("OK");
        let mut chan = channel(&mock);

        let line = chan
            .wait_for_line("OK", Duration::from_millis(1000))
            .await
            .unwrap();
        assert_eq!(line, "OK");
        assert_eq!(handle.pending_inbound(), 0);
    }

    #[tokio::test]
    async fn wait_for_line_matches_whole_first_word() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_line("INQUIRY_PARTIAL 0");
        handle.push_line("INQUIRY 1");
        let mut chan = channel(&mock);

        let line = chan
            .wait_for_line("INQUIRY", Duration::from_millis(1000))
            .await
            .unwrap();
        assert_eq!(line, "INQUIRY 1");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_line_times_out() {
        let mock = MockTransport::new();
        mock.handle().push_line("READY.");
        let mut chan = channel(&mock);
        let start = Instant::now();

        let result = chan.wait_for_line("OK", Duration::from_millis(1000)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn overlong_line_is_dropped() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_line(&"X".repeat(200));
        handle.push_line("OK");
        let mut chan = channel(&mock);

        let line = chan
            .wait_for_line("OK", Duration::from_millis(1000))
            .await
            .unwrap();
        assert_eq!(line, "OK");
    }

    #[tokio::test(start_paused = true)]
    async fn overlong_line_tail_is_not_a_line() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_bytes(format!("{} HFP-AG 0 READY\n", "X".repeat(280)).as_bytes());
        handle.push_line("OK");
        let mut chan = channel(&mock);

        let mut lines = Vec::new();
        for _ in 0..6 {
            let line = chan.read_line_or_empty().await.unwrap();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["OK"]);
    }

    #[tokio::test(start_paused = true)]
    async fn discarding_spans_reads() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_bytes("Y".repeat(300).as_bytes());
        let mut chan = channel(&mock);
        for _ in 0..4 {
            assert_eq!(chan.read_line_or_empty().await.unwrap(), "");
        }

        handle.push_bytes(b"YYYY HFP-AG 0 CALLING\r\nHFP-AG 0 READY\r\n");
        assert_eq!(chan.read_line_or_empty().await.unwrap(), "HFP-AG 0 READY");
    }

    #[tokio::test]
    async fn transport_error_propagates() {
        let mock = MockTransport::new();
        mock.handle().set_connected(false);
        let mut chan = channel(&mock);
        assert!(matches!(
            chan.read_line_or_empty().await,
            Err(Error::NotConnected)
        ));
    }
}
