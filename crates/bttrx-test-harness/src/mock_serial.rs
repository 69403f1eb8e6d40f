//! Line-scripted mock of the iWrap module.
//!
//! [`MockTransport`] implements the [`Transport`] trait. Tests pre-load
//! request/response pairs at line level: when the code under test sends a
//! line equal to the next expected request, the scripted response lines are
//! queued for reading. Lines that match no expectation are recorded and
//! accepted, since most iWrap commands are fire-and-forget.
//!
//! The transport is moved into the code under test, so all state lives
//! behind a [`MockHandle`] that the test keeps to inspect sent lines and to
//! inject unsolicited module output.
//!
//! # Example
//!
//! ```
//! use bttrx_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! mock.expect_line("AT", &["OK"]);
//! let handle = mock.handle();
//! handle.push_line("HFP-AG 0 READY");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bttrx_core::error::{Error, Result};
use bttrx_core::transport::Transport;

/// A pre-loaded request and the lines answered to it.
#[derive(Debug, Clone)]
struct Expectation {
    request: String,
    responses: Vec<String>,
}

#[derive(Debug)]
struct MockState {
    expectations: VecDeque<Expectation>,
    inbound: VecDeque<u8>,
    sent_log: Vec<Vec<u8>>,
    connected: bool,
}

/// Shared view of a [`MockTransport`]'s state.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a line of module output, newline appended.
    pub fn push_line(&self, line: &str) {
        let mut state = self.lock();
        state.inbound.extend(line.as_bytes());
        state.inbound.push_back(b'\n');
    }

    /// Queue raw module output.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes);
    }

    /// Add an expected request line and the lines to answer it with.
    pub fn expect_line(&self, request: &str, responses: &[&str]) {
        self.lock().expectations.push_back(Expectation {
            request: request.to_string(),
            responses: responses.iter().map(|s| s.to_string()).collect(),
        });
    }

    /// Every `send()` payload so far.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.lock().sent_log.clone()
    }

    /// Every `send()` payload as text, line terminator stripped.
    pub fn sent_lines(&self) -> Vec<String> {
        self.lock()
            .sent_log
            .iter()
            .map(|bytes| {
                let text = String::from_utf8_lossy(bytes);
                text.trim_end_matches('\n').to_string()
            })
            .collect()
    }

    /// Forget the send log.
    pub fn clear_sent(&self) {
        self.lock().sent_log.clear();
    }

    /// Expectations that have not been matched yet.
    pub fn remaining_expectations(&self) -> usize {
        self.lock().expectations.len()
    }

    /// Bytes queued for reading that nobody has read yet.
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Simulate the port going away (or coming back).
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }
}

/// A mock [`Transport`] that plays the iWrap module.
#[derive(Debug, Clone)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    /// Create a connected mock with nothing scripted.
    pub fn new() -> Self {
        MockTransport {
            handle: MockHandle {
                state: Arc::new(Mutex::new(MockState {
                    expectations: VecDeque::new(),
                    inbound: VecDeque::new(),
                    sent_log: Vec::new(),
                    connected: true,
                })),
            },
        }
    }

    /// A handle sharing this mock's state.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    /// See [`MockHandle::expect_line`].
    pub fn expect_line(&mut self, request: &str, responses: &[&str]) {
        self.handle.expect_line(request, responses);
    }

    /// See [`MockHandle::push_line`].
    pub fn push_line(&mut self, line: &str) {
        self.handle.push_line(line);
    }

    /// See [`MockHandle::sent_lines`].
    pub fn sent_lines(&self) -> Vec<String> {
        self.handle.sent_lines()
    }

    /// See [`MockHandle::set_connected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.handle.set_connected(connected);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.handle.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(data.to_vec());

        let text = String::from_utf8_lossy(data);
        let line = text.trim_end_matches('\n');
        let matches_front = state
            .expectations
            .front()
            .is_some_and(|expectation| expectation.request == line);
        if matches_front {
            if let Some(expectation) = state.expectations.pop_front() {
                for response in expectation.responses {
                    state.inbound.extend(response.as_bytes());
                    state.inbound.push_back(b'\n');
                }
            }
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        {
            let mut state = self.handle.lock();
            if !state.connected {
                return Err(Error::NotConnected);
            }
            if !state.inbound.is_empty() {
                let n = state.inbound.len().min(buf.len());
                for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }

        tokio::time::sleep(timeout).await;
        Err(Error::Timeout)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.handle.lock();
        state.connected = false;
        state.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.lock().connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expected_request_queues_responses() {
        let mut mock = MockTransport::new();
        mock.expect_line("AT", &["OK"]);

        mock.send(b"AT\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"OK\n");
        assert_eq!(mock.handle().remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn unscripted_send_is_recorded() {
        let mut mock = MockTransport::new();
        mock.expect_line("SET", &["SET"]);

        mock.send(b"SET BT AUTH * 0000\n").await.unwrap();
        mock.send(b"SET\n").await.unwrap();

        assert_eq!(mock.sent_lines(), vec!["SET BT AUTH * 0000", "SET"]);
        assert_eq!(mock.handle().pending_inbound(), 4);
    }

    #[tokio::test]
    async fn out_of_order_request_does_not_consume_expectation() {
        let mut mock = MockTransport::new();
        mock.expect_line("AT", &["OK"]);

        mock.send(b"RESET\n").await.unwrap();
        assert_eq!(mock.handle().remaining_expectations(), 1);
        assert_eq!(mock.handle().pending_inbound(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_receive_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 8];
        let start = tokio::time::Instant::now();

        let result = mock.receive(&mut buf, Duration::from_millis(250)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn partial_receive() {
        let mut mock = MockTransport::new();
        mock.handle().push_line("READY.");

        let mut buf = [0u8; 4];
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"READ");
        let n = mock
            .receive(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"Y.\n");
    }

    #[tokio::test]
    async fn disconnected_mock_rejects_io() {
        let mut mock = MockTransport::new();
        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        assert!(matches!(mock.send(b"AT\n").await, Err(Error::NotConnected)));
        let mut buf = [0u8; 8];
        assert!(matches!(
            mock.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }
}
