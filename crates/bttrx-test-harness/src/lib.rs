//! bttrx-test-harness: mock transport and recording outputs for the bt-trx
//! bridge.
//!
//! [`MockTransport`] scripts the iWrap module at line level so the protocol
//! client and the state machine can be tested without hardware.
//! [`RecordingIndicator`] and [`RecordingKeyOutput`] capture what the bridge
//! drove onto its LEDs and the transmit key.

pub mod mock_serial;
pub mod recording;

pub use mock_serial::{MockHandle, MockTransport};
pub use recording::{RecordingIndicator, RecordingKeyOutput};
