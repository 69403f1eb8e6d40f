//! Transport implementations for the bt-trx bridge.
//!
//! - [`SerialTransport`]: the UART link to the iWrap Bluetooth module,
//!   implementing [`Transport`](bttrx_core::Transport)
//! - [`SerialKeyLine`]: a serial control line (RTS or DTR) driving the
//!   radio's transmit key, implementing [`KeyOutput`](bttrx_core::KeyOutput)
//!
//! # Example
//!
//! ```no_run
//! use bttrx_transport::SerialTransport;
//! use bttrx_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> bttrx_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 115_200).await?;
//! transport.send(b"AT\n").await?;
//!
//! let mut buf = [0u8; 128];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

pub mod key_line;
pub mod serial;

pub use key_line::SerialKeyLine;
pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE};
