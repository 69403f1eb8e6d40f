//! bttrx-bridge: session logic of the bt-trx HFP to PTT bridge.
//!
//! - [`key`] -- the transmit-key controller with hang time and timeout
//! - [`fsm`] -- the call-control state machine
//! - [`control`] -- validated settings access
//! - [`driver`] -- the tick loop tying everything to a tokio task
//!
//! # Example
//!
//! ```no_run
//! use bttrx_bridge::{run_bridge, CallControl, CallControlConfig, KeyController, StatusLeds};
//! use bttrx_core::{MemorySettings, NullIndicator, NullKeyOutput};
//! use bttrx_iwrap::IwrapClientBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> bttrx_core::Result<()> {
//! let client = IwrapClientBuilder::new().serial_port("/dev/ttyS1").build().await?;
//! let key = KeyController::new(Box::new(NullKeyOutput), Box::new(NullIndicator));
//! let leds = StatusLeds {
//!     connected: Box::new(NullIndicator),
//!     busy: Box::new(NullIndicator),
//! };
//! let mut control = CallControl::new(
//!     client,
//!     Box::new(MemorySettings::new()),
//!     key,
//!     leds,
//!     CallControlConfig::default(),
//! );
//!
//! let (_buttons_tx, buttons_rx) = tokio::sync::mpsc::channel(16);
//! run_bridge(&mut control, buttons_rx, bttrx_bridge::DEFAULT_TICK, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod driver;
pub mod fsm;
pub mod key;

pub use driver::{run_bridge, DEFAULT_TICK};
pub use fsm::{CallControl, CallControlConfig, StatusLeds};
pub use key::{KeyController, KeyState};
