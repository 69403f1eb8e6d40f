//! bttrx-core: Core traits, types, and error definitions for the bt-trx bridge.
//!
//! This crate defines the hardware-agnostic pieces shared by every other
//! crate in the workspace: the byte-level [`Transport`] to the Bluetooth
//! module, the indicator and key-output seams, the settings store, and the
//! events published while the bridge runs.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to the iWrap module
//! - [`KeyOutput`] / [`Indicator`] -- physical transmit key and status LEDs
//! - [`SettingsStore`] -- persistent key/value settings
//! - [`BridgeEvent`] -- state change notifications for displays
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod indicator;
pub mod settings;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use events::BridgeEvent;
pub use indicator::{Indicator, IndicatorMode, KeyOutput, NullIndicator, NullKeyOutput};
pub use settings::{JsonFileSettings, MemorySettings, Setting, SettingsStore};
pub use transport::Transport;
pub use types::*;
