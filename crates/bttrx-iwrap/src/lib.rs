//! iWrap protocol backend for the bt-trx bridge.
//!
//! This crate talks to a Silicon Labs WT32i module running iWrap firmware,
//! with the module in the HFP audio gateway role. It provides:
//!
//! - **Command builders** ([`commands`]) -- construct outgoing command lines
//!   and parse the positional fields of the module's replies.
//! - **Message classifier** ([`message`]) -- turn one incoming line into a
//!   tagged [`Message`], tracking discovered devices and active links in
//!   [`Discovery`](discovery::Discovery).
//! - **HFP status table** ([`hfp_status`]) -- indicator values reported by
//!   the hands-free device.
//! - **AT emulation** ([`at`]) -- canned answers for the cellular-modem AT
//!   commands a hands-free device probes for.
//! - **Protocol client** ([`client`]) -- the blocking and fire-and-forget
//!   exchanges over a [`LineChannel`](bttrx_line_io::LineChannel).
//! - **Builder** ([`builder`]) -- fluent construction with firmware-matched
//!   timing defaults.
//!
//! # Example
//!
//! ```
//! use bttrx_iwrap::discovery::Discovery;
//! use bttrx_iwrap::message::{classify, MessageKind};
//!
//! let mut discovery = Discovery::default();
//! let msg = classify("HFP-AG 0 READY", &mut discovery).unwrap();
//! assert_eq!(msg.kind, MessageKind::HfpReady);
//! ```

pub mod at;
pub mod builder;
pub mod client;
pub mod commands;
pub mod discovery;
pub mod hfp_status;
pub mod message;

pub use builder::IwrapClientBuilder;
pub use client::{IwrapClient, IwrapConfig};
pub use message::{Message, MessageKind};
