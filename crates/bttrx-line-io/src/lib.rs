//! Line channel for the iWrap command protocol.
//!
//! The module speaks newline-terminated ASCII lines. This crate turns the
//! byte stream of any [`Transport`](bttrx_core::Transport) into those lines
//! and offers the three primitives the protocol client is built on: write a
//! line, read a buffered line without blocking, and wait for a line whose
//! first word matches.
//!
//! # Architecture
//!
//! - [`protocol`] -- line decode/encode and tokenizing
//! - [`io`] -- [`LineChannel`] over a transport

pub mod io;
pub mod protocol;

pub use io::{LineChannel, LineConfig};
