//! Error types for the bt-trx bridge.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, malformed module
//! output, rejected commands, and unexpected replies are all captured here.

/// The error type for all bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/read/write failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for an expected line from the Bluetooth module.
    ///
    /// Never retried inside the protocol client; the caller decides.
    #[error("timeout waiting for response")]
    Timeout,

    /// A line matched a known message family but violated its shape.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A line did not match any known message family.
    #[error("unrecognized message: {0}")]
    UnrecognizedMessage(String),

    /// A command precondition failed; nothing was sent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A blocking exchange received a well-formed but unexpected reply.
    #[error("unexpected reply: expected {expected:?}, received {received:?}")]
    UnexpectedReply {
        /// The reply the exchange required.
        expected: String,
        /// The line that actually arrived.
        received: String,
    },

    /// No HFP status value has been recorded for this link and name.
    #[error("no HFP status {name:?} for link {link_id}")]
    StatusNotFound {
        /// Link ID the status was queried for.
        link_id: u8,
        /// Status indicator name (e.g. `service`).
        name: String,
    },

    /// The request is not supported (e.g. an AT command with no emulation).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The settings store could not be read or written.
    #[error("settings error: {0}")]
    Settings(String),

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error comes from classifying a single line.
    ///
    /// Such errors are discarded by the state machine; the line is dropped
    /// and polling continues on the next tick.
    pub fn is_classification_failure(&self) -> bool {
        matches!(self, Error::Malformed(_) | Error::UnrecognizedMessage(_))
    }

    /// Whether the link to the module itself failed.
    ///
    /// Protocol-level failures leave the state machine where it is; link
    /// failures end the driver loop.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::NotConnected | Error::ConnectionLost | Error::Io(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_timeout() {
        let e = Error::Timeout;
        assert_eq!(e.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_malformed() {
        let e = Error::Malformed("LIST with 4 fields".into());
        assert_eq!(e.to_string(), "malformed message: LIST with 4 fields");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("empty category".into());
        assert_eq!(e.to_string(), "invalid parameter: empty category");
    }

    #[test]
    fn error_display_unexpected_reply() {
        let e = Error::UnexpectedReply {
            expected: "HFP-AG 0 CALLING".into(),
            received: "HFP-AG 0 READY".into(),
        };
        assert_eq!(
            e.to_string(),
            "unexpected reply: expected \"HFP-AG 0 CALLING\", received \"HFP-AG 0 READY\""
        );
    }

    #[test]
    fn error_display_status_not_found() {
        let e = Error::StatusNotFound {
            link_id: 0,
            name: "battchg".into(),
        };
        assert_eq!(e.to_string(), "no HFP status \"battchg\" for link 0");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn classification_failures() {
        assert!(Error::Malformed("x".into()).is_classification_failure());
        assert!(Error::UnrecognizedMessage("x".into()).is_classification_failure());
        assert!(!Error::Timeout.is_classification_failure());
        assert!(!Error::ConnectionLost.is_classification_failure());
    }

    #[test]
    fn link_failures() {
        assert!(Error::ConnectionLost.is_link_failure());
        assert!(Error::NotConnected.is_link_failure());
        assert!(Error::Transport("gone".into()).is_link_failure());
        assert!(!Error::Timeout.is_link_failure());
        assert!(!Error::UnexpectedReply {
            expected: "a".into(),
            received: "b".into()
        }
        .is_link_failure());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
