//! Transmit key driven by a serial control line.
//!
//! Many radio interfaces wire PTT to the RTS or DTR pin of a USB serial
//! adapter. The OS often asserts DTR when a port opens, which would key the
//! radio, so both lines are released right after opening.

use bttrx_core::error::{Error, Result};
use bttrx_core::indicator::KeyOutput;
use bttrx_core::types::KeyLine;
use tokio_serial::SerialPort;

/// Serial-line transmit key output.
pub struct SerialKeyLine {
    port: Box<dyn SerialPort>,
    line: KeyLine,
    port_name: String,
}

impl SerialKeyLine {
    /// Open `port` and use `line` as the transmit key.
    pub fn open(port: &str, line: KeyLine) -> Result<Self> {
        let mut handle = tokio_serial::new(port, 9600).open().map_err(|e| {
            tracing::error!(port = %port, error = %e, "failed to open key port");
            Error::Transport(format!("failed to open key port {port}: {e}"))
        })?;

        if let Err(e) = handle.write_data_terminal_ready(false) {
            tracing::warn!(port = %port, error = %e, "failed to release DTR");
        }
        if let Err(e) = handle.write_request_to_send(false) {
            tracing::warn!(port = %port, error = %e, "failed to release RTS");
        }

        tracing::info!(port = %port, line = ?line, "key port open");

        Ok(Self {
            port: handle,
            line,
            port_name: port.to_string(),
        })
    }

    /// Which control line carries the key.
    pub fn line(&self) -> KeyLine {
        self.line
    }

    /// Name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl KeyOutput for SerialKeyLine {
    fn set_keyed(&mut self, keyed: bool) {
        let result = match self.line {
            KeyLine::Rts => self.port.write_request_to_send(keyed),
            KeyLine::Dtr => self.port.write_data_terminal_ready(keyed),
        };
        match result {
            Ok(()) => tracing::debug!(port = %self.port_name, keyed, "key line set"),
            Err(e) => {
                tracing::warn!(port = %self.port_name, keyed, error = %e, "failed to drive key line")
            }
        }
    }
}

impl Drop for SerialKeyLine {
    fn drop(&mut self) {
        // never leave the radio transmitting
        self.set_keyed(false);
    }
}
