//! UART link to the iWrap Bluetooth module.
//!
//! The WT32i speaks iWrap over a plain UART. Framing is always 8N1; only the
//! rate and whether the RTS/CTS pins are wired vary between boards.

use std::time::Duration;

use async_trait::async_trait;
use bttrx_core::error::{Error, Result};
use bttrx_core::transport::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

/// Factory UART rate of the module.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// UART settings that differ between carrier boards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Use the module's RTS/CTS pins.
    pub hardware_flow_control: bool,
    /// Throw away whatever the module printed before the port was opened
    /// (boot banner, stale events).
    pub discard_pending_input: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            hardware_flow_control: false,
            discard_pending_input: true,
        }
    }
}

impl SerialConfig {
    fn flow_control(&self) -> tokio_serial::FlowControl {
        if self.hardware_flow_control {
            tokio_serial::FlowControl::Hardware
        } else {
            tokio_serial::FlowControl::None
        }
    }
}

/// [`Transport`] over the module UART.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    path: String,
}

impl SerialTransport {
    /// Open `path` at `baud_rate` with the remaining settings at their
    /// defaults.
    ///
    /// ```no_run
    /// # use bttrx_transport::SerialTransport;
    /// # async fn example() -> bttrx_core::Result<()> {
    /// let link = SerialTransport::open("/dev/ttyS1", 115_200).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(
            path,
            SerialConfig {
                baud_rate,
                ..SerialConfig::default()
            },
        )
        .await
    }

    pub async fn open_with_config(path: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %path,
            baud_rate = config.baud_rate,
            hardware_flow_control = config.hardware_flow_control,
            "opening module uart"
        );

        let stream = tokio_serial::new(path, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(config.flow_control())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %path, error = %e, "cannot open module uart");
                Error::Transport(format!("cannot open {path}: {e}"))
            })?;

        if config.discard_pending_input {
            if let Err(e) = stream.clear(ClearBuffer::Input) {
                tracing::warn!(port = %path, error = %e, "could not discard stale input");
            }
        }

        tracing::info!(port = %path, baud_rate = config.baud_rate, "module uart open");
        Ok(Self {
            stream: Some(stream),
            path: path.to_owned(),
        })
    }

    /// Device path the link was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Errors that mean the UART itself went away, as opposed to a single
/// failed transfer.
fn link_error(e: std::io::Error) -> Error {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        tracing::trace!(port = %self.path, len = data.len(), "uart write");
        stream.write_all(data).await.map_err(link_error)?;
        stream.flush().await.map_err(link_error)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| {
                tracing::error!(port = %self.path, error = %e, "uart read failed");
                link_error(e)
            })?;
        if n == 0 {
            tracing::warn!(port = %self.path, "uart closed by peer");
            return Err(Error::ConnectionLost);
        }
        tracing::trace!(port = %self.path, len = n, "uart read");
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        stream.flush().await.map_err(link_error)?;
        tracing::info!(port = %self.path, "module uart closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_factory_uart() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert!(!config.hardware_flow_control);
        assert!(config.discard_pending_input);
        assert_eq!(config.flow_control(), tokio_serial::FlowControl::None);
    }

    #[test]
    fn hardware_flow_control_selects_rts_cts() {
        let config = SerialConfig {
            hardware_flow_control: true,
            ..SerialConfig::default()
        };
        assert_eq!(config.flow_control(), tokio_serial::FlowControl::Hardware);
    }

    #[test]
    fn lost_uart_is_a_link_error() {
        use std::io::{Error as IoError, ErrorKind};
        assert!(matches!(
            link_error(IoError::new(ErrorKind::BrokenPipe, "unplugged")),
            Error::ConnectionLost
        ));
        assert!(matches!(
            link_error(IoError::new(ErrorKind::UnexpectedEof, "eof")),
            Error::ConnectionLost
        ));
        assert!(matches!(
            link_error(IoError::new(ErrorKind::InvalidData, "framing")),
            Error::Io(_)
        ));
    }
}
