//! IwrapClient -- command exchanges with the WT32i module.
//!
//! The client ties the command builders ([`commands`]) and the classifier
//! ([`message`]) to a [`LineChannel`]. Two kinds of operation exist:
//!
//! - Blocking exchanges (`check_available`, `perform_inquiry_blocking`,
//!   `list_active_connections_blocking`, `connect_hfp_ag`, `dial`,
//!   `accept_call`, `request_device_address_suffix`) write a command and hold
//!   the calling task until the expected reply arrives or the timeout passes.
//!   A timeout is returned as [`Error::Timeout`] and never retried here.
//! - Fire-and-forget commands return as soon as the line is written; their
//!   effect is observed later through [`IwrapClient::poll_message`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use bttrx_core::{DeviceAddress, Error, LinkId, Result};
use bttrx_line_io::protocol::tokenize;
use bttrx_line_io::LineChannel;

use crate::at;
use crate::commands;
use crate::discovery::Discovery;
use crate::hfp_status::{self, HfpStatusTable};
use crate::message::{self, Message, MessageKind};

/// Number of address hex digits used in the friendly name.
const ADDRESS_SUFFIX_LEN: usize = 6;

/// Timing and naming options of an [`IwrapClient`].
#[derive(Debug, Clone)]
pub struct IwrapConfig {
    /// Budget for ordinary blocking replies.
    pub reply_timeout: Duration,
    /// Budget for the `INQUIRY <n>` header of a blocking inquiry.
    pub inquiry_header_timeout: Duration,
    /// Wall-clock bound on pairing and link setup in `connect_hfp_ag`.
    pub connect_deadline: Duration,
    /// Inquiry length in units of 1.28 s.
    pub inquiry_duration: u8,
    /// Ask for remote names on non-blocking inquiries.
    pub inquiry_with_names: bool,
    /// Returned by `request_device_address_suffix` when the module is silent.
    pub address_suffix_fallback: String,
}

impl Default for IwrapConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(1000),
            inquiry_header_timeout: Duration::from_millis(8000),
            connect_deadline: Duration::from_secs(15),
            inquiry_duration: 5,
            inquiry_with_names: false,
            address_suffix_fallback: "000000".to_string(),
        }
    }
}

/// A WT32i module driven over iWrap.
///
/// Constructed via [`IwrapClientBuilder`](crate::builder::IwrapClientBuilder).
pub struct IwrapClient {
    channel: LineChannel,
    config: IwrapConfig,
    discovery: Discovery,
    hfp_status: HfpStatusTable,
}

impl IwrapClient {
    pub(crate) fn new(channel: LineChannel, config: IwrapConfig) -> Self {
        IwrapClient {
            channel,
            config,
            discovery: Discovery::default(),
            hfp_status: HfpStatusTable::new(),
        }
    }

    pub fn config(&self) -> &IwrapConfig {
        &self.config
    }

    /// Devices found by the current or last inquiry.
    pub fn inquired_devices(&self) -> &[DeviceAddress] {
        self.discovery.inquired_devices()
    }

    /// Links reported by the last `LIST`.
    pub fn active_connections(&self) -> &[DeviceAddress] {
        self.discovery.active_connections()
    }

    /// Whether a non-blocking inquiry is in progress.
    pub fn inquiry_running(&self) -> bool {
        self.discovery.inquiry_running()
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        self.channel.write_line(line).await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------

    /// Send `SET <category>[ <option> <value>]`. iWrap gives no confirmation.
    pub async fn set_parameter(
        &mut self,
        category: &str,
        option: Option<&str>,
        value: Option<&str>,
    ) -> Result<()> {
        let line = commands::cmd_set(category, option, value)?;
        self.send(&line).await
    }

    /// Ask the module to print its configuration (bare `SET`).
    ///
    /// The `SET ...` lines that follow are classified by later polls.
    pub async fn request_configuration(&mut self) -> Result<()> {
        self.send(&commands::cmd_read_configuration()).await
    }

    /// Push the fixed bridge configuration: friendly name, HFP-AG profile,
    /// device class, SSP policy, inbound filter, fallback PIN, control flags
    /// and echo off.
    pub async fn push_configuration(&mut self, friendly_name: &str, pin: &str) -> Result<()> {
        if friendly_name.is_empty() || friendly_name.contains(' ') {
            return Err(Error::InvalidParameter(format!(
                "friendly name {friendly_name:?} must be one non-empty token"
            )));
        }
        // validated here so the batch carries a PIN the module accepts
        commands::cmd_set_pin_code(pin)?;

        info!(name = friendly_name, "pushing module configuration");
        for line in commands::configuration_batch(friendly_name, pin) {
            self.send(&line).await?;
        }
        Ok(())
    }

    /// Set the fallback PIN.
    pub async fn set_pin_code(&mut self, pin: &str) -> Result<()> {
        let line = commands::cmd_set_pin_code(pin)?;
        self.send(&line).await
    }

    /// Set the codec ADC and DAC gains.
    pub async fn set_audio_gain(&mut self, adc: &str, dac: &str) -> Result<()> {
        let line = commands::cmd_set_audio_gain(adc, dac)?;
        self.send(&line).await
    }

    /// Forget all pairings.
    pub async fn reset_pairings(&mut self) -> Result<()> {
        info!("resetting Bluetooth pairings");
        self.send(&commands::cmd_reset_pairings()).await
    }

    /// Reboot the module.
    pub async fn reset(&mut self) -> Result<()> {
        self.send(&commands::cmd_reset()).await
    }

    // -----------------------------------------------------------------
    // Blocking exchanges
    // -----------------------------------------------------------------

    /// Probe the module with `AT` and wait for `OK`.
    pub async fn check_available(&mut self) -> Result<()> {
        self.send(&commands::cmd_available()).await?;
        self.channel
            .wait_for_line("OK", self.config.reply_timeout)
            .await?;
        Ok(())
    }

    /// Last six hex digits of the module's own address.
    ///
    /// Falls back to the configured suffix if the module does not answer.
    pub async fn request_device_address_suffix(&mut self) -> Result<String> {
        self.send(&commands::cmd_read_bd_address()).await?;
        let reply = match self
            .channel
            .wait_for_line("SET", self.config.reply_timeout)
            .await
        {
            Ok(reply) => reply,
            Err(Error::Timeout) => {
                warn!(
                    fallback = %self.config.address_suffix_fallback,
                    "no BDADDR reply, using fallback suffix"
                );
                return Ok(self.config.address_suffix_fallback.clone());
            }
            Err(e) => return Err(e),
        };

        match commands::parse_address_suffix(&reply, ADDRESS_SUFFIX_LEN) {
            Ok(suffix) => Ok(suffix),
            Err(e) => {
                warn!(reply = %reply, error = %e, "unexpected BDADDR reply, using fallback suffix");
                Ok(self.config.address_suffix_fallback.clone())
            }
        }
    }

    /// Run an inquiry and wait for all of its results.
    ///
    /// On timeout the inquired list holds whatever arrived before it.
    pub async fn perform_inquiry_blocking(&mut self) -> Result<()> {
        self.discovery.begin_inquiry(false);
        let line = commands::cmd_inquiry(self.config.inquiry_duration, false);
        self.send(&line).await?;

        let header = self
            .channel
            .wait_for_line("INQUIRY", self.config.inquiry_header_timeout)
            .await?;
        let count = commands::parse_count(&header)?;
        debug!(count, "inquiry results announced");

        for _ in 0..count {
            let record = self
                .channel
                .wait_for_line("INQUIRY", self.config.reply_timeout)
                .await?;
            let address = commands::parse_inquiry_address(&record)?;
            self.discovery.add_inquired(address);
        }
        Ok(())
    }

    /// Query the active links and wait for all records.
    pub async fn list_active_connections_blocking(&mut self) -> Result<()> {
        self.discovery.begin_list();
        self.send(&commands::cmd_list()).await?;

        let header = self
            .channel
            .wait_for_line("LIST", self.config.reply_timeout)
            .await?;
        let count = commands::parse_count(&header)?;

        for _ in 0..count {
            let record = self
                .channel
                .wait_for_line("LIST", self.config.reply_timeout)
                .await?;
            let address = commands::parse_list_address(&record)?;
            self.discovery.add_active(address);
        }
        Ok(())
    }

    /// Open an HFP-AG link to `address` and wait until it is ready.
    ///
    /// Pairing requests that arrive while the link comes up are confirmed
    /// automatically for `address`.
    pub async fn connect_hfp_ag(&mut self, address: &DeviceAddress) -> Result<()> {
        self.send(&commands::cmd_call_hfp_ag(address)).await?;
        self.channel
            .wait_for_line("CALL", self.config.reply_timeout)
            .await?;

        let deadline = Instant::now() + self.config.connect_deadline;
        loop {
            let line = self.channel.read_line_or_empty().await?;
            let tokens = tokenize(&line);
            match tokens.as_slice() {
                ["SSP", "CONFIRM", ..] => self.send_ssp_confirmation(address).await?,
                ["CONNECT", ..] => break,
                _ => {}
            }
            if Instant::now() >= deadline {
                warn!(address = %address, "HFP-AG connect deadline passed");
                return Err(Error::Timeout);
            }
        }

        loop {
            let line = self
                .channel
                .wait_for_line("HFP-AG", self.config.reply_timeout)
                .await?;
            if tokenize(&line).get(2) == Some(&"READY") {
                info!(address = %address, "HFP-AG link ready");
                return Ok(());
            }
        }
    }

    /// Announce an outgoing call; the module must answer `HFP-AG 0 CALLING`.
    pub async fn dial(&mut self) -> Result<()> {
        self.send(&commands::cmd_dialing()).await?;
        self.expect_hfp_ag_reply("HFP-AG 0 CALLING").await
    }

    /// Accept the call; the module must answer `HFP-AG 0 CONNECT`.
    pub async fn accept_call(&mut self) -> Result<()> {
        self.send(&commands::cmd_connect()).await?;
        self.expect_hfp_ag_reply("HFP-AG 0 CONNECT").await
    }

    async fn expect_hfp_ag_reply(&mut self, expected: &str) -> Result<()> {
        let reply = self
            .channel
            .wait_for_line("HFP-AG", self.config.reply_timeout)
            .await?;
        if reply != expected {
            warn!(expected, received = %reply, "unexpected HFP-AG reply");
            return Err(Error::UnexpectedReply {
                expected: expected.to_string(),
                received: reply,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Fire-and-forget commands
    // -----------------------------------------------------------------

    /// Start a non-blocking inquiry. Results arrive through polling.
    pub async fn start_inquiry(&mut self) -> Result<()> {
        self.discovery.begin_inquiry(true);
        let line = commands::cmd_inquiry(self.config.inquiry_duration, self.config.inquiry_with_names);
        self.send(&line).await
    }

    /// Send `LIST` without waiting; records arrive through polling.
    pub async fn request_active_connections(&mut self) -> Result<()> {
        self.discovery.begin_list();
        self.send(&commands::cmd_list()).await
    }

    /// Open an HFP-AG link without waiting for it.
    pub async fn request_connect_hfp_ag(&mut self, address: &DeviceAddress) -> Result<()> {
        info!(address = %address, "connecting HFP-AG");
        self.send(&commands::cmd_call_hfp_ag(address)).await
    }

    /// Send a mobile network indicator.
    pub async fn set_status(&mut self, option: &str, value: &str) -> Result<()> {
        self.send(&commands::cmd_status(option, value)).await
    }

    /// End the running call. The call is over once the remote confirms.
    pub async fn hangup(&mut self) -> Result<()> {
        self.send(&commands::cmd_hangup()).await
    }

    /// Accept pairing with `address`.
    pub async fn send_ssp_confirmation(&mut self, address: &DeviceAddress) -> Result<()> {
        info!(address = %address, "confirming pairing");
        self.send(&commands::cmd_ssp_confirm(address)).await
    }

    /// Accept the pairing requested by an `SSP CONFIRM` message.
    pub async fn confirm_pairing(&mut self, message: &Message) -> Result<()> {
        let address = commands::parse_ssp_address(&message.raw)?;
        self.send_ssp_confirmation(&address).await
    }

    /// Tell the hands-free device that a mobile network is available.
    ///
    /// The operator name is pushed unsolicited because some firmware does
    /// not forward the device's own `AT+COPS?`.
    pub async fn announce_network_available(&mut self) -> Result<()> {
        self.set_status("service", "1").await?;
        self.set_status("signal", "5").await?;
        self.send(at::COPS_REPLY).await?;
        self.send("OK").await
    }

    /// Answer an AT command the module forwarded as `HFP-AG ... UNKNOWN`.
    ///
    /// Unknown commands are answered with `ERROR` and reported as
    /// [`Error::Unsupported`].
    pub async fn respond_to_unknown_command(&mut self, message: &Message) -> Result<()> {
        let cmd = at::extract_command(&message.raw)?;
        match at::emulate(&cmd) {
            Some(lines) => {
                debug!(cmd = %cmd, lines = lines.len(), "answering AT command");
                for line in lines {
                    self.send(line).await?;
                }
                Ok(())
            }
            None => {
                info!(cmd = %cmd, "unhandled AT command");
                self.send("ERROR").await?;
                Err(Error::Unsupported(format!("AT command {cmd}")))
            }
        }
    }

    // -----------------------------------------------------------------
    // HFP status
    // -----------------------------------------------------------------

    /// Store an `HFP <link> STATUS "<name>" <value>` report.
    pub fn store_hfp_status(&mut self, line: &str) -> Result<()> {
        self.hfp_status.store(line)
    }

    /// Value last reported for `name` on `link_id`.
    pub fn hfp_status(&self, link_id: LinkId, name: &str) -> Result<i32> {
        self.hfp_status.get(link_id, name)
    }

    // -----------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------

    /// Classify one line without reading from the module.
    pub fn classify(&mut self, line: &str) -> Result<Message> {
        message::classify(line, &mut self.discovery)
    }

    /// Read at most one line and classify it.
    ///
    /// Returns an `Empty` message when nothing is buffered. HFP status
    /// reports are stored and also surface as `Empty`.
    pub async fn poll_message(&mut self) -> Result<Message> {
        let line = self.channel.read_line_or_empty().await?;
        if hfp_status::is_status_line(&line) {
            if let Err(e) = self.hfp_status.store(&line) {
                warn!(line = %line, error = %e, "bad HFP status report");
            }
            return Ok(Message::new(MessageKind::Empty, line));
        }
        self.classify(&line)
    }

    /// Address and friendly name from a `NAME` message.
    pub fn parse_name_result(&self, message: &Message) -> Result<(DeviceAddress, String)> {
        commands::parse_name_result(&message.raw)
    }

    /// Close the line channel.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }
}
