//! Call-control state machine.
//!
//! [`CallControl`] owns the protocol client, the key controller, the status
//! LEDs and the settings store, and advances one step per [`tick`]. A tick
//! polls at most one message from the module, runs the handler of the
//! current [`SessionState`], then updates the key controller.
//!
//! State handlers may call blocking client exchanges. Those only happen
//! outside `CallRunning` (or in direct response to a button press), so PTT
//! timing during a call is never held up by a pending module reply.
//!
//! Protocol failures (timeouts, unexpected replies) are logged and leave the
//! state where it is; the next tick is the retry. Link failures are returned
//! to the driver.
//!
//! [`tick`]: CallControl::tick

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use bttrx_core::{
    BridgeEvent, Button, ButtonEdge, ButtonEvent, Error, Indicator, Result, SessionState, Setting,
    SettingsStore,
};
use bttrx_iwrap::{IwrapClient, MessageKind};

use crate::control;
use crate::key::KeyController;

/// Event channel capacity; slow subscribers see `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// State-machine options.
#[derive(Debug, Clone)]
pub struct CallControlConfig {
    /// Minimum time between two inquiries.
    pub inquiry_interval: Duration,
    /// Connected-LED blink while waiting for a phone.
    pub slow_blink: Duration,
    /// Connected-LED blink while a connect is pending.
    pub fast_blink: Duration,
    /// Busy-LED blink during a call.
    pub busy_blink: Duration,
    /// Friendly name prefix; the module address suffix is appended.
    pub name_prefix: String,
    /// PIN pushed when the stored one is not four digits.
    pub fallback_pin: String,
}

impl Default for CallControlConfig {
    fn default() -> Self {
        Self {
            inquiry_interval: Duration::from_secs(10),
            slow_blink: Duration::from_millis(500),
            fast_blink: Duration::from_millis(250),
            busy_blink: Duration::from_millis(1000),
            name_prefix: "bt-trx-".to_string(),
            fallback_pin: Setting::PinCode.default_value().to_string(),
        }
    }
}

/// The two status LEDs.
pub struct StatusLeds {
    /// Link state: dark, blinking while searching, solid when connected.
    pub connected: Box<dyn Indicator>,
    /// Configuration and call activity.
    pub busy: Box<dyn Indicator>,
}

/// The bridge's session controller.
pub struct CallControl {
    client: IwrapClient,
    settings: Box<dyn SettingsStore>,
    key: KeyController,
    leds: StatusLeds,
    config: CallControlConfig,
    state: SessionState,
    last_inquiry: Option<Instant>,
    /// Module address suffix, fetched once per run.
    address_suffix: Option<String>,
    event_tx: broadcast::Sender<BridgeEvent>,
}

impl CallControl {
    pub fn new(
        client: IwrapClient,
        settings: Box<dyn SettingsStore>,
        key: KeyController,
        leds: StatusLeds,
        config: CallControlConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        CallControl {
            client,
            settings,
            key,
            leds,
            config,
            state: SessionState::Init,
            last_inquiry: None,
            address_suffix: None,
            event_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    pub fn is_keyed(&self) -> bool {
        self.key.is_keyed()
    }

    pub fn client(&self) -> &IwrapClient {
        &self.client
    }

    pub fn settings(&self) -> &dyn SettingsStore {
        self.settings.as_ref()
    }

    /// Subscribe to state, key and status events.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.event_tx.subscribe()
    }

    /// Advance the machine by one step.
    ///
    /// `buttons` holds the edges reported since the previous tick, oldest
    /// first.
    pub async fn tick(&mut self, now: Instant, buttons: &[ButtonEvent]) -> Result<()> {
        let was_keyed = self.key.is_keyed();

        let triple_click = buttons
            .iter()
            .any(|e| e.button == Button::Helper && e.edge == ButtonEdge::TripleClick);
        if triple_click && self.state != SessionState::Init {
            let result = self.client.reset_pairings().await;
            if self.recover(result, "reset pairings")? {
                self.publish(BridgeEvent::Status("pairings cleared".into()));
            }
        }

        match self.state {
            SessionState::Init => self.handle_init().await?,
            SessionState::Configure => self.handle_configure().await?,
            SessionState::Inquiry => self.handle_inquiry(now).await?,
            SessionState::Connecting => self.handle_connecting().await?,
            SessionState::Connected => self.handle_connected(buttons).await?,
            SessionState::CallRunning => self.handle_call_running(buttons, now).await?,
        }

        if self.state != SessionState::CallRunning {
            self.key.unkey();
        }
        self.key.tick(now);
        self.key.check_timeout(self.settings.ptt_timeout_min(), now);

        let keyed = self.key.is_keyed();
        if keyed != was_keyed {
            self.publish(BridgeEvent::KeyChanged { keyed });
        }
        Ok(())
    }

    /// Release the key and close the module link.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.key.is_keyed() {
            self.key.unkey();
            self.publish(BridgeEvent::KeyChanged { keyed: false });
        }
        self.leds.connected.off();
        self.leds.busy.off();
        self.client.close().await
    }

    // -----------------------------------------------------------------
    // State handlers
    // -----------------------------------------------------------------

    async fn handle_init(&mut self) -> Result<()> {
        self.leds.busy.off();
        self.leds.connected.off();

        match self.client.check_available().await {
            Ok(()) => self.set_state(SessionState::Configure),
            Err(Error::Timeout) => warn!("Bluetooth module not reachable"),
            Err(e) => {
                self.recover(Err(e), "availability check")?;
            }
        }
        Ok(())
    }

    async fn handle_configure(&mut self) -> Result<()> {
        self.leds.busy.on();
        self.leds.connected.off();

        self.handle_incoming_message().await?;
        if self.state != SessionState::Configure {
            return Ok(());
        }

        let suffix = match &self.address_suffix {
            Some(suffix) => suffix.clone(),
            None => {
                let suffix = self.client.request_device_address_suffix().await?;
                self.address_suffix = Some(suffix.clone());
                suffix
            }
        };
        let friendly_name = format!("{}{}", self.config.name_prefix, suffix);

        let mut pin = self.settings.pin_code();
        if pin.len() != 4 || !pin.bytes().all(|b| b.is_ascii_digit()) {
            warn!(pin = %pin, "stored PIN unusable, pushing fallback");
            pin = self.config.fallback_pin.clone();
        }

        let result = self.client.push_configuration(&friendly_name, &pin).await;
        if !self.recover(result, "configuration push")? {
            return Ok(());
        }
        let result = self.client.request_configuration().await;
        self.recover(result, "configuration readback")?;

        self.publish(BridgeEvent::Status(friendly_name));
        self.set_state(SessionState::Inquiry);
        Ok(())
    }

    async fn handle_inquiry(&mut self, now: Instant) -> Result<()> {
        self.leds.busy.off();
        self.leds.connected.blink(self.config.slow_blink);

        self.handle_incoming_message().await?;
        if self.state != SessionState::Inquiry {
            return Ok(());
        }

        let due = self
            .last_inquiry
            .map_or(true, |t| now.saturating_duration_since(t) >= self.config.inquiry_interval);
        if due && !self.client.inquiry_running() {
            self.last_inquiry = Some(now);
            // known phones reconnect on their own and show up in LIST
            self.client.request_active_connections().await?;
            self.client.start_inquiry().await?;
            debug!("inquiry started");
        }
        Ok(())
    }

    async fn handle_connecting(&mut self) -> Result<()> {
        self.leds.busy.off();
        self.leds.connected.blink(self.config.fast_blink);

        self.handle_incoming_message().await
    }

    async fn handle_connected(&mut self, buttons: &[ButtonEvent]) -> Result<()> {
        self.leds.connected.on();
        self.leds.busy.off();

        self.handle_incoming_message().await?;
        if self.state != SessionState::Connected {
            return Ok(());
        }

        let dial_requested = buttons.iter().any(|e| e.edge == ButtonEdge::Pressed);
        if dial_requested {
            info!("starting call");
            let result = self.client.dial().await;
            if !self.recover(result, "dial")? {
                return Ok(());
            }
            let result = self.client.accept_call().await;
            if self.recover(result, "accept call")? {
                self.set_state(SessionState::CallRunning);
            }
        }
        Ok(())
    }

    async fn handle_call_running(&mut self, buttons: &[ButtonEvent], now: Instant) -> Result<()> {
        self.leds.connected.on();
        self.leds.busy.blink(self.config.busy_blink);

        self.handle_incoming_message().await?;
        if self.state != SessionState::CallRunning {
            return Ok(());
        }

        let hang_time = self.settings.ptt_hang_time();
        let toggle = self.settings.ptt_toggle_enabled();

        for event in buttons {
            match (event.button, event.edge) {
                (Button::Ptt, ButtonEdge::Pressed) if toggle => self.key.toggle(hang_time, now),
                (Button::Ptt, ButtonEdge::Pressed) => self.key.key(now),
                (Button::Ptt, ButtonEdge::Released) if !toggle => {
                    self.key.request_delayed_unkey(hang_time, now)
                }
                (Button::Helper, ButtonEdge::Pressed) => {
                    // the call ends once the remote side confirms
                    info!("hanging up");
                    let result = self.client.hangup().await;
                    self.recover(result, "hangup")?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Message dispatch
    // -----------------------------------------------------------------

    async fn handle_incoming_message(&mut self) -> Result<()> {
        let msg = match self.client.poll_message().await {
            Ok(msg) => msg,
            Err(e) if e.is_classification_failure() => {
                debug!(error = %e, "dropping line");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match &msg.kind {
            MessageKind::Empty
            | MessageKind::Unknown
            | MessageKind::SettingUnknown
            | MessageKind::ConnectSco
            | MessageKind::NoCarrierCallEnded => {}
            MessageKind::SettingControlGain { adc_gain, dac_gain } => {
                self.store_setting(Setting::AdcGain, adc_gain);
                self.store_setting(Setting::DacGain, dac_gain);
            }
            MessageKind::SettingPinCode { pin } => {
                self.store_setting(Setting::PinCode, pin);
            }
            MessageKind::ListResult { .. } => {
                if !self.client.active_connections().is_empty() {
                    let result = self.client.announce_network_available().await;
                    self.recover(result, "network announcement")?;
                    if matches!(self.state, SessionState::Inquiry | SessionState::Connecting) {
                        self.set_state(SessionState::Connected);
                    }
                }
            }
            MessageKind::InquiryResult { .. } => {
                // an incoming connection may have arrived meanwhile
                if self.state == SessionState::Inquiry {
                    if let Some(address) = self.client.inquired_devices().first().cloned() {
                        self.client.request_connect_hfp_ag(&address).await?;
                        self.set_state(SessionState::Connecting);
                    }
                }
            }
            MessageKind::HfpReady => {
                let result = self.client.announce_network_available().await;
                self.recover(result, "network announcement")?;
                self.set_state(SessionState::Connected);
            }
            MessageKind::HfpCalling => {
                let result = self.client.accept_call().await;
                if self.recover(result, "accept call")? {
                    self.set_state(SessionState::CallRunning);
                }
            }
            MessageKind::HfpDial => {
                info!(line = %msg.raw, "hands-free device dialed");
            }
            MessageKind::HfpNoCarrier => {
                self.set_state(SessionState::Connected);
            }
            MessageKind::HfpUnknownCommand => {
                match self.client.respond_to_unknown_command(&msg).await {
                    Ok(()) | Err(Error::Unsupported(_)) => {}
                    Err(e) => {
                        self.recover(Err(e), "AT emulation")?;
                    }
                }
            }
            MessageKind::NoCarrierLinkLoss => {
                self.set_state(SessionState::Inquiry);
            }
            MessageKind::SspConfirm => {
                let result = self.client.confirm_pairing(&msg).await;
                self.recover(result, "pairing confirmation")?;
            }
            MessageKind::NameResult => match self.client.parse_name_result(&msg) {
                Ok((address, name)) => {
                    info!(address = %address, name = %name, "remote device name");
                    self.publish(BridgeEvent::RemoteName { address, name });
                }
                Err(e) => debug!(error = %e, "bad NAME line"),
            },
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    /// `Ok(true)` on success, `Ok(false)` after logging a protocol failure,
    /// `Err` for a link failure.
    fn recover(&self, result: Result<()>, what: &'static str) -> Result<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_link_failure() => Err(e),
            Err(e) => {
                warn!(state = %self.state, error = %e, "{what} failed");
                Ok(false)
            }
        }
    }

    fn store_setting(&mut self, setting: Setting, value: &str) {
        if let Err(e) = control::apply_setting(self.settings.as_mut(), setting, value) {
            warn!(setting = %setting, value, error = %e, "module reported unusable setting");
        }
    }

    fn set_state(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!(from = %from, to = %to, "state transition");
        self.publish(BridgeEvent::StateChanged { from, to });
    }

    fn publish(&self, event: BridgeEvent) {
        // no subscriber is fine
        let _ = self.event_tx.send(event);
    }
}
