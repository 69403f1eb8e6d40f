//! Top-level driver loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bttrx_core::{ButtonEvent, Result};

use crate::fsm::CallControl;

/// Default tick period of the driver loop.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Run `control` until `cancel` fires or the module link fails.
///
/// Button edges received between two ticks are handed to the next tick in
/// arrival order. A tick that is running when `cancel` fires is allowed to
/// finish. The key is released and the link closed before returning.
pub async fn run_bridge(
    control: &mut CallControl,
    mut buttons: mpsc::Receiver<ButtonEvent>,
    tick: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending = Vec::new();

    info!(state = %control.state(), ?tick, "bridge running");
    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            _ = interval.tick() => {}
        }

        while let Ok(event) = buttons.try_recv() {
            pending.push(event);
        }
        if let Err(e) = control.tick(Instant::now(), &pending).await {
            warn!(error = %e, "module link failed");
            break Err(e);
        }
        pending.clear();
    };

    if let Err(e) = control.shutdown().await {
        warn!(error = %e, "shutdown failed");
    }
    info!("bridge stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{CallControlConfig, StatusLeds};
    use crate::key::KeyController;
    use bttrx_core::{Button, Error, MemorySettings, SessionState};
    use bttrx_iwrap::IwrapClientBuilder;
    use bttrx_test_harness::{MockHandle, MockTransport, RecordingIndicator, RecordingKeyOutput};

    fn control(state: SessionState) -> (CallControl, MockHandle, RecordingKeyOutput) {
        let transport = MockTransport::new();
        let mock = transport.handle();
        let client = IwrapClientBuilder::new()
            .build_with_transport(Box::new(transport))
            .unwrap();
        let key_out = RecordingKeyOutput::new();
        let key = KeyController::new(
            Box::new(key_out.clone()),
            Box::new(RecordingIndicator::new()),
        );
        let leds = StatusLeds {
            connected: Box::new(RecordingIndicator::new()),
            busy: Box::new(RecordingIndicator::new()),
        };
        let control = CallControl::new(
            client,
            Box::new(MemorySettings::new()),
            key,
            leds,
            CallControlConfig::default(),
        )
        .with_state(state);
        (control, mock, key_out)
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_releases_key() {
        let (mut control, _mock, key_out) = control(SessionState::CallRunning);
        let (tx, rx) = mpsc::channel(8);
        tx.send(ButtonEvent::pressed(Button::Ptt)).await.unwrap();

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(200)).await;
            stopper.cancel();
        });

        run_bridge(&mut control, rx, DEFAULT_TICK, cancel).await.unwrap();

        assert_eq!(key_out.history(), vec![true, false]);
        assert!(!control.is_keyed());
    }

    #[tokio::test(start_paused = true)]
    async fn walks_from_init_to_configure() {
        let (mut control, mock, _) = control(SessionState::Init);
        mock.expect_line("AT", &["OK"]);
        let (_tx, rx) = mpsc::channel(8);

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        run_bridge(&mut control, rx, DEFAULT_TICK, cancel).await.unwrap();
        assert_ne!(control.state(), SessionState::Init);
        assert_eq!(mock.sent_lines().first().map(String::as_str), Some("AT"));
    }

    #[tokio::test(start_paused = true)]
    async fn link_failure_ends_loop() {
        let (mut control, mock, _) = control(SessionState::Connected);
        mock.set_connected(false);
        let (_tx, rx) = mpsc::channel(8);

        let result = run_bridge(&mut control, rx, DEFAULT_TICK, CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
