// Console stand-ins for the hardware around the bridge: button edges typed
// on stdin, LEDs reported through the log, events printed to stdout.

use std::io::BufRead;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use bttrx_core::{BridgeEvent, Button, ButtonEdge, ButtonEvent, Indicator, IndicatorMode};

/// Map one console line to button edges.
///
/// `p` presses PTT, `r` releases it, `h` clicks the helper button and `hhh`
/// triple-clicks it.
pub fn parse_button_command(line: &str) -> Option<Vec<ButtonEvent>> {
    let events = match line.trim() {
        "p" => vec![ButtonEvent::pressed(Button::Ptt)],
        "r" => vec![ButtonEvent::released(Button::Ptt)],
        "h" => vec![
            ButtonEvent::pressed(Button::Helper),
            ButtonEvent::released(Button::Helper),
        ],
        "hhh" => vec![ButtonEvent::new(Button::Helper, ButtonEdge::TripleClick)],
        _ => return None,
    };
    Some(events)
}

/// Forward stdin button commands until stdin closes or the bridge stops.
///
/// Blocks on stdin; run it on its own thread so a pending read never holds
/// up runtime shutdown.
pub fn read_buttons(tx: mpsc::Sender<ButtonEvent>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "stdin closed");
                break;
            }
        };
        let Some(events) = parse_button_command(&line) else {
            println!("commands: p (PTT press), r (PTT release), h (helper), hhh (pairing reset)");
            continue;
        };
        for event in events {
            if tx.blocking_send(event).is_err() {
                return;
            }
        }
    }
}

/// Print bridge events until the channel closes.
pub async fn display_events(mut rx: broadcast::Receiver<BridgeEvent>) {
    loop {
        match rx.recv().await {
            Ok(BridgeEvent::StateChanged { from, to }) => println!("[state] {from} -> {to}"),
            Ok(BridgeEvent::KeyChanged { keyed: true }) => println!("[ptt] TX"),
            Ok(BridgeEvent::KeyChanged { keyed: false }) => println!("[ptt] RX"),
            Ok(BridgeEvent::RemoteName { address, name }) => println!("[remote] {address} {name}"),
            Ok(BridgeEvent::Status(text)) => println!("[status] {text}"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                println!("[warning] missed {n} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// An LED that reports mode changes in the log.
pub struct LogIndicator {
    name: &'static str,
    mode: Option<IndicatorMode>,
}

impl LogIndicator {
    pub fn new(name: &'static str) -> Self {
        Self { name, mode: None }
    }
}

impl Indicator for LogIndicator {
    fn set_mode(&mut self, mode: IndicatorMode) {
        if self.mode == Some(mode) {
            return;
        }
        self.mode = Some(mode);
        match mode {
            IndicatorMode::Off => info!(led = self.name, "off"),
            IndicatorMode::On => info!(led = self.name, "on"),
            IndicatorMode::Blink(interval) => {
                info!(led = self.name, interval_ms = millis(interval), "blink")
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
