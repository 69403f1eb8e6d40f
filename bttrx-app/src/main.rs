// bttrx -- bridge a Bluetooth hands-free device to a radio's PTT line
// through a WT32i module running iWrap.
//
// Usage:
//   bttrx --port /dev/ttyS1 run --key-port /dev/ttyUSB0 --key-line rts
//   bttrx --port /dev/ttyS1 probe
//   bttrx --port /dev/ttyS1 inquiry
//   bttrx --port /dev/ttyS1 monitor --duration 60
//   bttrx --settings bttrx.json settings set ptt_hang_time_ms 500
//   bttrx --settings bttrx.json settings list

mod console;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bttrx_bridge::control::{apply_setting, read_setting};
use bttrx_bridge::{
    run_bridge, CallControl, CallControlConfig, KeyController, StatusLeds, DEFAULT_TICK,
};
use bttrx_core::{
    JsonFileSettings, KeyLine, KeyOutput, MemorySettings, NullKeyOutput, Setting, SettingsStore,
};
use bttrx_iwrap::{IwrapClient, IwrapClientBuilder, MessageKind};
use bttrx_transport::serial::DEFAULT_BAUD_RATE;
use bttrx_transport::SerialKeyLine;

use crate::console::LogIndicator;

const DEFAULT_TICK_MS: u64 = DEFAULT_TICK.as_millis() as u64;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// bt-trx -- HFP to PTT bridge for iWrap Bluetooth modules.
#[derive(Parser)]
#[command(name = "bttrx", version, about)]
struct Cli {
    /// Serial port of the Bluetooth module (e.g. /dev/ttyS1).
    /// Required for every command except `settings`.
    #[arg(long, env = "BTTRX_PORT")]
    port: Option<String>,

    /// Baud rate of the Bluetooth module.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// JSON settings file. Without it settings live in memory only.
    #[arg(long, env = "BTTRX_SETTINGS")]
    settings: Option<PathBuf>,

    /// Log level for the bridge crates; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bridge. Stdin: p/r = PTT press/release, h = helper, hhh = pairing reset.
    Run {
        /// Serial port whose RTS or DTR line keys the radio.
        #[arg(long)]
        key_port: Option<String>,

        /// Control line used as the transmit key.
        #[arg(long, value_enum, default_value_t = KeyLineArg::Rts)]
        key_line: KeyLineArg,

        /// Tick period in milliseconds.
        #[arg(long, default_value_t = DEFAULT_TICK_MS)]
        tick_ms: u64,
    },

    /// Check that the module answers and print its address suffix.
    Probe,

    /// Run a blocking inquiry and print the devices found.
    Inquiry,

    /// Print the active Bluetooth links.
    List,

    /// Forget all pairings stored in the module.
    ResetPairings,

    /// Print every line from the module with its classification.
    Monitor {
        /// Duration in seconds (0 = run until Ctrl-C).
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Read or change bridge settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print one setting.
    Get { name: String },
    /// Change one setting.
    Set { name: String, value: String },
    /// Print all settings.
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyLineArg {
    Rts,
    Dtr,
}

impl From<KeyLineArg> for KeyLine {
    fn from(arg: KeyLineArg) -> Self {
        match arg {
            KeyLineArg::Rts => KeyLine::Rts,
            KeyLineArg::Dtr => KeyLine::Dtr,
        }
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "bttrx={level},bttrx_core={level},bttrx_transport={level},\
             bttrx_line_io={level},bttrx_iwrap={level},bttrx_bridge={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn open_settings(path: Option<&PathBuf>) -> Result<Box<dyn SettingsStore>> {
    match path {
        Some(path) => {
            let store = JsonFileSettings::open(path)
                .with_context(|| format!("failed to open settings {}", path.display()))?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(MemorySettings::new())),
    }
}

async fn connect(cli: &Cli) -> Result<IwrapClient> {
    let Some(port) = cli.port.as_deref() else {
        bail!("--port is required for this command");
    };
    IwrapClientBuilder::new()
        .serial_port(port)
        .baud_rate(cli.baud)
        .build()
        .await
        .with_context(|| format!("failed to open module port {port}"))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
        }
        token.cancel();
    });
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_run(
    cli: &Cli,
    key_port: Option<&str>,
    key_line: KeyLine,
    tick: Duration,
) -> Result<()> {
    let settings = open_settings(cli.settings.as_ref())?;
    let client = connect(cli).await?;

    let key_output: Box<dyn KeyOutput> = match key_port {
        Some(port) => Box::new(
            SerialKeyLine::open(port, key_line)
                .with_context(|| format!("failed to open key port {port}"))?,
        ),
        None => {
            warn!("no --key-port given, transmit key is not connected");
            Box::new(NullKeyOutput)
        }
    };
    let key = KeyController::new(key_output, Box::new(LogIndicator::new("ptt")));
    let leds = StatusLeds {
        connected: Box::new(LogIndicator::new("connected")),
        busy: Box::new(LogIndicator::new("busy")),
    };

    let mut control = CallControl::new(client, settings, key, leds, CallControlConfig::default());
    tokio::spawn(console::display_events(control.subscribe()));

    let (button_tx, button_rx) = mpsc::channel(16);
    std::thread::spawn(move || console::read_buttons(button_tx));

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    run_bridge(&mut control, button_rx, tick, cancel)
        .await
        .context("bridge stopped")
}

async fn cmd_probe(cli: &Cli) -> Result<()> {
    let mut client = connect(cli).await?;
    client
        .check_available()
        .await
        .context("module did not answer AT")?;
    let suffix = client.request_device_address_suffix().await?;
    println!("module available, address suffix {suffix}");
    client.close().await?;
    Ok(())
}

async fn cmd_inquiry(cli: &Cli) -> Result<()> {
    let mut client = connect(cli).await?;
    println!("Inquiry running...");
    let result = client.perform_inquiry_blocking().await;

    let devices = client.inquired_devices();
    if devices.is_empty() {
        println!("No devices found.");
    }
    for address in devices {
        println!("  {address}");
    }
    client.close().await?;
    result.context("inquiry incomplete")
}

async fn cmd_list(cli: &Cli) -> Result<()> {
    let mut client = connect(cli).await?;
    let result = client.list_active_connections_blocking().await;

    let links = client.active_connections();
    println!("{} active link(s)", links.len());
    for address in links {
        println!("  {address}");
    }
    client.close().await?;
    result.context("LIST incomplete")
}

async fn cmd_reset_pairings(cli: &Cli) -> Result<()> {
    let mut client = connect(cli).await?;
    client.reset_pairings().await?;
    println!("Pairings cleared.");
    client.close().await?;
    Ok(())
}

async fn cmd_monitor(cli: &Cli, duration_secs: u64) -> Result<()> {
    let mut client = connect(cli).await?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    println!("Monitoring module output (Ctrl-C to stop)...");
    let deadline = (duration_secs > 0).then(|| Instant::now() + Duration::from_secs(duration_secs));

    while !cancel.is_cancelled() {
        if deadline.is_some_and(|dl| Instant::now() >= dl) {
            println!("Monitor duration elapsed.");
            break;
        }
        match client.poll_message().await {
            Ok(msg) if msg.is_empty() && msg.raw.is_empty() => {}
            Ok(msg) => println!("[{:?}] {}", msg.kind, msg.raw),
            Err(e) if e.is_classification_failure() => {
                println!("[{:?}] {e}", MessageKind::Unknown);
            }
            Err(e) => return Err(e).context("module link failed"),
        }
    }
    client.close().await?;
    Ok(())
}

fn cmd_settings(cli: &Cli, action: &SettingsAction) -> Result<()> {
    let mut store = open_settings(cli.settings.as_ref())?;
    match action {
        SettingsAction::Get { name } => {
            let setting: Setting = name.parse()?;
            println!("{}", read_setting(store.as_ref(), setting));
        }
        SettingsAction::Set { name, value } => {
            if cli.settings.is_none() {
                bail!("--settings is required to change a setting");
            }
            let setting: Setting = name.parse()?;
            apply_setting(store.as_mut(), setting, value)?;
            println!("{setting} = {}", read_setting(store.as_ref(), setting));
        }
        SettingsAction::List => {
            for setting in Setting::ALL {
                println!("{:<20} {}", setting.key(), read_setting(store.as_ref(), setting));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match &cli.command {
        Command::Run {
            key_port,
            key_line,
            tick_ms,
        } => {
            cmd_run(
                &cli,
                key_port.as_deref(),
                KeyLine::from(*key_line),
                Duration::from_millis(*tick_ms),
            )
            .await
        }
        Command::Probe => cmd_probe(&cli).await,
        Command::Inquiry => cmd_inquiry(&cli).await,
        Command::List => cmd_list(&cli).await,
        Command::ResetPairings => cmd_reset_pairings(&cli).await,
        Command::Monitor { duration } => cmd_monitor(&cli, *duration).await,
        Command::Settings { action } => cmd_settings(&cli, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_options() {
        let cli = Cli::try_parse_from([
            "bttrx",
            "--port",
            "/dev/ttyS1",
            "run",
            "--key-port",
            "/dev/ttyUSB0",
            "--key-line",
            "dtr",
        ])
        .unwrap();
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyS1"));
        assert_eq!(cli.baud, 115_200);
        match cli.command {
            Command::Run {
                key_port,
                key_line,
                tick_ms,
            } => {
                assert_eq!(key_port.as_deref(), Some("/dev/ttyUSB0"));
                assert_eq!(KeyLine::from(key_line), KeyLine::Dtr);
                assert_eq!(Duration::from_millis(tick_ms), DEFAULT_TICK);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parses_settings_set() {
        let cli = Cli::try_parse_from(["bttrx", "settings", "set", "pin_code", "4711"]).unwrap();
        assert!(cli.port.is_none());
        assert!(matches!(
            cli.command,
            Command::Settings {
                action: SettingsAction::Set { .. }
            }
        ));
    }

    #[test]
    fn settings_set_requires_file() {
        let cli = Cli::try_parse_from(["bttrx", "settings", "set", "pin_code", "4711"]).unwrap();
        let Command::Settings { action } = &cli.command else {
            panic!("expected settings");
        };
        assert!(cmd_settings(&cli, action).is_err());
    }
}
