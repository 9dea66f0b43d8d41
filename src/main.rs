pub mod device;
pub mod mapping;
pub mod settings;
pub mod status;
pub mod transport;

use crate::device::ConnectionSupervisor;
use crate::mapping::engine::EngineChannels;
use crate::mapping::BridgeEngineHandle;
use crate::settings::Settings;
use crate::status::BridgeStatus;
use crate::transport::{LoggingTransport, TransportHandle, ZoneChange};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let settings = Settings::load().unwrap_or_else(|e| {
        warn!("could not load settings, falling back to defaults: {e}");
        Settings::default()
    });
    // kept alive so the engine's settings feed stays open; a host-driven
    // settings page would push updates through this sender
    let (_settings_tx, settings_rx) = watch::channel(settings);

    let (device_tx, device_rx) = mpsc::channel(256);
    let (led_tx, led_rx) = mpsc::channel(16);
    let (command_tx, command_rx) = mpsc::channel(64);
    // integration seam for the control service's zone notifications; a real
    // client feeds this sender, the standalone binary leaves it idle
    let (_zone_tx, zone_rx) = mpsc::channel::<ZoneChange>(64);
    let (status_tx, status_rx) = watch::channel(BridgeStatus::default());

    let _supervisor = ConnectionSupervisor::spawn(device_tx, led_rx)
        .map_err(|e| eyre!("failed to start device supervisor: {e}"))?;

    let _dispatcher = TransportHandle::spawn(Box::new(LoggingTransport), command_rx);

    let mut engine = BridgeEngineHandle::new("spacenav bridge");
    engine
        .start(EngineChannels {
            device_events: device_rx,
            zone_events: zone_rx,
            commands: command_tx,
            led_writes: led_tx,
            settings: settings_rx,
            status: status_tx,
        })
        .map_err(|e| eyre!("failed to start bridge engine: {e}"))?;

    let _status_task = tokio::spawn(log_status(status_rx));

    wait_for_shutdown().await?;

    // the OS reclaims the device handle, only the engine needs a clean stop
    engine.shutdown().await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
    Ok(())
}

/// Logs every connectivity-status transition.
async fn log_status(mut status: watch::Receiver<BridgeStatus>) {
    while status.changed().await.is_ok() {
        let line = status.borrow().line();
        info!("{line}");
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
        _ = terminate.recv() => info!("terminate received, shutting down"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    Ok(())
}
