//! Device lifecycle: discovery, open, blocking I/O loop, reconnect policy.
//!
//! A 1-second timer drives discovery while no device is open. Once a device
//! opens, its handle moves into a blocking I/O task that decodes reports and
//! forwards them to the engine; any read or write failure ends that task and
//! discovery resumes on the next tick.
//!
//! Wireless dongles flagged `restart_on_reconnect` silently vanish from the
//! bus on sleep/wake and do not reopen reliably in place. When such a dongle
//! reappears after a drop the process exits and lets the service manager
//! start it fresh. The reappearance check only trusts a fresh enumeration:
//! the backend caches its device list, and right after a drop that cache
//! still lists the dongle.
//!
//! All hardware access goes through the [`hid`](super::hid) traits so the
//! lifecycle is testable without a physical device.

use super::hid::{HidPort, HidTransport};
use super::report::{self, DeviceReport};
use super::{Capabilities, DeviceError, DeviceEvent, DeviceIdentity, KNOWN_DEVICES};
use hidapi::HidApi;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const PROBE_INTERVAL: Duration = Duration::from_secs(1);
const READ_TIMEOUT_MS: i32 = 100;

/// Supervisor connection state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Absent,
    Probing,
    Connected,
}

/// Why the supervisor loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitReason {
    /// The engine side of the event channel is gone.
    EngineGone,
    /// A restart-flagged dongle reappeared after a drop.
    ForceRestart,
}

/// Owns the HID port and the device handle lifecycle.
pub struct ConnectionSupervisor<P: HidPort> {
    port: P,
    events: mpsc::Sender<DeviceEvent>,
    led_writes: Option<mpsc::Receiver<[u8; 2]>>,
    state: ConnectionState,
    /// Identity of a dropped restart-flagged device, watched for reappearing.
    stale: Option<DeviceIdentity>,
    probe_interval: Duration,
}

impl ConnectionSupervisor<HidApi> {
    /// Initializes the HID backend and spawns the supervisor task.
    pub fn spawn(
        events: mpsc::Sender<DeviceEvent>,
        led_writes: mpsc::Receiver<[u8; 2]>,
    ) -> Result<JoinHandle<()>, DeviceError> {
        let api = HidApi::new()?;
        let supervisor = Self::with_port(api, events, led_writes, PROBE_INTERVAL);
        Ok(tokio::spawn(supervisor.run()))
    }
}

impl<P: HidPort> ConnectionSupervisor<P> {
    pub fn with_port(
        port: P,
        events: mpsc::Sender<DeviceEvent>,
        led_writes: mpsc::Receiver<[u8; 2]>,
        probe_interval: Duration,
    ) -> Self {
        Self {
            port,
            events,
            led_writes: Some(led_writes),
            state: ConnectionState::Absent,
            stale: None,
            probe_interval,
        }
    }

    async fn run(self) {
        match self.run_inner().await {
            ExitReason::EngineGone => debug!("engine gone, supervisor stopping"),
            ExitReason::ForceRestart => {
                // in-place reopen is unreliable on this hardware; the
                // service manager brings the process back fresh
                std::process::exit(0);
            }
        }
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "connection state");
            self.state = next;
        }
    }

    async fn run_inner(mut self) -> ExitReason {
        let mut ticker = tokio::time::interval(self.probe_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            // probe until something opens
            let (identity, device) = loop {
                ticker.tick().await;
                self.set_state(ConnectionState::Probing);

                if let Some(stale) = self.stale {
                    // the cached device list still carries the dongle from
                    // before the drop; re-enumerate before trusting it
                    match self.port.refresh() {
                        Ok(()) if self.port.present(&stale) => {
                            warn!(
                                device = stale.name,
                                "dongle reappeared after an unreliable drop, forcing process restart"
                            );
                            return ExitReason::ForceRestart;
                        }
                        Ok(()) => {}
                        Err(e) => warn!("enumeration failed, skipping reappearance check: {e}"),
                    }
                }

                match self.probe() {
                    Ok(found) => break found,
                    Err(DeviceError::NotFound) => {
                        self.set_state(ConnectionState::Absent);
                        debug!("no supported device present");
                    }
                    Err(e) => {
                        self.set_state(ConnectionState::Absent);
                        warn!("device discovery failed: {e}");
                    }
                }
            };

            self.set_state(ConnectionState::Connected);
            self.stale = None;
            if self
                .events
                .send(DeviceEvent::Connected { identity })
                .await
                .is_err()
            {
                return ExitReason::EngineGone;
            }

            // the blocking task owns the device until I/O fails
            let events = self.events.clone();
            let caps = identity.caps;
            let mut led_rx = match self.led_writes.take() {
                Some(rx) => rx,
                None => {
                    // lost to an earlier panic; run without LED writes
                    let (_tx, rx) = mpsc::channel(1);
                    rx
                }
            };
            let io_task = tokio::task::spawn_blocking(move || {
                io_loop(device, caps, &events, &mut led_rx);
                led_rx
            });

            match io_task.await {
                Ok(led_rx) => self.led_writes = Some(led_rx),
                Err(e) => error!("device I/O task panicked: {e}"),
            }

            self.set_state(ConnectionState::Absent);
            if identity.caps.restart_on_reconnect {
                self.stale = Some(identity);
            }
            if self.events.send(DeviceEvent::Disconnected).await.is_err() {
                return ExitReason::EngineGone;
            }
        }
    }

    /// Walks the identity table in priority order and opens the first match.
    fn probe(&mut self) -> Result<(DeviceIdentity, P::Device), DeviceError> {
        self.port.refresh()?;

        for identity in KNOWN_DEVICES {
            if !self.port.present(identity) {
                continue;
            }
            match self.port.open_device(identity) {
                Ok(device) => {
                    info!(device = identity.name, "device found");
                    return Ok((*identity, device));
                }
                Err(e) => {
                    warn!(device = identity.name, "open failed: {e}");
                }
            }
        }

        Err(DeviceError::NotFound)
    }
}

/// Reads reports and drains LED writes until the device errors out.
///
/// Runs on the blocking pool: `read_report` times out internally, which
/// keeps the loop responsive to pending LED writes without spinning.
fn io_loop<D: HidTransport>(
    device: D,
    caps: Capabilities,
    events: &mpsc::Sender<DeviceEvent>,
    led_writes: &mut mpsc::Receiver<[u8; 2]>,
) {
    let mut buf = [0u8; 32];

    loop {
        while let Ok(frame) = led_writes.try_recv() {
            if let Err(e) = device.write_report(&frame) {
                warn!("LED write failed: {e}");
                return;
            }
        }

        match device.read_report(&mut buf, READ_TIMEOUT_MS) {
            Ok(0) => continue,
            Ok(n) => {
                let decoded = report::decode(&buf[..n], &caps);
                if decoded == DeviceReport::Unknown {
                    continue;
                }
                if events.blocking_send(DeviceEvent::Report(decoded)).is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("device read failed: {e}");
                return;
            }
        }
    }
}
