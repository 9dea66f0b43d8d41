//! Bridge engine with statum state machine for gesture processing.
//!
//! Runs the [`GestureMapper`] inside a tokio task with a 5-state lifecycle
//! and compile-time state safety. All session state lives in this task, so
//! no event ever races another: each device report is mapped to completion
//! before the next one is taken off the channel.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Configured ──► Active ──► Deactivating ──► Deactivated
//! ```
//!
//! # Data Flow
//!
//! ```text
//! DeviceEvent ──► [GestureMapper] ──► TransportCommand
//!                       │
//! ZoneChange ───────────┴──► LED frame ──► device write sink
//! ```

use crate::device::{DeviceEvent, DeviceIdentity, DeviceReport};
use crate::mapping::{GestureMapper, MappingError, SessionState};
use crate::settings::Settings;
use crate::status::{led_frame, BridgeStatus};
use crate::transport::{TransportCommand, ZoneChange};
use chrono::Local;
use statum::{machine, state};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// States for the bridge engine lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum BridgeEngineState {
    Initializing, // Setting up engine structure
    Configured,   // Settings checked, channels wired
    Active,       // Processing events in main loop
    Deactivating, // Shutting down gracefully
    Deactivated,  // Fully stopped
}

/// Channel bundle wiring the engine into the rest of the bridge.
pub struct EngineChannels {
    pub device_events: mpsc::Receiver<DeviceEvent>,
    pub zone_events: mpsc::Receiver<ZoneChange>,
    pub commands: mpsc::Sender<TransportCommand>,
    pub led_writes: mpsc::Sender<[u8; 2]>,
    pub settings: watch::Receiver<Settings>,
    pub status: watch::Sender<BridgeStatus>,
}

/// Bridge engine with compile-time state safety via statum
#[machine]
pub struct BridgeEngine<S: BridgeEngineState> {
    device_events: mpsc::Receiver<DeviceEvent>,
    zone_events: mpsc::Receiver<ZoneChange>,
    commands: mpsc::Sender<TransportCommand>,
    led_writes: mpsc::Sender<[u8; 2]>,
    settings: watch::Receiver<Settings>,
    status: watch::Sender<BridgeStatus>,
    mapper: GestureMapper,
    session: SessionState,
    connected: Option<DeviceIdentity>,
}

impl BridgeEngine<Initializing> {
    pub fn create(channels: EngineChannels) -> Self {
        info!("initializing bridge engine");

        Self::new(
            channels.device_events,
            channels.zone_events,
            channels.commands,
            channels.led_writes,
            channels.settings,
            channels.status,
            GestureMapper,
            SessionState::default(),
            None, // connected
        )
    }

    /// Checks the loaded settings and transitions to Configured.
    pub fn configure(self) -> BridgeEngine<Configured> {
        if self.settings.borrow().zone.is_none() {
            warn!("no zone configured, gestures will be ignored until one is selected");
        }
        self.transition()
    }
}

impl BridgeEngine<Configured> {
    pub fn activate(self) -> BridgeEngine<Active> {
        info!("activating bridge engine");
        self.transition()
    }
}

impl BridgeEngine<Active> {
    /// Main processing loop with graceful shutdown support.
    ///
    /// Runs until the shutdown signal fires or the device event channel
    /// closes. Individual mapping failures never stop the loop.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<BridgeEngine<Deactivating>, MappingError> {
        info!("bridge engine processing events");

        let mut zone_feed_live = true;
        let mut settings_live = true;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("shutdown signal received");
                    break;
                }

                maybe = self.device_events.recv() => match maybe {
                    Some(event) => self.handle_device_event(event),
                    None => {
                        warn!("device event channel closed, stopping engine");
                        break;
                    }
                },

                maybe = self.zone_events.recv(), if zone_feed_live => match maybe {
                    Some(change) => self.handle_zone_change(change),
                    None => {
                        // inbound notifications are optional wiring
                        debug!("zone notification feed closed");
                        zone_feed_live = false;
                    }
                },

                changed = self.settings.changed(), if settings_live => match changed {
                    Ok(()) => {
                        debug!("settings updated");
                        self.refresh_led();
                    }
                    Err(_) => settings_live = false,
                },
            }
        }

        Ok(self.transition())
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Connected { identity } => {
                info!(device = identity.name, "device connected");
                self.connected = Some(identity);
                self.publish_status();
                self.refresh_led();
            }
            DeviceEvent::Disconnected => {
                warn!("device disconnected");
                self.connected = None;
                self.publish_status();
            }
            DeviceEvent::Report(report) => self.handle_report(report),
        }
    }

    fn handle_report(&mut self, report: DeviceReport) {
        let settings = self.settings.borrow().clone();
        match report {
            DeviceReport::Translation(sample) => {
                let command = self.mapper.on_translation(sample, &settings, &mut self.session);
                self.dispatch(command);
            }
            DeviceReport::Rotation(sample) => {
                let command = self.mapper.on_rotation(sample, &settings, &mut self.session);
                self.dispatch(command);
            }
            DeviceReport::Motion {
                translation,
                rotation,
            } => {
                // translation first: the shared debounce clock then decides
                // whether the rotation half still gets through
                let command = self
                    .mapper
                    .on_translation(translation, &settings, &mut self.session);
                self.dispatch(command);
                let command = self
                    .mapper
                    .on_rotation(rotation, &settings, &mut self.session);
                self.dispatch(command);
            }
            DeviceReport::Button(side) => {
                let command = self.mapper.on_button(side, &settings, &mut self.session);
                self.dispatch(command);
            }
            DeviceReport::Battery(level) => {
                debug!(level, "battery report");
                self.session.battery = Some(level);
                self.publish_status();
            }
            DeviceReport::Unknown => {}
        }
    }

    fn handle_zone_change(&mut self, change: ZoneChange) {
        let settings = self.settings.borrow().clone();
        if self
            .mapper
            .on_zone_changed(&change, &settings, &mut self.session)
        {
            self.refresh_led();
        }
    }

    /// Fire-and-forget handoff to the transport dispatcher.
    fn dispatch(&self, command: Option<TransportCommand>) {
        let Some(command) = command else { return };
        if let Err(e) = self.commands.try_send(command) {
            warn!("zone command dropped, dispatcher not keeping up: {e}");
        }
    }

    fn refresh_led(&self) {
        let settings = self.settings.borrow().clone();
        let frame = led_frame(
            settings.led,
            &self.session.playback_state,
            self.connected.is_some(),
        );
        if let Some(frame) = frame {
            if let Err(e) = self.led_writes.try_send(frame) {
                debug!("LED write not delivered: {e}");
            }
        }
    }

    fn publish_status(&self) {
        let status = BridgeStatus {
            connected: self.connected.is_some(),
            device_name: self.connected.map(|identity| identity.name.to_string()),
            battery: self.session.battery,
            updated: Some(Local::now()),
        };
        info!("{}", status.line());
        if self.status.send(status).is_err() {
            debug!("no status subscribers");
        }
    }
}

impl BridgeEngine<Deactivating> {
    pub fn shutdown(self) -> BridgeEngine<Deactivated> {
        info!("bridge engine shut down");
        self.transition()
    }
}

impl BridgeEngine<Deactivated> {}

/// Handle for managing the bridge engine in a tokio task.
///
/// Handles task spawning, graceful shutdown, and resource cleanup.
#[derive(Debug)]
pub struct BridgeEngineHandle {
    pub name: String,
    task_handle: Option<JoinHandle<Result<(), MappingError>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl BridgeEngineHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Creates, configures and activates the engine, then spawns its
    /// processing loop in a background task.
    pub fn start(&mut self, channels: EngineChannels) -> Result<(), MappingError> {
        if self.task_handle.is_some() {
            return Err(MappingError::InitializationError(format!(
                "engine already running: {}",
                self.name
            )));
        }

        let active_engine = BridgeEngine::create(channels).configure().activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let engine_name = self.name.clone();
        let task_handle = tokio::spawn(async move {
            match active_engine.run_until_shutdown(shutdown_rx).await {
                Ok(deactivating_engine) => {
                    let _ = deactivating_engine.shutdown();
                    info!("engine stopped: {engine_name}");
                    Ok(())
                }
                Err(e) => {
                    error!("engine failed: {engine_name} - {e}");
                    Err(e)
                }
            }
        });
        self.task_handle = Some(task_handle);

        info!("bridge engine started: {}", self.name);
        Ok(())
    }

    /// Gracefully shuts down the engine and waits for task completion.
    pub async fn shutdown(&mut self) -> Result<(), MappingError> {
        debug!("sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("engine task panicked: {} - {e}", self.name);
                    Err(MappingError::ThreadError(format!(
                        "engine task panicked: {e}"
                    )))
                }
            }
        } else {
            debug!("engine already shut down: {}", self.name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AxisSample, KNOWN_DEVICES};
    use crate::settings::LedMode;
    use crate::transport::ZoneSnapshot;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Harness {
        device_tx: mpsc::Sender<DeviceEvent>,
        zone_tx: mpsc::Sender<ZoneChange>,
        command_rx: mpsc::Receiver<TransportCommand>,
        led_rx: mpsc::Receiver<[u8; 2]>,
        status_rx: watch::Receiver<BridgeStatus>,
        _settings_tx: watch::Sender<Settings>,
        handle: BridgeEngineHandle,
    }

    fn start_engine(settings: Settings) -> Harness {
        let (device_tx, device_events) = mpsc::channel(16);
        let (zone_tx, zone_events) = mpsc::channel(16);
        let (commands, command_rx) = mpsc::channel(16);
        let (led_writes, led_rx) = mpsc::channel(16);
        let (settings_tx, settings_rx) = watch::channel(settings);
        let (status, status_rx) = watch::channel(BridgeStatus::default());

        let mut handle = BridgeEngineHandle::new("test engine");
        handle
            .start(EngineChannels {
                device_events,
                zone_events,
                commands,
                led_writes,
                settings: settings_rx,
                status,
            })
            .unwrap();

        Harness {
            device_tx,
            zone_tx,
            command_rx,
            led_rx,
            status_rx,
            _settings_tx: settings_tx,
            handle,
        }
    }

    async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> T {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn connect_publishes_status_and_lights_led() {
        let settings = Settings {
            zone: Some("Z".to_string()),
            led: LedMode::On,
            ..Settings::default()
        };
        let mut harness = start_engine(settings);

        harness
            .device_tx
            .send(DeviceEvent::Connected {
                identity: KNOWN_DEVICES[3],
            })
            .await
            .unwrap();

        assert_eq!(recv(&mut harness.led_rx).await, [0x04, 0x01]);
        assert!(harness.status_rx.borrow().connected);

        harness.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn translation_report_turns_into_a_seek_command() {
        let settings = Settings {
            zone: Some("Z".to_string()),
            ..Settings::default()
        };
        let mut harness = start_engine(settings);

        harness
            .device_tx
            .send(DeviceEvent::Report(DeviceReport::Translation(AxisSample {
                x: 0.3,
                y: 0.1,
                z: 0.0,
            })))
            .await
            .unwrap();

        match recv(&mut harness.command_rx).await {
            TransportCommand::Seek { zone, seconds, .. } => {
                assert_eq!(zone, "Z");
                assert!((seconds - -1.5).abs() < 1e-6);
            }
            other => panic!("unexpected command {other:?}"),
        }

        harness.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn playback_state_change_refreshes_the_led() {
        let settings = Settings {
            zone: Some("Z".to_string()),
            led: LedMode::WhenPlaying,
            ..Settings::default()
        };
        let mut harness = start_engine(settings);

        harness
            .device_tx
            .send(DeviceEvent::Connected {
                identity: KNOWN_DEVICES[2],
            })
            .await
            .unwrap();
        // nothing playing yet
        assert_eq!(recv(&mut harness.led_rx).await, [0x04, 0x00]);

        harness
            .zone_tx
            .send(ZoneChange {
                zones: vec![ZoneSnapshot {
                    outputs: vec!["Z".to_string()],
                    state: "playing".to_string(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(recv(&mut harness.led_rx).await, [0x04, 0x01]);

        harness.handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn battery_report_surfaces_in_status() {
        let settings = Settings {
            zone: Some("Z".to_string()),
            ..Settings::default()
        };
        let mut harness = start_engine(settings);

        harness
            .device_tx
            .send(DeviceEvent::Connected {
                identity: KNOWN_DEVICES[0],
            })
            .await
            .unwrap();
        harness
            .device_tx
            .send(DeviceEvent::Report(DeviceReport::Battery(55)))
            .await
            .unwrap();

        let mut status_rx = harness.status_rx.clone();
        let seen = timeout(Duration::from_secs(1), async {
            loop {
                status_rx.changed().await.unwrap();
                let status = status_rx.borrow().clone();
                if status.battery == Some(55) {
                    break status;
                }
            }
        })
        .await
        .expect("timed out waiting for battery status");
        assert!(seen.line().contains("Battery 55%"));

        harness.handle.shutdown().await.unwrap();
    }
}
