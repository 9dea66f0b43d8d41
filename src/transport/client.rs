//! Outbound command dispatch.
//!
//! [`ZoneTransport`] is the seam to the host control system: implementations
//! translate [`TransportCommand`] values into actual service calls. The
//! bridge itself never awaits results and never retries; a failed call is
//! logged and dropped.

use super::TransportCommand;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("control service rejected command: {0}")]
    Rejected(String),

    #[error("control service unavailable: {0}")]
    Unavailable(String),
}

/// Control-service client surface consumed by the dispatcher.
pub trait ZoneTransport: Send + Sync + 'static {
    fn send(&self, command: &TransportCommand) -> Result<(), TransportError>;
}

/// Default wiring: logs every command it would deliver. Stands in for a
/// real control-service client during development and in stand-alone runs.
pub struct LoggingTransport;

impl ZoneTransport for LoggingTransport {
    fn send(&self, command: &TransportCommand) -> Result<(), TransportError> {
        info!(zone = command.zone(), "zone command: {command:?}");
        Ok(())
    }
}

/// Owns the background task draining the engine's command channel into a
/// [`ZoneTransport`].
pub struct TransportHandle {
    task_handle: JoinHandle<()>,
}

impl TransportHandle {
    pub fn spawn(
        transport: Box<dyn ZoneTransport>,
        mut commands: mpsc::Receiver<TransportCommand>,
    ) -> Self {
        let task_handle = tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                if let Err(e) = transport.send(&command) {
                    // fire-and-forget: no retry, no state to unwind
                    warn!("zone command dropped: {e}");
                }
            }
            debug!("command channel closed, dispatcher stopping");
        });

        Self { task_handle }
    }

    pub fn abort(&self) {
        self.task_handle.abort();
    }
}

pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every dispatched command for test assertions.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        sent: Arc<Mutex<Vec<TransportCommand>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<TransportCommand> {
            self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl ZoneTransport for RecordingTransport {
        fn send(&self, command: &TransportCommand) -> Result<(), TransportError> {
            self.sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(command.clone());
            Ok(())
        }
    }
}
