//! Gesture-to-command mapping.
//!
//! Decoded device reports flow through the [`GestureMapper`], which reads the
//! current [`Settings`](crate::settings::Settings) and a mutable
//! [`SessionState`] and emits at most one transport command per report. The
//! [`engine`] module runs the mapper inside a lifecycle-typed tokio task.

pub mod engine;
pub mod error;
pub mod gesture;

pub use engine::{BridgeEngine, BridgeEngineHandle, BridgeEngineState};
pub use error::MappingError;
pub use gesture::GestureMapper;

use crate::transport::MuteState;
use std::time::{Duration, Instant};

/// Shared debounce clock: one monotonic timestamp gates every rate-limited
/// gesture class, so volume, seek and play-pause never fight over the same
/// physical motion inside one window.
#[derive(Debug, Clone)]
pub struct DebounceClock {
    last_action: Instant,
}

impl DebounceClock {
    pub fn new() -> Self {
        // start in the past so the first gesture is never swallowed
        Self {
            last_action: Instant::now() - Duration::from_secs(1),
        }
    }

    /// True when more than `window` has elapsed since the last dispatch.
    pub fn ready(&self, window: Duration) -> bool {
        self.last_action.elapsed() > window
    }

    pub fn touch(&mut self) {
        self.last_action = Instant::now();
    }
}

impl Default for DebounceClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-lifetime mapper state, owned by the engine task and passed
/// explicitly into every mapper call.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub mute: MuteState,
    pub shuffle: bool,
    pub clock: DebounceClock,
    /// Last playback state string seen for the configured zone.
    pub playback_state: String,
    /// Last battery level report, for battery-capable devices.
    pub battery: Option<u8>,
}
