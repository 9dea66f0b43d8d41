//! Zone transport types: the outbound command vocabulary of the control
//! service and the inbound zone-change notifications.
//!
//! The bridge only speaks this small surface; the wire protocol behind it
//! belongs to the host control system and stays outside this crate (see
//! [`client::ZoneTransport`]).

pub mod client;

pub use client::{LoggingTransport, TransportError, TransportHandle, ZoneTransport};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    PlayPause,
    Next,
    Previous,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAction::PlayPause => write!(f, "playpause"),
            ControlAction::Next => write!(f, "next"),
            ControlAction::Previous => write!(f, "previous"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MuteState {
    Mute,
    #[default]
    Unmute,
}

impl MuteState {
    pub fn toggled(self) -> Self {
        match self {
            MuteState::Mute => MuteState::Unmute,
            MuteState::Unmute => MuteState::Mute,
        }
    }
}

impl fmt::Display for MuteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MuteState::Mute => write!(f, "mute"),
            MuteState::Unmute => write!(f, "unmute"),
        }
    }
}

/// Seek addressing mode. The bridge only ever seeks relative to the current
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    Relative,
}

/// Volume addressing mode. The bridge only ever nudges by a relative step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeMode {
    RelativeStep,
}

/// One fire-and-forget call against the control service, addressed to a
/// configured zone.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Control {
        zone: String,
        action: ControlAction,
    },
    Seek {
        zone: String,
        mode: SeekMode,
        seconds: f32,
    },
    ChangeVolume {
        zone: String,
        mode: VolumeMode,
        delta: f32,
    },
    Mute {
        zone: String,
        state: MuteState,
    },
    ChangeSettings {
        zone: String,
        shuffle: bool,
    },
}

impl TransportCommand {
    pub fn zone(&self) -> &str {
        match self {
            TransportCommand::Control { zone, .. }
            | TransportCommand::Seek { zone, .. }
            | TransportCommand::ChangeVolume { zone, .. }
            | TransportCommand::Mute { zone, .. }
            | TransportCommand::ChangeSettings { zone, .. } => zone,
        }
    }
}

/// State of one zone inside a change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSnapshot {
    /// Output ids belonging to the zone.
    pub outputs: Vec<String>,
    /// Playback state string, `"playing"` while audio runs.
    pub state: String,
}

/// Inbound notification carrying every zone that changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZoneChange {
    pub zones: Vec<ZoneSnapshot>,
}
