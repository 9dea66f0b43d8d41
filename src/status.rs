//! Connectivity status and LED control.
//!
//! Both are pure functions of observed state. The LED frame is the only
//! payload the bridge ever writes back to the device.

use crate::settings::LedMode;
use chrono::{DateTime, Local};

/// First byte of every LED write.
const LED_REPORT_ID: u8 = 0x04;

const LED_ON: u8 = 0x01;
const LED_OFF: u8 = 0x00;

/// Computes the 2-byte LED frame, or `None` when no device is connected
/// (in which case no write is attempted at all).
pub fn led_frame(led: LedMode, playback_state: &str, connected: bool) -> Option<[u8; 2]> {
    if !connected {
        return None;
    }
    let lit = match led {
        LedMode::On => true,
        LedMode::Off => false,
        LedMode::WhenPlaying => playback_state == "playing",
    };
    Some([LED_REPORT_ID, if lit { LED_ON } else { LED_OFF }])
}

/// Connectivity snapshot published to the host control system and the log.
#[derive(Debug, Clone, Default)]
pub struct BridgeStatus {
    pub connected: bool,
    pub device_name: Option<String>,
    pub battery: Option<u8>,
    pub updated: Option<DateTime<Local>>,
}

impl BridgeStatus {
    /// Human-readable status line.
    pub fn line(&self) -> String {
        match (&self.device_name, self.connected) {
            (Some(name), true) => match self.battery {
                Some(level) => format!("Connected to {name}. Battery {level}%."),
                None => format!("Connected to {name}."),
            },
            _ => "Could not find USB device.".to_string(),
        }
    }

    /// True when the status should surface as an error to the host.
    pub fn is_error(&self) -> bool {
        !self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_is_pure_in_when_playing_mode() {
        assert_eq!(
            led_frame(LedMode::WhenPlaying, "playing", true),
            Some([0x04, 0x01])
        );
        assert_eq!(
            led_frame(LedMode::WhenPlaying, "paused", true),
            Some([0x04, 0x00])
        );
    }

    #[test]
    fn led_fixed_modes_ignore_playback_state() {
        assert_eq!(led_frame(LedMode::On, "paused", true), Some([0x04, 0x01]));
        assert_eq!(led_frame(LedMode::Off, "playing", true), Some([0x04, 0x00]));
    }

    #[test]
    fn no_write_when_disconnected() {
        for mode in [LedMode::On, LedMode::WhenPlaying, LedMode::Off] {
            assert_eq!(led_frame(mode, "playing", false), None);
        }
    }

    #[test]
    fn status_line_reflects_connection_and_battery() {
        let mut status = BridgeStatus::default();
        assert_eq!(status.line(), "Could not find USB device.");
        assert!(status.is_error());

        status.connected = true;
        status.device_name = Some("SpaceMouse Wireless".to_string());
        assert_eq!(status.line(), "Connected to SpaceMouse Wireless.");
        assert!(!status.is_error());

        status.battery = Some(73);
        assert_eq!(status.line(), "Connected to SpaceMouse Wireless. Battery 73%.");
    }
}
