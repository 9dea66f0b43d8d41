//! The gesture mapper: translation, rotation, button and zone-change
//! handling.
//!
//! Every entry point takes the current settings plus the mutable session
//! state and returns at most one [`TransportCommand`]. Without a configured
//! zone nothing is ever emitted. A translation event is first checked
//! against the seek axis, and only if that stays below threshold may the raw
//! Y deflection trigger the press-down action.

use crate::device::{AxisSample, ButtonSide};
use crate::mapping::SessionState;
use crate::settings::{AxisSelect, ButtonAction, Settings};
use crate::transport::{
    ControlAction, SeekMode, TransportCommand, VolumeMode, ZoneChange,
};
use std::time::Duration;
use tracing::trace;

/// Minimum gap between two seek dispatches.
const SEEK_DEBOUNCE: Duration = Duration::from_millis(50);
/// Minimum gap before a press-down action fires again.
const PLAY_PAUSE_DEBOUNCE: Duration = Duration::from_millis(500);
/// Minimum gap between two volume nudges.
const VOLUME_DEBOUNCE: Duration = Duration::from_millis(500);

/// Fixed scale divisors; deflection times sensitivity runs through these.
const SEEK_DIVISOR: f32 = 4.0;
const VOLUME_DIVISOR: f32 = 20.0;

fn select_axis(sample: AxisSample, axis: AxisSelect) -> f32 {
    match axis {
        AxisSelect::X => sample.x,
        AxisSelect::Y => sample.y,
        AxisSelect::Z => sample.z,
        AxisSelect::Off => 0.0,
    }
}

#[derive(Debug, Default)]
pub struct GestureMapper;

impl GestureMapper {
    /// Handles a translation sample: seek first, press-down second, never
    /// both.
    pub fn on_translation(
        &self,
        sample: AxisSample,
        settings: &Settings,
        state: &mut SessionState,
    ) -> Option<TransportCommand> {
        let zone = settings.zone.as_deref()?;

        let sign = if settings.invert_seek { -1.0 } else { 1.0 };
        let value = select_axis(sample, settings.seek_axis);
        if value.abs() > settings.threshold_seek as f32 / 100.0 {
            if !state.clock.ready(SEEK_DEBOUNCE) {
                // over the seek threshold but inside the window: the event
                // is consumed, it must not fall through to press-down
                return None;
            }
            state.clock.touch();
            let seconds = -(settings.sensitivity_seek as f32) / SEEK_DIVISOR * value * sign;
            trace!(zone, seconds, "seek gesture");
            return Some(TransportCommand::Seek {
                zone: zone.to_string(),
                mode: SeekMode::Relative,
                seconds,
            });
        }

        // press-down always reads the raw Y deflection, independent of the
        // configured seek axis
        if sample.y.abs() > settings.threshold_play_pause as f32 / 100.0
            && state.clock.ready(PLAY_PAUSE_DEBOUNCE)
        {
            let command = self.action_command(settings.press, zone, state);
            if command.is_some() {
                state.clock.touch();
            }
            return command;
        }

        None
    }

    /// Handles a rotation sample: volume only. The default polarity is
    /// already negative; an explicit invert flips it back to positive.
    pub fn on_rotation(
        &self,
        sample: AxisSample,
        settings: &Settings,
        state: &mut SessionState,
    ) -> Option<TransportCommand> {
        let zone = settings.zone.as_deref()?;

        let sign = if settings.invert_volume { 1.0 } else { -1.0 };
        let value = select_axis(sample, settings.volume_axis);
        if value != 0.0 && state.clock.ready(VOLUME_DEBOUNCE) {
            state.clock.touch();
            let delta = sign * value * settings.sensitivity_volume as f32 / VOLUME_DIVISOR;
            trace!(zone, delta, "volume gesture");
            return Some(TransportCommand::ChangeVolume {
                zone: zone.to_string(),
                mode: VolumeMode::RelativeStep,
                delta,
            });
        }

        None
    }

    /// Handles a cap button press. Buttons dispatch immediately, outside any
    /// debounce window.
    pub fn on_button(
        &self,
        side: ButtonSide,
        settings: &Settings,
        state: &mut SessionState,
    ) -> Option<TransportCommand> {
        let zone = settings.zone.as_deref()?;
        let binding = match side {
            ButtonSide::Left => settings.left,
            ButtonSide::Right => settings.right,
        };
        self.action_command(binding, zone, state)
    }

    /// Handles a zone-change notification. Returns true when the playback
    /// state of the configured zone changed and the LED needs a refresh.
    pub fn on_zone_changed(
        &self,
        change: &ZoneChange,
        settings: &Settings,
        state: &mut SessionState,
    ) -> bool {
        let Some(zone) = settings.zone.as_deref() else {
            return false;
        };
        for snapshot in &change.zones {
            if snapshot.outputs.iter().any(|output| output == zone)
                && snapshot.state != state.playback_state
            {
                trace!(from = %state.playback_state, to = %snapshot.state, "playback state change");
                state.playback_state = snapshot.state.clone();
                return true;
            }
        }
        false
    }

    /// Resolves a configured action into a command, flipping toggle state
    /// where the action is a toggle.
    fn action_command(
        &self,
        action: ButtonAction,
        zone: &str,
        state: &mut SessionState,
    ) -> Option<TransportCommand> {
        match action {
            ButtonAction::PlayPause => Some(TransportCommand::Control {
                zone: zone.to_string(),
                action: ControlAction::PlayPause,
            }),
            ButtonAction::Next => Some(TransportCommand::Control {
                zone: zone.to_string(),
                action: ControlAction::Next,
            }),
            ButtonAction::Previous => Some(TransportCommand::Control {
                zone: zone.to_string(),
                action: ControlAction::Previous,
            }),
            ButtonAction::MuteUnmute => {
                state.mute = state.mute.toggled();
                Some(TransportCommand::Mute {
                    zone: zone.to_string(),
                    state: state.mute,
                })
            }
            ButtonAction::Shuffle => {
                state.shuffle = !state.shuffle;
                Some(TransportCommand::ChangeSettings {
                    zone: zone.to_string(),
                    shuffle: state.shuffle,
                })
            }
            ButtonAction::Off => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MuteState, ZoneSnapshot};

    fn settings() -> Settings {
        Settings {
            zone: Some("Z".to_string()),
            ..Settings::default()
        }
    }

    fn sample(x: f32, y: f32, z: f32) -> AxisSample {
        AxisSample { x, y, z }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn seek_scenario_matches_reference_values() {
        // zone Z, seek axis x, threshold 25, sensitivity 20, no invert,
        // with an expired debounce window: expect Seek(Z, relative, -1.5)
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        let command = mapper.on_translation(sample(0.3, 0.1, 0.0), &settings(), &mut state);
        match command {
            Some(TransportCommand::Seek {
                zone,
                mode: SeekMode::Relative,
                seconds,
            }) => {
                assert_eq!(zone, "Z");
                assert_close(seconds, -1.5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn seek_wins_over_press_down_when_both_exceed_threshold() {
        let mut config = settings();
        config.threshold_seek = 10;
        config.threshold_play_pause = 10;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        // both |x| and |y| far above their thresholds; priority says seek
        let command = mapper.on_translation(sample(0.9, 0.9, 0.0), &config, &mut state);
        assert!(matches!(command, Some(TransportCommand::Seek { .. })));
    }

    #[test]
    fn seek_inside_window_emits_nothing_and_never_falls_through() {
        let mut config = settings();
        config.threshold_play_pause = 10;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        let first = mapper.on_translation(sample(0.5, 0.9, 0.0), &config, &mut state);
        assert!(matches!(first, Some(TransportCommand::Seek { .. })));
        // immediately again: debounced, and the high Y must not trigger
        // play-pause instead
        let second = mapper.on_translation(sample(0.5, 0.9, 0.0), &config, &mut state);
        assert!(second.is_none());
    }

    #[test]
    fn press_down_reads_raw_y_regardless_of_seek_axis() {
        let mut config = settings();
        config.seek_axis = AxisSelect::Z;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        // z stays flat, y exceeds the play-pause threshold
        let command = mapper.on_translation(sample(0.0, 0.9, 0.0), &config, &mut state);
        assert_eq!(
            command,
            Some(TransportCommand::Control {
                zone: "Z".to_string(),
                action: ControlAction::PlayPause,
            })
        );
        // second press inside the 500ms window is swallowed
        let again = mapper.on_translation(sample(0.0, 0.9, 0.0), &config, &mut state);
        assert!(again.is_none());
    }

    #[test]
    fn press_down_off_neither_dispatches_nor_touches_the_clock() {
        let mut config = settings();
        config.press = ButtonAction::Off;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        assert!(mapper
            .on_translation(sample(0.0, 0.9, 0.0), &config, &mut state)
            .is_none());
        // clock untouched: a volume gesture right after still passes
        let volume = mapper.on_rotation(sample(0.0, 0.5, 0.0), &config, &mut state);
        assert!(volume.is_some());
    }

    #[test]
    fn invert_seek_flips_the_emitted_sign() {
        let mut config = settings();
        config.invert_seek = true;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        match mapper.on_translation(sample(0.3, 0.0, 0.0), &config, &mut state) {
            Some(TransportCommand::Seek { seconds, .. }) => assert_close(seconds, 1.5),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn volume_default_polarity_is_negative() {
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        match mapper.on_rotation(sample(0.0, 0.5, 0.0), &settings(), &mut state) {
            Some(TransportCommand::ChangeVolume {
                mode: VolumeMode::RelativeStep,
                delta,
                ..
            }) => assert_close(delta, -0.5),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn invert_volume_restores_positive_polarity() {
        let mut config = settings();
        config.invert_volume = true;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        match mapper.on_rotation(sample(0.0, 0.5, 0.0), &config, &mut state) {
            Some(TransportCommand::ChangeVolume { delta, .. }) => assert_close(delta, 0.5),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn volume_shares_the_debounce_clock_with_seek() {
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        assert!(mapper
            .on_rotation(sample(0.0, 0.5, 0.0), &settings(), &mut state)
            .is_some());
        // the volume dispatch refreshed the shared clock, so an immediate
        // seek gesture is still inside its 50ms window
        assert!(mapper
            .on_translation(sample(0.5, 0.0, 0.0), &settings(), &mut state)
            .is_none());
    }

    #[test]
    fn disabled_axes_select_zero() {
        let mut config = settings();
        config.seek_axis = AxisSelect::Off;
        config.volume_axis = AxisSelect::Off;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        assert!(mapper
            .on_translation(sample(0.9, 0.0, 0.9), &config, &mut state)
            .is_none());
        assert!(mapper
            .on_rotation(sample(0.9, 0.9, 0.9), &config, &mut state)
            .is_none());
    }

    #[test]
    fn buttons_ignore_the_debounce_clock() {
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        // seek dispatch touches the clock...
        assert!(mapper
            .on_translation(sample(0.5, 0.0, 0.0), &settings(), &mut state)
            .is_some());
        // ...but buttons dispatch regardless
        let command = mapper.on_button(ButtonSide::Left, &settings(), &mut state);
        assert_eq!(
            command,
            Some(TransportCommand::Control {
                zone: "Z".to_string(),
                action: ControlAction::Previous,
            })
        );
        let command = mapper.on_button(ButtonSide::Right, &settings(), &mut state);
        assert_eq!(
            command,
            Some(TransportCommand::Control {
                zone: "Z".to_string(),
                action: ControlAction::Next,
            })
        );
    }

    #[test]
    fn mute_toggle_round_trips() {
        let mut config = settings();
        config.left = ButtonAction::MuteUnmute;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        assert_eq!(state.mute, MuteState::Unmute);
        match mapper.on_button(ButtonSide::Left, &config, &mut state) {
            Some(TransportCommand::Mute { state: sent, .. }) => assert_eq!(sent, MuteState::Mute),
            other => panic!("unexpected command {other:?}"),
        }
        match mapper.on_button(ButtonSide::Left, &config, &mut state) {
            Some(TransportCommand::Mute { state: sent, .. }) => assert_eq!(sent, MuteState::Unmute),
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(state.mute, MuteState::Unmute);
    }

    #[test]
    fn shuffle_toggle_flips_on_each_dispatch() {
        let mut config = settings();
        config.right = ButtonAction::Shuffle;
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        match mapper.on_button(ButtonSide::Right, &config, &mut state) {
            Some(TransportCommand::ChangeSettings { shuffle, .. }) => assert!(shuffle),
            other => panic!("unexpected command {other:?}"),
        }
        match mapper.on_button(ButtonSide::Right, &config, &mut state) {
            Some(TransportCommand::ChangeSettings { shuffle, .. }) => assert!(!shuffle),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn no_zone_suppresses_everything_silently() {
        let config = Settings::default();
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        assert!(mapper
            .on_translation(sample(0.9, 0.9, 0.9), &config, &mut state)
            .is_none());
        assert!(mapper
            .on_rotation(sample(0.9, 0.9, 0.9), &config, &mut state)
            .is_none());
        assert!(mapper
            .on_button(ButtonSide::Left, &config, &mut state)
            .is_none());
    }

    #[test]
    fn zone_change_updates_playback_state_for_matching_output() {
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        let change = ZoneChange {
            zones: vec![ZoneSnapshot {
                outputs: vec!["other".to_string(), "Z".to_string()],
                state: "playing".to_string(),
            }],
        };
        assert!(mapper.on_zone_changed(&change, &settings(), &mut state));
        assert_eq!(state.playback_state, "playing");
        // same state again: no refresh
        assert!(!mapper.on_zone_changed(&change, &settings(), &mut state));
    }

    #[test]
    fn zone_change_for_foreign_outputs_is_ignored() {
        let mapper = GestureMapper;
        let mut state = SessionState::default();
        let change = ZoneChange {
            zones: vec![ZoneSnapshot {
                outputs: vec!["other".to_string()],
                state: "playing".to_string(),
            }],
        };
        assert!(!mapper.on_zone_changed(&change, &settings(), &mut state));
        assert_eq!(state.playback_state, "");
    }
}
