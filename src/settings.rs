//! Persisted bridge configuration.
//!
//! Settings are a flat TOML file under the user config directory. Loading
//! falls back to defaults when the file is missing; saving refuses invalid
//! values. [`layout`] describes the settings page for a host UI, including
//! per-field validation errors, so the bridge itself never renders anything.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedMode {
    On,
    #[default]
    WhenPlaying,
    Off,
}

/// Axis selection for an analog gesture, or `Off` to disable it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisSelect {
    X,
    Y,
    Z,
    Off,
}

/// Action bound to a press-down gesture or a cap button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    PlayPause,
    MuteUnmute,
    Next,
    Previous,
    Shuffle,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output id of the controlled zone. Until one is picked every gesture
    /// is silently ignored.
    pub zone: Option<String>,
    pub led: LedMode,
    /// Action for pressing the cap straight down.
    pub press: ButtonAction,
    pub volume_axis: AxisSelect,
    pub invert_volume: bool,
    pub seek_axis: AxisSelect,
    pub invert_seek: bool,
    pub left: ButtonAction,
    pub right: ButtonAction,
    /// Volume step scale, 1-100.
    pub sensitivity_volume: u8,
    /// Seek step scale, 1-100.
    pub sensitivity_seek: u8,
    /// Seek trigger threshold in percent of full deflection, 1-100.
    pub threshold_seek: u8,
    /// Press-down trigger threshold in percent of full deflection, 1-100.
    pub threshold_play_pause: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zone: None,
            led: LedMode::WhenPlaying,
            press: ButtonAction::PlayPause,
            volume_axis: AxisSelect::Y,
            invert_volume: false,
            seek_axis: AxisSelect::X,
            invert_seek: false,
            left: ButtonAction::Previous,
            right: ButtonAction::Next,
            sensitivity_volume: 20,
            sensitivity_seek: 20,
            threshold_seek: 25,
            threshold_play_pause: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("settings rejected: {0:?}")]
    Invalid(Vec<FieldError>),

    #[error("no config directory available on this system")]
    NoConfigDir,
}

impl Settings {
    /// Range-checks every integer field. Empty result means valid.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let mut check = |field: &'static str, label: &str, value: u8| {
            if !(1..=100).contains(&value) {
                errors.push(FieldError {
                    field,
                    message: format!("{label} must be between 1 and 100."),
                });
            }
        };
        check(
            "sensitivity_volume",
            "Volume Sensitivity",
            self.sensitivity_volume,
        );
        check("sensitivity_seek", "Seek Sensitivity", self.sensitivity_seek);
        check("threshold_seek", "Seek Threshold", self.threshold_seek);
        check(
            "threshold_play_pause",
            "Play/Pause Threshold",
            self.threshold_play_pause,
        );
        errors
    }

    fn file_path() -> Result<PathBuf, SettingsError> {
        let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(base.join("spacenav-bridge").join("settings.toml"))
    }

    /// Loads settings from disk, falling back to defaults when no file
    /// exists yet.
    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::file_path()?;
        if !path.exists() {
            debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&raw)?;
        info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Validates and persists the settings.
    pub fn save(&self) -> Result<(), SettingsError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SettingsError::Invalid(errors));
        }
        let path = Self::file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        info!("saved settings to {}", path.display());
        Ok(())
    }
}

/// One renderable field of the settings page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutField {
    Zone {
        title: &'static str,
        setting: &'static str,
    },
    Dropdown {
        title: &'static str,
        setting: &'static str,
        options: Vec<(&'static str, &'static str)>,
    },
    Integer {
        title: &'static str,
        setting: &'static str,
        min: u8,
        max: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Settings-page description handed to the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub fields: Vec<LayoutField>,
    pub has_error: bool,
}

const ACTION_OPTIONS: [(&str, &str); 6] = [
    ("Previous Track", "previous"),
    ("Next Track", "next"),
    ("Play/Pause", "playpause"),
    ("Mute/Unmute", "muteunmute"),
    ("Shuffle", "shuffle"),
    ("Off", "off"),
];

const INVERT_OPTIONS: [(&str, &str); 2] = [("Yes", "yes"), ("No", "no")];

/// Builds the settings-page layout for the given values, flagging any
/// out-of-range integers.
pub fn layout(settings: &Settings) -> Layout {
    let errors = settings.validate();
    let error_for = |field: &str| {
        errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.clone())
    };

    let axis = |kind: &'static str| {
        vec![
            (
                if kind == "rotation" {
                    "X-Rotation"
                } else {
                    "X-Translation"
                },
                "x",
            ),
            (
                if kind == "rotation" {
                    "Y-Rotation"
                } else {
                    "Y-Translation"
                },
                "y",
            ),
            (
                if kind == "rotation" {
                    "Z-Rotation"
                } else {
                    "Z-Translation"
                },
                "z",
            ),
            ("Off", "off"),
        ]
    };

    let integer = |title: &'static str, setting: &'static str| LayoutField::Integer {
        title,
        setting,
        min: 1,
        max: 100,
        error: error_for(setting),
    };

    let fields = vec![
        LayoutField::Zone {
            title: "Zone",
            setting: "zone",
        },
        LayoutField::Dropdown {
            title: "LED Status",
            setting: "led",
            options: vec![
                ("Always On", "on"),
                ("On when playing", "whenplaying"),
                ("Off", "off"),
            ],
        },
        LayoutField::Dropdown {
            title: "Press Down",
            setting: "press",
            options: ACTION_OPTIONS.to_vec(),
        },
        LayoutField::Dropdown {
            title: "Volume Axis",
            setting: "volume_axis",
            options: axis("rotation"),
        },
        LayoutField::Dropdown {
            title: "Invert Volume Axis",
            setting: "invert_volume",
            options: INVERT_OPTIONS.to_vec(),
        },
        LayoutField::Dropdown {
            title: "Seek Axis",
            setting: "seek_axis",
            options: axis("translation"),
        },
        LayoutField::Dropdown {
            title: "Invert Seek Axis",
            setting: "invert_seek",
            options: INVERT_OPTIONS.to_vec(),
        },
        LayoutField::Dropdown {
            title: "Left Button",
            setting: "left",
            options: ACTION_OPTIONS.to_vec(),
        },
        LayoutField::Dropdown {
            title: "Right Button",
            setting: "right",
            options: ACTION_OPTIONS.to_vec(),
        },
        integer("Volume Sensitivity", "sensitivity_volume"),
        integer("Seek Sensitivity", "sensitivity_seek"),
        integer("Seek Threshold", "threshold_seek"),
        integer("Play/Pause Threshold", "threshold_play_pause"),
    ];

    Layout {
        has_error: !errors.is_empty(),
        fields,
    }
}
