//! Raw HID report decoding.
//!
//! Reports are fixed-layout packets tagged by their first byte. Decoding is
//! infallible: anything the decoder does not recognize, including buffers
//! shorter than their tag demands, comes back as [`DeviceReport::Unknown`]
//! and is dropped upstream.

use super::Capabilities;

const TAG_TRANSLATION: u8 = 0x01;
const TAG_ROTATION: u8 = 0x02;
const TAG_BUTTON: u8 = 0x03;
const TAG_BATTERY: u8 = 0x17;

/// Full-scale divisor applied to every decoded 16-bit axis value.
const AXIS_SCALE: f32 = 350.0;

/// Values above this are the tail end of a 16-bit two's-complement number.
/// The hardware never produces magnitudes near 32768, so the firmware's
/// effective range boundary sits at 1000. Exactly `> 1000`, not `>=`.
const NEGATIVE_WRAP_THRESHOLD: i32 = 1000;

/// Decoded `{x, y, z}` deflection of one report, roughly in `-1.0..=1.0`
/// at full scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonSide {
    Left,
    Right,
}

/// One decoded device report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceReport {
    Translation(AxisSample),
    Rotation(AxisSample),
    /// Wireless generations pack both vectors into one translation-tagged
    /// packet.
    Motion {
        translation: AxisSample,
        rotation: AxisSample,
    },
    Button(ButtonSide),
    /// Battery level in percent.
    Battery(u8),
    Unknown,
}

fn axis_value(lo: u8, hi: u8) -> f32 {
    let raw = lo as i32 | ((hi as i32) << 8);
    let signed = if raw > NEGATIVE_WRAP_THRESHOLD {
        raw - 65536
    } else {
        raw
    };
    -(signed as f32) / AXIS_SCALE
}

/// Decodes a 6-byte axis group. Wire order is `x, z, y`.
fn axis_group(payload: &[u8]) -> AxisSample {
    AxisSample {
        x: axis_value(payload[0], payload[1]),
        z: axis_value(payload[2], payload[3]),
        y: axis_value(payload[4], payload[5]),
    }
}

/// Turns one raw report into a typed [`DeviceReport`].
pub fn decode(raw: &[u8], caps: &Capabilities) -> DeviceReport {
    match raw.first() {
        Some(&TAG_BUTTON) => match raw.get(1) {
            Some(1) => DeviceReport::Button(ButtonSide::Left),
            Some(2) => DeviceReport::Button(ButtonSide::Right),
            _ => DeviceReport::Unknown,
        },
        Some(&TAG_TRANSLATION) if raw.len() >= 7 => {
            let translation = axis_group(&raw[1..7]);
            if caps.dual_axis_report && raw.len() >= 13 {
                DeviceReport::Motion {
                    translation,
                    rotation: axis_group(&raw[7..13]),
                }
            } else {
                DeviceReport::Translation(translation)
            }
        }
        Some(&TAG_ROTATION) if raw.len() >= 7 => DeviceReport::Rotation(axis_group(&raw[1..7])),
        Some(&TAG_BATTERY) => match raw.get(1) {
            Some(&level) => DeviceReport::Battery(level.min(100)),
            None => DeviceReport::Unknown,
        },
        _ => DeviceReport::Unknown,
    }
}
