//! Device layer: identity table, report decoding and the connection supervisor.
//!
//! The supported hardware is a small family of 3Dconnexion 6-axis controllers.
//! The generations differ in report layout and wireless behavior, so each
//! known identity carries a capability flag set instead of its own code path.

pub mod hid;
pub mod report;
pub mod supervisor;

pub use report::{AxisSample, ButtonSide, DeviceReport};
pub use supervisor::{ConnectionState, ConnectionSupervisor};

use thiserror::Error;

/// Per-generation behavior flags, resolved once at discovery time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Device talks through a radio link (dongle or cable-pairable).
    pub wireless: bool,
    /// Translation reports carry the rotation payload in the same packet.
    pub dual_axis_report: bool,
    /// Device emits `0x17` battery-level reports.
    pub battery_reports: bool,
    /// Reopening the handle in place does not work after the dongle drops
    /// off the bus; the process restarts instead.
    pub restart_on_reconnect: bool,
}

/// One entry of the discovery table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: &'static str,
    pub caps: Capabilities,
}

/// Supported devices in probe order, newest generation first.
pub const KNOWN_DEVICES: &[DeviceIdentity] = &[
    DeviceIdentity {
        vendor_id: 0x256F,
        product_id: 0xC652,
        name: "3Dconnexion Universal Receiver",
        caps: Capabilities {
            wireless: true,
            dual_axis_report: true,
            battery_reports: true,
            restart_on_reconnect: true,
        },
    },
    DeviceIdentity {
        vendor_id: 0x256F,
        product_id: 0xC62E,
        name: "SpaceMouse Wireless",
        caps: Capabilities {
            wireless: true,
            dual_axis_report: true,
            battery_reports: true,
            restart_on_reconnect: false,
        },
    },
    DeviceIdentity {
        vendor_id: 0x256F,
        product_id: 0xC635,
        name: "SpaceMouse Compact",
        caps: Capabilities {
            wireless: false,
            dual_axis_report: false,
            battery_reports: false,
            restart_on_reconnect: false,
        },
    },
    DeviceIdentity {
        vendor_id: 0x046D,
        product_id: 0xC626,
        name: "SpaceNavigator",
        caps: Capabilities {
            wireless: false,
            dual_axis_report: false,
            battery_reports: false,
            restart_on_reconnect: false,
        },
    },
];

/// Events pushed from the supervisor's I/O loop to the bridge engine.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Connected { identity: DeviceIdentity },
    Report(DeviceReport),
    Disconnected,
}

/// Errors from the device layer. None of these are fatal: discovery keeps
/// retrying and I/O failures demote the device to absent.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("HID backend error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("device I/O failed: {0}")]
    Io(String),

    #[error("no supported device found")]
    NotFound,

    #[error("device event channel closed: {0}")]
    Channel(String),
}
