//! Thin trait seam over the HID backend.
//!
//! The supervisor talks to hardware through [`HidPort`] and [`HidTransport`]
//! instead of hidapi directly, so the connection lifecycle can be tested
//! against the in-memory [`mock`] implementations.

use super::{DeviceError, DeviceIdentity};
use hidapi::{HidApi, HidDevice};

/// An open device handle: blocking reads and raw writes.
pub trait HidTransport: Send + 'static {
    fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, DeviceError>;

    fn write_report(&self, data: &[u8]) -> Result<usize, DeviceError>;
}

/// The bus: enumeration and opening.
pub trait HidPort: Send + 'static {
    type Device: HidTransport;

    /// Re-enumerates the bus. [`present`](HidPort::present) answers from the
    /// state as of the last refresh, never from the live bus.
    fn refresh(&mut self) -> Result<(), DeviceError>;

    fn present(&self, identity: &DeviceIdentity) -> bool;

    fn open_device(&self, identity: &DeviceIdentity) -> Result<Self::Device, DeviceError>;
}

impl HidTransport for HidDevice {
    fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, DeviceError> {
        self.read_timeout(buf, timeout_ms).map_err(DeviceError::Hid)
    }

    fn write_report(&self, data: &[u8]) -> Result<usize, DeviceError> {
        self.write(data).map_err(DeviceError::Hid)
    }
}

impl HidPort for HidApi {
    type Device = HidDevice;

    fn refresh(&mut self) -> Result<(), DeviceError> {
        self.refresh_devices().map_err(DeviceError::Hid)
    }

    fn present(&self, identity: &DeviceIdentity) -> bool {
        self.device_list().any(|info| {
            info.vendor_id() == identity.vendor_id && info.product_id() == identity.product_id
        })
    }

    fn open_device(&self, identity: &DeviceIdentity) -> Result<HidDevice, DeviceError> {
        self.open(identity.vendor_id, identity.product_id)
            .map_err(DeviceError::Hid)
    }
}

pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory HID bus with explicit plug/unplug control.
    ///
    /// Enumeration is cached like the real backend: [`HidPort::present`]
    /// only changes after a [`HidPort::refresh`], while open handles see
    /// plug state live.
    #[derive(Clone, Default)]
    pub struct MockHidPort {
        bus: Arc<Mutex<Bus>>,
        reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    #[derive(Default)]
    struct Bus {
        plugged: Option<DeviceIdentity>,
        enumerated: Option<DeviceIdentity>,
    }

    impl MockHidPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn plug(&self, identity: DeviceIdentity) {
            self.bus.lock().unwrap_or_else(|e| e.into_inner()).plugged = Some(identity);
        }

        pub fn unplug(&self) {
            self.bus.lock().unwrap_or_else(|e| e.into_inner()).plugged = None;
        }

        pub fn queue_read(&self, data: Vec<u8>) {
            self.reads
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(data);
        }

        pub fn written(&self) -> Vec<Vec<u8>> {
            self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }

        fn plugged(&self) -> Option<DeviceIdentity> {
            self.bus.lock().unwrap_or_else(|e| e.into_inner()).plugged
        }
    }

    impl HidPort for MockHidPort {
        type Device = MockHidDevice;

        fn refresh(&mut self) -> Result<(), DeviceError> {
            let mut bus = self.bus.lock().unwrap_or_else(|e| e.into_inner());
            bus.enumerated = bus.plugged;
            Ok(())
        }

        fn present(&self, identity: &DeviceIdentity) -> bool {
            self.bus
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .enumerated
                .as_ref()
                == Some(identity)
        }

        fn open_device(&self, identity: &DeviceIdentity) -> Result<MockHidDevice, DeviceError> {
            if self.plugged().as_ref() == Some(identity) {
                Ok(MockHidDevice {
                    port: self.clone(),
                    identity: *identity,
                })
            } else {
                Err(DeviceError::NotFound)
            }
        }
    }

    pub struct MockHidDevice {
        port: MockHidPort,
        identity: DeviceIdentity,
    }

    impl HidTransport for MockHidDevice {
        fn read_report(&self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize, DeviceError> {
            if self.port.plugged().as_ref() != Some(&self.identity) {
                return Err(DeviceError::Io("device gone".to_string()));
            }
            let next = self
                .port
                .reads
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front();
            match next {
                Some(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                None => {
                    // emulate the read timeout so callers do not spin hot
                    std::thread::sleep(Duration::from_millis(1));
                    Ok(0)
                }
            }
        }

        fn write_report(&self, data: &[u8]) -> Result<usize, DeviceError> {
            if self.port.plugged().as_ref() != Some(&self.identity) {
                return Err(DeviceError::Io("device gone".to_string()));
            }
            self.port
                .writes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(data.to_vec());
            Ok(data.len())
        }
    }
}
