pub mod device;
pub mod elevation;
pub mod enumerate;

pub use device::DeviceHandle;
pub use elevation::is_elevated;

use windrive_core::{ControlCode, DeviceBackend, DosDevices, LogicalDrive, WindriveError};

/// Win32 implementation of [`DeviceBackend`]. Stateless: every call opens
/// and closes its own handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceBackend for WindowsBackend {
    fn logical_drives(&self) -> Result<Vec<LogicalDrive>, WindriveError> {
        enumerate::logical_drives()
    }

    fn dos_devices(&self) -> Result<DosDevices, WindriveError> {
        enumerate::dos_devices()
    }

    fn control(&self, device_path: &str, code: ControlCode) -> Result<Vec<u8>, WindriveError> {
        log::debug!("Issuing {} on {}", code, device_path);

        let result = DeviceHandle::open(device_path, code.desired_access())
            .and_then(|handle| handle.control(code));

        if let Err(e) = &result {
            elevation::hint_on_access_denied(e);
        }
        result
    }
}
