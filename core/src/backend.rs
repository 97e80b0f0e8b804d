use crate::{ControlCode, DosDevices, LogicalDrive, WindriveError};

/// Blocking access to the OS device tables.
///
/// Every method performs its OS calls synchronously and is only ever invoked
/// from a worker thread by [`crate::DriveInspector`]. Implementations keep no
/// state between calls: `control` opens `device_path`, issues exactly one
/// control request, and closes the handle before returning.
pub trait DeviceBackend: Send + Sync + 'static {
    fn logical_drives(&self) -> Result<Vec<LogicalDrive>, WindriveError>;

    fn dos_devices(&self) -> Result<DosDevices, WindriveError>;

    /// Raw output buffer of `code`, truncated to the bytes the driver returned.
    fn control(&self, device_path: &str, code: ControlCode) -> Result<Vec<u8>, WindriveError>;
}
