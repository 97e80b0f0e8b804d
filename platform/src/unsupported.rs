use windrive_core::{ControlCode, DeviceBackend, DosDevices, LogicalDrive, WindriveError};

/// Backend for hosts without the Win32 device namespace. Every call fails
/// with [`WindriveError::UnsupportedOperation`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl UnsupportedBackend {
    pub fn new() -> Self {
        Self
    }

    fn unsupported(operation: &str) -> WindriveError {
        log::debug!("{} requested on {}", operation, std::env::consts::OS);
        WindriveError::UnsupportedOperation(format!(
            "{} requires Windows (running on {})",
            operation,
            std::env::consts::OS
        ))
    }
}

impl DeviceBackend for UnsupportedBackend {
    fn logical_drives(&self) -> Result<Vec<LogicalDrive>, WindriveError> {
        Err(Self::unsupported("logical drive enumeration"))
    }

    fn dos_devices(&self) -> Result<DosDevices, WindriveError> {
        Err(Self::unsupported("DOS device enumeration"))
    }

    fn control(&self, device_path: &str, code: ControlCode) -> Result<Vec<u8>, WindriveError> {
        Err(Self::unsupported(&format!("{} on {}", code, device_path)))
    }
}
