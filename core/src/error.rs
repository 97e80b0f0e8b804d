use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindriveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Device not found: {device} ({reason})")]
    DeviceNotFound { device: String, reason: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("System query failed: {0}")]
    SystemQuery(String),
}

/// Discriminant of a [`WindriveError`], for callers that branch on the failure
/// class without caring about the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArgument,
    DeviceNotFound,
    AccessDenied,
    UnsupportedOperation,
    SystemQuery,
}

// Win32 error codes the mapping cares about.
const ERROR_INVALID_FUNCTION: u32 = 1;
const ERROR_FILE_NOT_FOUND: u32 = 2;
const ERROR_PATH_NOT_FOUND: u32 = 3;
const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_DRIVE: u32 = 15;
const ERROR_NOT_READY: u32 = 21;
const ERROR_SHARING_VIOLATION: u32 = 32;
const ERROR_NOT_SUPPORTED: u32 = 50;
const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_INVALID_NAME: u32 = 123;
const ERROR_DEVICE_NOT_CONNECTED: u32 = 1167;

impl WindriveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WindriveError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            WindriveError::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            WindriveError::AccessDenied(_) => ErrorKind::AccessDenied,
            WindriveError::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            WindriveError::SystemQuery(_) => ErrorKind::SystemQuery,
        }
    }

    /// Classify a failed per-device OS call by its Win32 error code.
    ///
    /// `device` is the path the call was issued against and `operation` a short
    /// label for the call (`"open"`, `"IOCTL_DISK_PERFORMANCE"`, ...).
    pub fn from_os_error(code: u32, device: &str, operation: &str) -> Self {
        match code {
            ERROR_FILE_NOT_FOUND
            | ERROR_PATH_NOT_FOUND
            | ERROR_INVALID_DRIVE
            | ERROR_INVALID_NAME
            | ERROR_DEVICE_NOT_CONNECTED => WindriveError::DeviceNotFound {
                device: device.to_string(),
                reason: format!("{} failed with OS error {}", operation, code),
            },
            ERROR_ACCESS_DENIED | ERROR_SHARING_VIOLATION => WindriveError::AccessDenied(format!(
                "{} on {} (OS error {})",
                operation, device, code
            )),
            // An empty optical or card-reader slot reports NOT_READY.
            ERROR_INVALID_FUNCTION
            | ERROR_NOT_SUPPORTED
            | ERROR_NOT_READY
            | ERROR_INVALID_PARAMETER => WindriveError::UnsupportedOperation(format!(
                "{} is not supported by {} (OS error {})",
                operation, device, code
            )),
            other => WindriveError::SystemQuery(format!(
                "{} on {} failed with OS error {}",
                operation, device, other
            )),
        }
    }

    /// Classify a failed enumeration call. Enumeration has no target device,
    /// so every failure is a [`ErrorKind::SystemQuery`].
    pub fn enumeration(operation: &str, code: u32) -> Self {
        WindriveError::SystemQuery(format!("{} failed with OS error {}", operation, code))
    }
}

/// Extract the Win32 code from an `HRESULT` built with `HRESULT_FROM_WIN32`.
/// Other facilities are returned unchanged.
pub fn win32_code_from_hresult(hresult: i32) -> u32 {
    let raw = hresult as u32;
    if raw & 0xFFFF_0000 == 0x8007_0000 {
        raw & 0xFFFF
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_errors_map_to_distinct_kinds() {
        assert_eq!(
            WindriveError::from_os_error(2, r"\\.\Z:", "open").kind(),
            ErrorKind::DeviceNotFound
        );
        assert_eq!(
            WindriveError::from_os_error(5, r"\\.\C:", "open").kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(
            WindriveError::from_os_error(1, r"\\.\N:", "IOCTL_DISK_PERFORMANCE").kind(),
            ErrorKind::UnsupportedOperation
        );
        assert_eq!(
            WindriveError::from_os_error(21, r"\\.\D:", "IOCTL_DISK_GET_DRIVE_GEOMETRY_EX").kind(),
            ErrorKind::UnsupportedOperation
        );
        assert_eq!(
            WindriveError::from_os_error(1117, r"\\.\C:", "open").kind(),
            ErrorKind::SystemQuery
        );
    }

    #[test]
    fn test_device_not_found_keeps_device() {
        match WindriveError::from_os_error(3, r"\\.\Q:", "open") {
            WindriveError::DeviceNotFound { device, reason } => {
                assert_eq!(device, r"\\.\Q:");
                assert!(reason.contains("open"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_win32_code_from_hresult() {
        // HRESULT_FROM_WIN32(ERROR_ACCESS_DENIED)
        assert_eq!(win32_code_from_hresult(0x8007_0005_u32 as i32), 5);
        // E_FAIL is not a wrapped Win32 code.
        assert_eq!(win32_code_from_hresult(0x8000_4005_u32 as i32), 0x8000_4005);
    }
}
