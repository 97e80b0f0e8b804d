use serde::Serialize;
use std::fmt;

const IOCTL_DISK_BASE: u32 = 0x0000_0007;
const METHOD_BUFFERED: u32 = 0;
const FILE_ANY_ACCESS: u32 = 0;
const FILE_READ_ACCESS: u32 = 1;

pub const GENERIC_READ: u32 = 0x8000_0000;

/// `CTL_CODE` from winioctl.h.
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// The device-control requests this crate issues. Each has a fixed output
/// layout decoded by the matching record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlCode {
    DiskPerformance,
    DriveGeometryEx,
    CacheInformation,
}

impl ControlCode {
    pub const fn code(self) -> u32 {
        match self {
            ControlCode::DiskPerformance => {
                ctl_code(IOCTL_DISK_BASE, 0x0008, METHOD_BUFFERED, FILE_ANY_ACCESS)
            }
            ControlCode::DriveGeometryEx => {
                ctl_code(IOCTL_DISK_BASE, 0x0028, METHOD_BUFFERED, FILE_ANY_ACCESS)
            }
            ControlCode::CacheInformation => {
                ctl_code(IOCTL_DISK_BASE, 0x0035, METHOD_BUFFERED, FILE_READ_ACCESS)
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ControlCode::DiskPerformance => "IOCTL_DISK_PERFORMANCE",
            ControlCode::DriveGeometryEx => "IOCTL_DISK_GET_DRIVE_GEOMETRY_EX",
            ControlCode::CacheInformation => "IOCTL_DISK_GET_CACHE_INFORMATION",
        }
    }

    /// Output buffer to hand to `DeviceIoControl`. Geometry is variable length
    /// (partition and detection info trail the fixed header), so it gets room
    /// to spare.
    pub const fn output_size(self) -> usize {
        match self {
            ControlCode::DiskPerformance => crate::performance::DISK_PERFORMANCE_SIZE,
            ControlCode::DriveGeometryEx => 256,
            ControlCode::CacheInformation => crate::cache::DISK_CACHE_INFORMATION_SIZE,
        }
    }

    /// `dwDesiredAccess` for `CreateFileW`, derived from the access bits of the
    /// control code. Query-only codes work on a zero-access handle, which needs
    /// no elevation.
    pub const fn desired_access(self) -> u32 {
        match (self.code() >> 14) & 0x3 {
            FILE_ANY_ACCESS => 0,
            _ => GENERIC_READ,
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_codes_match_winioctl() {
        assert_eq!(ControlCode::DiskPerformance.code(), 0x0007_0020);
        assert_eq!(ControlCode::DriveGeometryEx.code(), 0x0007_00A0);
        assert_eq!(ControlCode::CacheInformation.code(), 0x0007_40D4);
    }

    #[test]
    fn test_desired_access_follows_access_bits() {
        assert_eq!(ControlCode::DiskPerformance.desired_access(), 0);
        assert_eq!(ControlCode::DriveGeometryEx.desired_access(), 0);
        assert_eq!(ControlCode::CacheInformation.desired_access(), GENERIC_READ);
    }
}
