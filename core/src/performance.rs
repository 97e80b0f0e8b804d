use crate::layout::ByteReader;
use crate::WindriveError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `sizeof(DISK_PERFORMANCE)` on every Windows target (8-byte aligned).
pub const DISK_PERFORMANCE_SIZE: usize = 88;

/// Snapshot of the counters returned by `IOCTL_DISK_PERFORMANCE`.
///
/// Times are in 100ns units as reported by the storage manager; `query_time`
/// is the driver's own timestamp of the sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePerformance {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub read_time: u64,
    pub write_time: u64,
    pub idle_time: u64,
    pub read_count: u32,
    pub write_count: u32,
    pub queue_depth: u32,
    pub split_count: u32,
    pub query_time: u64,
    pub storage_device_number: u32,
    pub storage_manager_name: String,
    pub captured_at: DateTime<Utc>,
}

impl DevicePerformance {
    pub fn decode(buf: &[u8], captured_at: DateTime<Utc>) -> Result<Self, WindriveError> {
        let r = ByteReader::new(buf, "DISK_PERFORMANCE");
        r.require(DISK_PERFORMANCE_SIZE)?;

        Ok(Self {
            bytes_read: r.non_negative(0, "BytesRead")?,
            bytes_written: r.non_negative(8, "BytesWritten")?,
            read_time: r.non_negative(16, "ReadTime")?,
            write_time: r.non_negative(24, "WriteTime")?,
            idle_time: r.non_negative(32, "IdleTime")?,
            read_count: r.u32(40)?,
            write_count: r.u32(44)?,
            queue_depth: r.u32(48)?,
            split_count: r.u32(52)?,
            query_time: r.non_negative(56, "QueryTime")?,
            storage_device_number: r.u32(64)?,
            storage_manager_name: r.wide_str(68, 8)?,
            captured_at,
        })
    }
}
