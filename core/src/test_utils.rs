/// Test utilities: an in-memory device backend and builders for raw
/// control-code responses. Nothing here touches real hardware.
use crate::{
    ClusterStats, ControlCode, DeviceBackend, DosDevices, DriveType, LogicalDrive, WindriveError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ERROR_NOT_READY: u32 = 21;

#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<(String, ControlCode)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Mock backend serving canned responses keyed by device path and control
/// code. Clones share the call log, so a test can keep one handle while the
/// inspector owns another.
#[derive(Clone)]
pub struct MockBackend {
    drives: Result<Vec<LogicalDrive>, WindriveError>,
    dos_devices: Result<DosDevices, WindriveError>,
    responses: HashMap<(String, ControlCode), Result<Vec<u8>, WindriveError>>,
    delay: Option<Duration>,
    log: Arc<CallLog>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A fixed `C:` disk with every query answering, plus an empty optical
    /// drive `D:` that only answers the performance query.
    pub fn new() -> Self {
        let drives = vec![
            LogicalDrive::new(
                "C:\\",
                DriveType::Fixed,
                Some(ClusterStats::new(8, 512, 25_000_000, 122_000_000)),
            ),
            LogicalDrive::new("D:\\", DriveType::Cdrom, None),
        ];

        let mut dos_devices = DosDevices::new();
        dos_devices.insert("C:".to_string(), r"\Device\HarddiskVolume3".to_string());
        dos_devices.insert("D:".to_string(), r"\Device\CdRom0".to_string());
        dos_devices.insert(
            "PhysicalDrive0".to_string(),
            r"\Device\Harddisk0\DR0".to_string(),
        );

        let backend = Self {
            drives: Ok(drives),
            dos_devices: Ok(dos_devices),
            responses: HashMap::new(),
            delay: None,
            log: Arc::new(CallLog::default()),
        };

        backend
            .with_response(
                r"\\.\C:",
                ControlCode::DiskPerformance,
                PerformanceFixture::default().to_bytes(),
            )
            .with_response(
                r"\\.\C:",
                ControlCode::DriveGeometryEx,
                GeometryFixture::default().to_bytes(),
            )
            .with_response(
                r"\\.\C:",
                ControlCode::CacheInformation,
                CacheFixture {
                    read_cache_enabled: true,
                    write_cache_enabled: true,
                    ..Default::default()
                }
                .to_bytes(),
            )
            .with_response(
                r"\\.\D:",
                ControlCode::DiskPerformance,
                PerformanceFixture {
                    storage_device_number: 1,
                    storage_manager_name: "CdRom".to_string(),
                    ..Default::default()
                }
                .to_bytes(),
            )
            .with_failure(
                r"\\.\D:",
                ControlCode::DriveGeometryEx,
                WindriveError::from_os_error(ERROR_NOT_READY, r"\\.\D:", "IOCTL_DISK_GET_DRIVE_GEOMETRY_EX"),
            )
            .with_failure(
                r"\\.\D:",
                ControlCode::CacheInformation,
                WindriveError::from_os_error(ERROR_NOT_READY, r"\\.\D:", "IOCTL_DISK_GET_CACHE_INFORMATION"),
            )
    }

    /// A backend with no drives, no DOS devices and no responses.
    pub fn empty() -> Self {
        Self {
            drives: Ok(Vec::new()),
            dos_devices: Ok(DosDevices::new()),
            responses: HashMap::new(),
            delay: None,
            log: Arc::new(CallLog::default()),
        }
    }

    pub fn with_drives(mut self, drives: Vec<LogicalDrive>) -> Self {
        self.drives = Ok(drives);
        self
    }

    pub fn with_dos_devices(mut self, dos_devices: DosDevices) -> Self {
        self.dos_devices = Ok(dos_devices);
        self
    }

    /// Both enumeration calls fail with `error`.
    pub fn failing_enumeration(mut self, error: WindriveError) -> Self {
        self.drives = Err(error.clone());
        self.dos_devices = Err(error);
        self
    }

    pub fn with_response(mut self, device_path: &str, code: ControlCode, bytes: Vec<u8>) -> Self {
        self.responses
            .insert((device_path.to_string(), code), Ok(bytes));
        self
    }

    pub fn with_failure(mut self, device_path: &str, code: ControlCode, error: WindriveError) -> Self {
        self.responses
            .insert((device_path.to_string(), code), Err(error));
        self
    }

    /// Every control call blocks its worker thread for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.log.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, ControlCode)> {
        self.log.calls.lock().unwrap().clone()
    }

    /// Highest number of control calls that were in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.log.peak.load(Ordering::SeqCst)
    }
}

impl DeviceBackend for MockBackend {
    fn logical_drives(&self) -> Result<Vec<LogicalDrive>, WindriveError> {
        self.drives.clone()
    }

    fn dos_devices(&self) -> Result<DosDevices, WindriveError> {
        self.dos_devices.clone()
    }

    fn control(&self, device_path: &str, code: ControlCode) -> Result<Vec<u8>, WindriveError> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((device_path.to_string(), code));

        let active = self.log.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let response = self
            .responses
            .get(&(device_path.to_string(), code))
            .cloned()
            .unwrap_or_else(|| {
                Err(WindriveError::DeviceNotFound {
                    device: device_path.to_string(),
                    reason: "no such mock device".to_string(),
                })
            });

        self.log.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Builder for a `DISK_PERFORMANCE` response.
#[derive(Debug, Clone)]
pub struct PerformanceFixture {
    pub bytes_read: i64,
    pub bytes_written: i64,
    pub read_time: i64,
    pub write_time: i64,
    pub idle_time: i64,
    pub read_count: u32,
    pub write_count: u32,
    pub queue_depth: u32,
    pub split_count: u32,
    pub query_time: i64,
    pub storage_device_number: u32,
    pub storage_manager_name: String,
}

impl Default for PerformanceFixture {
    fn default() -> Self {
        Self {
            bytes_read: 0,
            bytes_written: 0,
            read_time: 0,
            write_time: 0,
            idle_time: 0,
            read_count: 0,
            write_count: 0,
            queue_depth: 0,
            split_count: 0,
            query_time: 0,
            storage_device_number: 0,
            storage_manager_name: "PartMgr".to_string(),
        }
    }
}

impl PerformanceFixture {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(crate::performance::DISK_PERFORMANCE_SIZE);
        for value in [
            self.bytes_read,
            self.bytes_written,
            self.read_time,
            self.write_time,
            self.idle_time,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for value in [
            self.read_count,
            self.write_count,
            self.queue_depth,
            self.split_count,
        ] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.extend_from_slice(&self.query_time.to_le_bytes());
        out.extend_from_slice(&self.storage_device_number.to_le_bytes());

        let mut name = [0u16; 8];
        for (slot, unit) in name.iter_mut().zip(self.storage_manager_name.encode_utf16()) {
            *slot = unit;
        }
        for unit in name {
            out.extend_from_slice(&unit.to_le_bytes());
        }

        out.resize(crate::performance::DISK_PERFORMANCE_SIZE, 0);
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PartitionFixture {
    Mbr { signature: u32, checksum: u32 },
    Gpt { disk_id: [u8; 16] },
    Raw,
}

impl PartitionFixture {
    fn to_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        out.extend_from_slice(&24u32.to_le_bytes());
        match self {
            PartitionFixture::Mbr {
                signature,
                checksum,
            } => {
                out.extend_from_slice(&0u32.to_le_bytes());
                out.extend_from_slice(&signature.to_le_bytes());
                out.extend_from_slice(&checksum.to_le_bytes());
            }
            PartitionFixture::Gpt { disk_id } => {
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&disk_id);
            }
            PartitionFixture::Raw => {
                out.extend_from_slice(&2u32.to_le_bytes());
            }
        }
        out.resize(24, 0);
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DetectionFixture {
    None,
    Int13,
    ExInt13,
}

impl DetectionFixture {
    fn to_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(56);
        out.extend_from_slice(&56u32.to_le_bytes());
        let kind: u32 = match self {
            DetectionFixture::None => 0,
            DetectionFixture::Int13 => 1,
            DetectionFixture::ExInt13 => 2,
        };
        out.extend_from_slice(&kind.to_le_bytes());

        // DISK_INT13_INFO
        out.extend_from_slice(&0x80u16.to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&1023u32.to_le_bytes());
        out.extend_from_slice(&63u16.to_le_bytes());
        out.extend_from_slice(&254u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&[0, 0]);

        // DISK_EX_INT13_INFO
        out.extend_from_slice(&30u16.to_le_bytes());
        out.extend_from_slice(&0x0002u16.to_le_bytes());
        out.extend_from_slice(&16383u32.to_le_bytes());
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&63u32.to_le_bytes());
        out.extend_from_slice(&976_773_168u64.to_le_bytes());
        out.extend_from_slice(&512u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        out.resize(56, 0);
        out
    }
}

/// Builder for a `DISK_GEOMETRY_EX` response. With both descriptors set to
/// `None` only the 32-byte header is produced.
#[derive(Debug, Clone)]
pub struct GeometryFixture {
    pub cylinders: i64,
    pub media_type: u32,
    pub tracks_per_cylinder: u32,
    pub sectors_per_track: u32,
    pub bytes_per_sector: u32,
    pub disk_size: i64,
    pub partition: Option<PartitionFixture>,
    pub detection: Option<DetectionFixture>,
}

impl Default for GeometryFixture {
    fn default() -> Self {
        Self {
            cylinders: 60_801,
            media_type: 12,
            tracks_per_cylinder: 255,
            sectors_per_track: 63,
            bytes_per_sector: 512,
            disk_size: 500_107_862_016,
            partition: Some(PartitionFixture::Mbr {
                signature: 0x4A3F_19C2,
                checksum: 0,
            }),
            detection: Some(DetectionFixture::Int13),
        }
    }
}

impl GeometryFixture {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 24 + 56);
        out.extend_from_slice(&self.cylinders.to_le_bytes());
        out.extend_from_slice(&self.media_type.to_le_bytes());
        out.extend_from_slice(&self.tracks_per_cylinder.to_le_bytes());
        out.extend_from_slice(&self.sectors_per_track.to_le_bytes());
        out.extend_from_slice(&self.bytes_per_sector.to_le_bytes());
        out.extend_from_slice(&self.disk_size.to_le_bytes());

        if let Some(partition) = self.partition {
            out.extend_from_slice(&partition.to_bytes());
        }
        if let Some(detection) = self.detection {
            out.extend_from_slice(&detection.to_bytes());
        }
        out
    }
}

/// Builder for a `DISK_CACHE_INFORMATION` response.
#[derive(Debug, Clone, Default)]
pub struct CacheFixture {
    pub parameters_savable: bool,
    pub read_cache_enabled: bool,
    pub write_cache_enabled: bool,
    pub read_retention: u32,
    pub write_retention: u32,
    pub disable_prefetch_transfer_length: u16,
    pub prefetch_scalar: bool,
    pub prefetch: [u16; 3],
}

impl CacheFixture {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; crate::cache::DISK_CACHE_INFORMATION_SIZE];
        out[0] = self.parameters_savable as u8;
        out[1] = self.read_cache_enabled as u8;
        out[2] = self.write_cache_enabled as u8;
        out[4..8].copy_from_slice(&self.read_retention.to_le_bytes());
        out[8..12].copy_from_slice(&self.write_retention.to_le_bytes());
        out[12..14].copy_from_slice(&self.disable_prefetch_transfer_length.to_le_bytes());
        out[14] = self.prefetch_scalar as u8;
        out[16..18].copy_from_slice(&self.prefetch[0].to_le_bytes());
        out[18..20].copy_from_slice(&self.prefetch[1].to_le_bytes());
        out[20..22].copy_from_slice(&self.prefetch[2].to_le_bytes());
        out
    }
}
