pub mod backend;
pub mod cache;
pub mod config;
pub mod drive;
pub mod error;
pub mod geometry;
pub mod inspector;
pub mod ioctl;
pub mod layout;
pub mod performance;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use backend::DeviceBackend;
pub use cache::{DiskCacheInformation, Prefetch, RetentionPriority};
pub use config::{ConfigError, InspectorConfig};
pub use drive::{ClusterStats, DosDevices, DriveKind, DriveType, LogicalDrive};
pub use error::{ErrorKind, WindriveError};
pub use geometry::{DeviceGeometry, MediaType, PartitionStyle};
pub use inspector::{DiskInfoProvider, DriveInspector, DriveReport, QueryOutcome};
pub use ioctl::ControlCode;
pub use performance::DevicePerformance;
