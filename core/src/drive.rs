use crate::WindriveError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SEPARATOR: char = '\\';

/// Canonicalize a drive identifier before dispatching a device query.
///
/// Enumeration hands out root paths (`C:\`) but the device namespace wants the
/// bare form (`C:`). Whenever the character at index 2 is a separator, the
/// last character is dropped, whatever it is: `C:\Windows` becomes
/// `C:\Window`. Anything else passes through unchanged, including
/// identifiers shorter than three characters and device names such as
/// `PhysicalDrive0`.
pub fn normalize(identifier: &str) -> Result<String, WindriveError> {
    if identifier.is_empty() {
        return Err(WindriveError::InvalidArgument(
            "drive identifier must not be empty".to_string(),
        ));
    }
    if identifier.contains('\0') {
        return Err(WindriveError::InvalidArgument(format!(
            "drive identifier {:?} contains a NUL character",
            identifier
        )));
    }

    let mut normalized = identifier.to_string();
    if identifier.chars().nth(2) == Some(SEPARATOR) {
        normalized.pop();
    }
    Ok(normalized)
}

/// Win32 device namespace path for a normalized identifier: `C:` becomes
/// `\\.\C:`. Paths that are already rooted (`\\.\PhysicalDrive0`,
/// `\\?\Volume{...}`) are left alone.
pub fn device_path(normalized: &str) -> String {
    if normalized.starts_with(r"\\") {
        normalized.to_string()
    } else {
        format!(r"\\.\{}", normalized)
    }
}

/// `GetDriveTypeW` classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveType {
    Unknown,
    NoRootDir,
    Removable,
    Fixed,
    Remote,
    Cdrom,
    Ramdisk,
}

impl DriveType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => DriveType::NoRootDir,
            2 => DriveType::Removable,
            3 => DriveType::Fixed,
            4 => DriveType::Remote,
            5 => DriveType::Cdrom,
            6 => DriveType::Ramdisk,
            _ => DriveType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriveType::Unknown => "UNKNOWN",
            DriveType::NoRootDir => "NO_ROOT_DIR",
            DriveType::Removable => "REMOVABLE",
            DriveType::Fixed => "FIXED",
            DriveType::Remote => "REMOTE",
            DriveType::Cdrom => "CDROM",
            DriveType::Ramdisk => "RAMDISK",
        }
    }
}

/// Free-space figures reported by `GetDiskFreeSpaceW`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    pub sectors_per_cluster: u32,
    pub bytes_per_sector: u32,
    pub free_clusters: u32,
    pub total_clusters: u32,
    pub used_cluster_percent: f64,
    pub free_cluster_percent: f64,
}

impl ClusterStats {
    pub fn new(
        sectors_per_cluster: u32,
        bytes_per_sector: u32,
        free_clusters: u32,
        total_clusters: u32,
    ) -> Self {
        let (free_cluster_percent, used_cluster_percent) = if total_clusters == 0 {
            (0.0, 0.0)
        } else {
            let free = f64::from(free_clusters) / f64::from(total_clusters) * 100.0;
            (free, 100.0 - free)
        };

        Self {
            sectors_per_cluster,
            bytes_per_sector,
            free_clusters,
            total_clusters,
            used_cluster_percent,
            free_cluster_percent,
        }
    }

    pub fn cluster_size(&self) -> u64 {
        u64::from(self.sectors_per_cluster) * u64::from(self.bytes_per_sector)
    }

    pub fn total_bytes(&self) -> u64 {
        self.cluster_size() * u64::from(self.total_clusters)
    }

    pub fn free_bytes(&self) -> u64 {
        self.cluster_size() * u64::from(self.free_clusters)
    }
}

/// Drive type together with the data that type can carry. Optical drives
/// never report cluster statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveKind {
    Unknown {
        #[serde(flatten)]
        clusters: Option<ClusterStats>,
    },
    NoRootDir {
        #[serde(flatten)]
        clusters: Option<ClusterStats>,
    },
    Removable {
        #[serde(flatten)]
        clusters: Option<ClusterStats>,
    },
    Fixed {
        #[serde(flatten)]
        clusters: Option<ClusterStats>,
    },
    Remote {
        #[serde(flatten)]
        clusters: Option<ClusterStats>,
    },
    Cdrom,
    Ramdisk {
        #[serde(flatten)]
        clusters: Option<ClusterStats>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalDrive {
    pub name: String,
    #[serde(flatten)]
    pub kind: DriveKind,
}

impl LogicalDrive {
    /// Statistics handed in for a `Cdrom` drive are discarded.
    pub fn new(name: impl Into<String>, drive_type: DriveType, clusters: Option<ClusterStats>) -> Self {
        let kind = match drive_type {
            DriveType::Unknown => DriveKind::Unknown { clusters },
            DriveType::NoRootDir => DriveKind::NoRootDir { clusters },
            DriveType::Removable => DriveKind::Removable { clusters },
            DriveType::Fixed => DriveKind::Fixed { clusters },
            DriveType::Remote => DriveKind::Remote { clusters },
            DriveType::Cdrom => DriveKind::Cdrom,
            DriveType::Ramdisk => DriveKind::Ramdisk { clusters },
        };
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn drive_type(&self) -> DriveType {
        match self.kind {
            DriveKind::Unknown { .. } => DriveType::Unknown,
            DriveKind::NoRootDir { .. } => DriveType::NoRootDir,
            DriveKind::Removable { .. } => DriveType::Removable,
            DriveKind::Fixed { .. } => DriveType::Fixed,
            DriveKind::Remote { .. } => DriveType::Remote,
            DriveKind::Cdrom => DriveType::Cdrom,
            DriveKind::Ramdisk { .. } => DriveType::Ramdisk,
        }
    }

    pub fn clusters(&self) -> Option<&ClusterStats> {
        match &self.kind {
            DriveKind::Unknown { clusters }
            | DriveKind::NoRootDir { clusters }
            | DriveKind::Removable { clusters }
            | DriveKind::Fixed { clusters }
            | DriveKind::Remote { clusters }
            | DriveKind::Ramdisk { clusters } => clusters.as_ref(),
            DriveKind::Cdrom => None,
        }
    }
}

/// Symbolic DOS device name to the first target it resolves to.
pub type DosDevices = BTreeMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_root_separator() {
        assert_eq!(normalize("C:\\").unwrap(), "C:");
        assert_eq!(normalize("z:\\").unwrap(), "z:");
    }

    #[test]
    fn test_normalize_leaves_device_names_alone() {
        assert_eq!(normalize("PhysicalDrive0").unwrap(), "PhysicalDrive0");
        assert_eq!(normalize("C:").unwrap(), "C:");
        assert_eq!(normalize("C").unwrap(), "C");
        // separator elsewhere does not count
        assert_eq!(normalize("\\\\.\\C:").unwrap(), "\\\\.\\C:");
    }

    #[test]
    fn test_normalize_drops_last_character_after_index_two_separator() {
        assert_eq!(normalize("C:\\Windows").unwrap(), "C:\\Window");
        assert_eq!(normalize("C:\\\\").unwrap(), "C:\\");
    }

    #[test]
    fn test_normalize_is_idempotent_for_roots() {
        for letter in 'A'..='Z' {
            let root = format!("{}:\\", letter);
            let once = normalize(&root).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_normalize_rejects_non_textual_input() {
        assert!(matches!(normalize(""), Err(WindriveError::InvalidArgument(_))));
        assert!(matches!(normalize("C:\0"), Err(WindriveError::InvalidArgument(_))));
    }

    #[test]
    fn test_device_path() {
        assert_eq!(device_path("C:"), r"\\.\C:");
        assert_eq!(device_path("PhysicalDrive1"), r"\\.\PhysicalDrive1");
        assert_eq!(device_path(r"\\.\PhysicalDrive1"), r"\\.\PhysicalDrive1");
    }

    #[test]
    fn test_drive_type_from_raw() {
        assert_eq!(DriveType::from_raw(3), DriveType::Fixed);
        assert_eq!(DriveType::from_raw(5), DriveType::Cdrom);
        assert_eq!(DriveType::from_raw(42), DriveType::Unknown);
        assert_eq!(DriveType::from_raw(1).as_str(), "NO_ROOT_DIR");
    }

    #[test]
    fn test_cluster_percentages() {
        let stats = ClusterStats::new(8, 512, 250, 1000);
        assert_eq!(stats.free_cluster_percent, 25.0);
        assert_eq!(stats.used_cluster_percent, 75.0);
        assert_eq!(stats.cluster_size(), 4096);
        assert_eq!(stats.total_bytes(), 4096 * 1000);
        assert_eq!(stats.free_bytes(), 4096 * 250);

        let empty = ClusterStats::new(8, 512, 0, 0);
        assert_eq!(empty.free_cluster_percent, 0.0);
        assert_eq!(empty.used_cluster_percent, 0.0);
    }

    #[test]
    fn test_cdrom_never_carries_clusters() {
        let drive = LogicalDrive::new("D:\\", DriveType::Cdrom, Some(ClusterStats::new(1, 2048, 0, 10)));
        assert_eq!(drive.drive_type(), DriveType::Cdrom);
        assert!(drive.clusters().is_none());

        let fixed = LogicalDrive::new("C:\\", DriveType::Fixed, Some(ClusterStats::new(8, 512, 1, 2)));
        assert_eq!(fixed.drive_type(), DriveType::Fixed);
        assert_eq!(fixed.clusters().map(|c| c.bytes_per_sector), Some(512));
    }

    #[test]
    fn test_logical_drive_json_shape() {
        let fixed = LogicalDrive::new("C:\\", DriveType::Fixed, Some(ClusterStats::new(8, 512, 250, 1000)));
        let json = serde_json::to_value(&fixed).unwrap();
        assert_eq!(json["name"], "C:\\");
        assert_eq!(json["type"], "FIXED");
        assert_eq!(json["bytesPerSector"], 512);
        assert_eq!(json["freeClusterPercent"], 25.0);

        let cdrom = serde_json::to_value(LogicalDrive::new("E:\\", DriveType::Cdrom, None)).unwrap();
        assert_eq!(cdrom["type"], "CDROM");
        assert!(cdrom.get("bytesPerSector").is_none());
    }
}
