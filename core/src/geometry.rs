use crate::layout::ByteReader;
use crate::WindriveError;
use serde::Serialize;
use uuid::Uuid;

const GEOMETRY_HEADER_SIZE: usize = 32;
const PARTITION_INFO_HEADER_SIZE: usize = 8;
const DETECTION_INFO_HEADER_SIZE: usize = 8;
const INT13_OFFSET: usize = 8;
const EX_INT13_OFFSET: usize = 24;

/// `MEDIA_TYPE`, serialized as its raw numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u32")]
pub enum MediaType {
    Unknown,
    Removable,
    Fixed,
    /// One of the `F3_*` / `F5_*` / `F8_*` floppy formats.
    Floppy(u32),
    Other(u32),
}

impl MediaType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => MediaType::Unknown,
            11 => MediaType::Removable,
            12 => MediaType::Fixed,
            1..=10 | 13..=25 => MediaType::Floppy(value),
            other => MediaType::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            MediaType::Unknown => 0,
            MediaType::Removable => 11,
            MediaType::Fixed => 12,
            MediaType::Floppy(value) | MediaType::Other(value) => value,
        }
    }
}

impl From<MediaType> for u32 {
    fn from(media: MediaType) -> u32 {
        media.raw()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceGeometry {
    pub disk_size: u64,
    pub media_type: MediaType,
    pub cylinders: u64,
    pub bytes_per_sector: u32,
    pub sectors_per_track: u32,
    pub tracks_per_cylinder: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionInfo {
    pub size: u32,
    #[serde(flatten)]
    pub style: PartitionStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "style", rename_all = "UPPERCASE")]
pub enum PartitionStyle {
    Mbr {
        signature: u32,
        checksum: u32,
    },
    Gpt {
        #[serde(rename = "diskId")]
        disk_id: Uuid,
    },
    Raw,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionInfo {
    pub size: u32,
    #[serde(flatten)]
    pub detection: Detection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Detection {
    None,
    Int13(Int13Info),
    ExInt13 {
        int13: Int13Info,
        #[serde(flatten)]
        ex: ExInt13Info,
    },
}

/// `DISK_INT13_INFO`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Int13Info {
    pub drive_select: u16,
    pub max_cylinders: u32,
    pub sectors_per_track: u16,
    pub max_heads: u16,
    pub number_drives: u16,
}

/// `DISK_EX_INT13_INFO`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExInt13Info {
    pub ex_buffer_size: u16,
    pub ex_flags: u16,
    pub ex_cylinders: u32,
    pub ex_heads: u32,
    pub ex_sectors_per_track: u32,
    pub ex_sectors_per_drive: u64,
    pub ex_sector_size: u16,
    pub ex_reserved: u16,
}

impl DeviceGeometry {
    /// Decode a `DISK_GEOMETRY_EX` response.
    ///
    /// The partition and detection descriptors live in the variable-length
    /// `Data` tail; drivers that stop after the fixed header yield `None` for
    /// both.
    pub fn decode(buf: &[u8]) -> Result<Self, WindriveError> {
        let r = ByteReader::new(buf, "DISK_GEOMETRY_EX");
        r.require(GEOMETRY_HEADER_SIZE)?;

        let mut geometry = Self {
            cylinders: r.non_negative(0, "Cylinders")?,
            media_type: MediaType::from_raw(r.u32(8)?),
            tracks_per_cylinder: r.u32(12)?,
            sectors_per_track: r.u32(16)?,
            bytes_per_sector: r.u32(20)?,
            disk_size: r.non_negative(24, "DiskSize")?,
            partition: None,
            detection: None,
        };

        if r.len() == GEOMETRY_HEADER_SIZE {
            return Ok(geometry);
        }

        let partition = PartitionInfo::decode(&r.sub(GEOMETRY_HEADER_SIZE, "DISK_PARTITION_INFO")?)?;
        let detection_offset = GEOMETRY_HEADER_SIZE + partition.size as usize;
        let detection = DetectionInfo::decode(&r.sub(detection_offset, "DISK_DETECTION_INFO")?)?;

        geometry.partition = Some(partition);
        geometry.detection = Some(detection);
        Ok(geometry)
    }
}

impl PartitionInfo {
    fn decode(r: &ByteReader<'_>) -> Result<Self, WindriveError> {
        r.require(PARTITION_INFO_HEADER_SIZE)?;
        let size = r.u32(0)?;
        if (size as usize) < PARTITION_INFO_HEADER_SIZE {
            return Err(WindriveError::SystemQuery(format!(
                "DISK_PARTITION_INFO reports an impossible size of {} bytes",
                size
            )));
        }

        let style = match r.u32(4)? {
            0 => PartitionStyle::Mbr {
                signature: r.u32(8)?,
                checksum: r.u32(12)?,
            },
            1 => PartitionStyle::Gpt {
                disk_id: read_guid(r, 8)?,
            },
            2 => PartitionStyle::Raw,
            other => {
                return Err(WindriveError::SystemQuery(format!(
                    "unknown partition style {}",
                    other
                )))
            }
        };

        Ok(Self { size, style })
    }
}

impl DetectionInfo {
    fn decode(r: &ByteReader<'_>) -> Result<Self, WindriveError> {
        r.require(DETECTION_INFO_HEADER_SIZE)?;
        let size = r.u32(0)?;

        let detection = match r.u32(4)? {
            0 => Detection::None,
            1 => Detection::Int13(read_int13(r, INT13_OFFSET)?),
            2 => Detection::ExInt13 {
                int13: read_int13(r, INT13_OFFSET)?,
                ex: read_ex_int13(r, EX_INT13_OFFSET)?,
            },
            other => {
                return Err(WindriveError::SystemQuery(format!(
                    "unknown detection type {}",
                    other
                )))
            }
        };

        Ok(Self { size, detection })
    }
}

fn read_int13(r: &ByteReader<'_>, at: usize) -> Result<Int13Info, WindriveError> {
    Ok(Int13Info {
        drive_select: r.u16(at)?,
        max_cylinders: r.u32(at + 4)?,
        sectors_per_track: r.u16(at + 8)?,
        max_heads: r.u16(at + 10)?,
        number_drives: r.u16(at + 12)?,
    })
}

fn read_ex_int13(r: &ByteReader<'_>, at: usize) -> Result<ExInt13Info, WindriveError> {
    Ok(ExInt13Info {
        ex_buffer_size: r.u16(at)?,
        ex_flags: r.u16(at + 2)?,
        ex_cylinders: r.u32(at + 4)?,
        ex_heads: r.u32(at + 8)?,
        ex_sectors_per_track: r.u32(at + 12)?,
        ex_sectors_per_drive: r.u64(at + 16)?,
        ex_sector_size: r.u16(at + 24)?,
        ex_reserved: r.u16(at + 26)?,
    })
}

/// Windows `GUID`: three little-endian fields followed by eight raw bytes.
fn read_guid(r: &ByteReader<'_>, at: usize) -> Result<Uuid, WindriveError> {
    let data4: [u8; 8] = r.bytes(at + 8)?;
    Ok(Uuid::from_fields(r.u32(at)?, r.u16(at + 4)?, r.u16(at + 6)?, &data4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DetectionFixture, GeometryFixture, PartitionFixture};

    #[test]
    fn test_decode_mbr_geometry_with_int13_detection() {
        let fixture = GeometryFixture {
            cylinders: 60_801,
            media_type: 12,
            tracks_per_cylinder: 255,
            sectors_per_track: 63,
            bytes_per_sector: 512,
            disk_size: 500_107_862_016,
            partition: Some(PartitionFixture::Mbr {
                signature: 0xDEAD_BEEF,
                checksum: 0x1234,
            }),
            detection: Some(DetectionFixture::Int13),
        };
        let geometry = DeviceGeometry::decode(&fixture.to_bytes()).unwrap();

        assert_eq!(geometry.cylinders, 60_801);
        assert_eq!(geometry.media_type, MediaType::Fixed);
        assert_eq!(geometry.tracks_per_cylinder, 255);
        assert_eq!(geometry.sectors_per_track, 63);
        assert_eq!(geometry.bytes_per_sector, 512);
        assert_eq!(geometry.disk_size, 500_107_862_016);

        let partition = geometry.partition.unwrap();
        assert_eq!(partition.size, 24);
        assert_eq!(
            partition.style,
            PartitionStyle::Mbr {
                signature: 0xDEAD_BEEF,
                checksum: 0x1234
            }
        );

        let detection = geometry.detection.unwrap();
        match detection.detection {
            Detection::Int13(info) => {
                assert_eq!(info.sectors_per_track, 63);
                assert_eq!(info.max_heads, 254);
            }
            other => panic!("expected Int13 detection, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_gpt_geometry_with_ex_int13_detection() {
        let fixture = GeometryFixture {
            partition: Some(PartitionFixture::Gpt {
                disk_id: [
                    0x78, 0x56, 0x34, 0x12, 0x34, 0x12, 0x78, 0x56, 0x9A, 0xBC, 0xDE, 0xF0, 0x12,
                    0x34, 0x56, 0x78,
                ],
            }),
            detection: Some(DetectionFixture::ExInt13),
            ..Default::default()
        };
        let geometry = DeviceGeometry::decode(&fixture.to_bytes()).unwrap();

        match geometry.partition.unwrap().style {
            PartitionStyle::Gpt { disk_id } => assert_eq!(
                disk_id.hyphenated().to_string(),
                "12345678-1234-5678-9abc-def012345678"
            ),
            other => panic!("expected GPT, got {:?}", other),
        }

        match geometry.detection.unwrap().detection {
            Detection::ExInt13 { int13, ex } => {
                assert_eq!(int13.drive_select, 0x80);
                assert_eq!(ex.ex_sector_size, 512);
                assert_eq!(ex.ex_sectors_per_drive, 976_773_168);
            }
            other => panic!("expected ExInt13 detection, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_raw_partition_without_detection() {
        let fixture = GeometryFixture {
            partition: Some(PartitionFixture::Raw),
            detection: Some(DetectionFixture::None),
            ..Default::default()
        };
        let geometry = DeviceGeometry::decode(&fixture.to_bytes()).unwrap();

        let partition = geometry.partition.as_ref().unwrap();
        assert_eq!(partition.style, PartitionStyle::Raw);
        let detection = geometry.detection.as_ref().unwrap();
        assert_eq!(detection.size, 56);
        assert_eq!(detection.detection, Detection::None);

        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["partition"]["style"], "RAW");
        assert!(json["partition"].get("signature").is_none());
        assert_eq!(json["detection"]["type"], "None");
        assert!(json["detection"].get("maxHeads").is_none());
    }

    #[test]
    fn test_header_only_response_has_no_descriptors() {
        let fixture = GeometryFixture {
            partition: None,
            detection: None,
            ..Default::default()
        };
        let bytes = fixture.to_bytes();
        assert_eq!(bytes.len(), 32);

        let geometry = DeviceGeometry::decode(&bytes).unwrap();
        assert!(geometry.partition.is_none());
        assert!(geometry.detection.is_none());
    }

    #[test]
    fn test_negative_disk_size_is_rejected() {
        let mut bytes = GeometryFixture::default().to_bytes();
        bytes[24..32].copy_from_slice(&(-1i64).to_le_bytes());
        assert!(DeviceGeometry::decode(&bytes).is_err());
    }

    #[test]
    fn test_unknown_partition_style_is_rejected() {
        let mut bytes = GeometryFixture::default().to_bytes();
        bytes[36..40].copy_from_slice(&9u32.to_le_bytes());
        assert!(DeviceGeometry::decode(&bytes).is_err());
    }

    #[test]
    fn test_media_type_classification() {
        assert_eq!(MediaType::from_raw(2), MediaType::Floppy(2));
        assert_eq!(MediaType::from_raw(11), MediaType::Removable);
        assert_eq!(MediaType::from_raw(0x20), MediaType::Other(0x20));
        assert_eq!(MediaType::from_raw(12).raw(), 12);
    }

    #[test]
    fn test_geometry_json_shape() {
        let geometry = DeviceGeometry::decode(&GeometryFixture::default().to_bytes()).unwrap();
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["mediaType"], 12);
        assert_eq!(json["partition"]["style"], "MBR");
        assert_eq!(json["partition"]["size"], 24);
        assert_eq!(json["detection"]["type"], "Int13");
    }
}
