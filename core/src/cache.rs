use crate::layout::ByteReader;
use crate::WindriveError;
use serde::Serialize;

/// `sizeof(DISK_CACHE_INFORMATION)`: 22 bytes of fields padded to 4-byte
/// alignment by the retention-priority enums.
pub const DISK_CACHE_INFORMATION_SIZE: usize = 24;

/// `DISK_CACHE_RETENTION_PRIORITY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RetentionPriority {
    EqualPriority,
    KeepPrefetchedData,
    KeepReadData,
}

impl RetentionPriority {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(RetentionPriority::EqualPriority),
            1 => Some(RetentionPriority::KeepPrefetchedData),
            2 => Some(RetentionPriority::KeepReadData),
            _ => None,
        }
    }
}

/// The prefetch union of `DISK_CACHE_INFORMATION`, selected by its
/// `PrefetchScalar` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Prefetch {
    #[serde(rename_all = "camelCase")]
    ScalarPrefetch {
        minimum: u16,
        maximum: u16,
        maximum_blocks: u16,
    },
    BlockPrefetch { minimum: u16, maximum: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskCacheInformation {
    pub parameters_savable: bool,
    pub read_cache_enabled: bool,
    pub write_cache_enabled: bool,
    pub read_retention_priority: RetentionPriority,
    pub write_retention_priority: RetentionPriority,
    pub disable_prefetch_transfer_length: u16,
    pub prefetch_scalar: bool,
    #[serde(flatten)]
    pub prefetch: Prefetch,
}

impl DiskCacheInformation {
    pub fn decode(buf: &[u8]) -> Result<Self, WindriveError> {
        let r = ByteReader::new(buf, "DISK_CACHE_INFORMATION");
        r.require(DISK_CACHE_INFORMATION_SIZE)?;

        let prefetch_scalar = r.flag(14)?;
        let prefetch = if prefetch_scalar {
            Prefetch::ScalarPrefetch {
                minimum: r.u16(16)?,
                maximum: r.u16(18)?,
                maximum_blocks: r.u16(20)?,
            }
        } else {
            Prefetch::BlockPrefetch {
                minimum: r.u16(16)?,
                maximum: r.u16(18)?,
            }
        };

        Ok(Self {
            parameters_savable: r.flag(0)?,
            read_cache_enabled: r.flag(1)?,
            write_cache_enabled: r.flag(2)?,
            read_retention_priority: retention(&r, 4)?,
            write_retention_priority: retention(&r, 8)?,
            disable_prefetch_transfer_length: r.u16(12)?,
            prefetch_scalar,
            prefetch,
        })
    }

    pub fn scalar_prefetch(&self) -> Option<(u16, u16, u16)> {
        match self.prefetch {
            Prefetch::ScalarPrefetch {
                minimum,
                maximum,
                maximum_blocks,
            } => Some((minimum, maximum, maximum_blocks)),
            Prefetch::BlockPrefetch { .. } => None,
        }
    }

    pub fn block_prefetch(&self) -> Option<(u16, u16)> {
        match self.prefetch {
            Prefetch::BlockPrefetch { minimum, maximum } => Some((minimum, maximum)),
            Prefetch::ScalarPrefetch { .. } => None,
        }
    }
}

fn retention(r: &ByteReader<'_>, offset: usize) -> Result<RetentionPriority, WindriveError> {
    let raw = r.u32(offset)?;
    RetentionPriority::from_raw(raw).ok_or_else(|| {
        WindriveError::SystemQuery(format!("unknown cache retention priority {}", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CacheFixture;

    #[test]
    fn test_decode_scalar_prefetch() {
        let fixture = CacheFixture {
            read_cache_enabled: true,
            write_cache_enabled: true,
            prefetch_scalar: true,
            prefetch: [1, 8, 64],
            read_retention: 2,
            ..Default::default()
        };
        let info = DiskCacheInformation::decode(&fixture.to_bytes()).unwrap();

        assert!(info.read_cache_enabled);
        assert!(info.write_cache_enabled);
        assert!(!info.parameters_savable);
        assert_eq!(info.read_retention_priority, RetentionPriority::KeepReadData);
        assert_eq!(info.write_retention_priority, RetentionPriority::EqualPriority);
        assert!(info.prefetch_scalar);
        assert_eq!(info.scalar_prefetch(), Some((1, 8, 64)));
        assert_eq!(info.block_prefetch(), None);
    }

    #[test]
    fn test_decode_block_prefetch_ignores_third_word() {
        let fixture = CacheFixture {
            prefetch_scalar: false,
            prefetch: [4, 16, 0xFFFF],
            ..Default::default()
        };
        let info = DiskCacheInformation::decode(&fixture.to_bytes()).unwrap();

        assert!(!info.prefetch_scalar);
        assert_eq!(info.block_prefetch(), Some((4, 16)));
        assert_eq!(info.scalar_prefetch(), None);
    }

    #[test]
    fn test_prefetch_variants_are_exclusive_in_json() {
        let scalar = DiskCacheInformation::decode(
            &CacheFixture {
                prefetch_scalar: true,
                ..Default::default()
            }
            .to_bytes(),
        )
        .unwrap();
        let json = serde_json::to_value(&scalar).unwrap();
        assert_eq!(json["prefetchScalar"], true);
        assert!(json.get("scalarPrefetch").is_some());
        assert!(json.get("blockPrefetch").is_none());
        assert!(json["scalarPrefetch"].get("maximumBlocks").is_some());

        let block = DiskCacheInformation::decode(&CacheFixture::default().to_bytes()).unwrap();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["prefetchScalar"], false);
        assert!(json.get("scalarPrefetch").is_none());
        assert!(json.get("blockPrefetch").is_some());
    }

    #[test]
    fn test_unknown_retention_priority_is_rejected() {
        let fixture = CacheFixture {
            read_retention: 7,
            ..Default::default()
        };
        assert!(DiskCacheInformation::decode(&fixture.to_bytes()).is_err());
    }
}
