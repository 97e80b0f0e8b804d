//! Little-endian field access over raw control-code output buffers, plus the
//! UTF-16 string helpers shared by the enumeration calls.

use crate::WindriveError;

/// Bounds-checked reader over a fixed-layout response buffer.
///
/// Every accessor takes an absolute offset, mirroring how the Win32 headers
/// document structure fields, and fails with [`WindriveError::SystemQuery`]
/// when the buffer is too short.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    layout: &'static str,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8], layout: &'static str) -> Self {
        Self { buf, layout }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn require(&self, needed: usize) -> Result<(), WindriveError> {
        if self.buf.len() < needed {
            return Err(WindriveError::SystemQuery(format!(
                "{} response truncated: need {} bytes, got {}",
                self.layout,
                needed,
                self.buf.len()
            )));
        }
        Ok(())
    }

    pub fn bytes<const N: usize>(&self, offset: usize) -> Result<[u8; N], WindriveError> {
        self.require(offset + N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[offset..offset + N]);
        Ok(out)
    }

    pub fn u8(&self, offset: usize) -> Result<u8, WindriveError> {
        Ok(self.bytes::<1>(offset)?[0])
    }

    /// Win32 `BOOLEAN`: any non-zero byte is true.
    pub fn flag(&self, offset: usize) -> Result<bool, WindriveError> {
        Ok(self.u8(offset)? != 0)
    }

    pub fn u16(&self, offset: usize) -> Result<u16, WindriveError> {
        Ok(u16::from_le_bytes(self.bytes(offset)?))
    }

    pub fn u32(&self, offset: usize) -> Result<u32, WindriveError> {
        Ok(u32::from_le_bytes(self.bytes(offset)?))
    }

    pub fn i64(&self, offset: usize) -> Result<i64, WindriveError> {
        Ok(i64::from_le_bytes(self.bytes(offset)?))
    }

    pub fn u64(&self, offset: usize) -> Result<u64, WindriveError> {
        Ok(u64::from_le_bytes(self.bytes(offset)?))
    }

    /// `LARGE_INTEGER` that must not be negative (sizes, counts).
    pub fn non_negative(&self, offset: usize, field: &str) -> Result<u64, WindriveError> {
        let value = self.i64(offset)?;
        u64::try_from(value).map_err(|_| {
            WindriveError::SystemQuery(format!(
                "{} reported a negative {}: {}",
                self.layout, field, value
            ))
        })
    }

    /// Fixed-size `WCHAR[N]` field, cut at the first NUL.
    pub fn wide_str(&self, offset: usize, chars: usize) -> Result<String, WindriveError> {
        self.require(offset + chars * 2)?;
        let units: Vec<u16> = self.buf[offset..offset + chars * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(from_wide(&units))
    }

    /// Reader over the tail of the buffer starting at `offset`, for nested
    /// structures whose position is only known at run time.
    pub fn sub(&self, offset: usize, layout: &'static str) -> Result<ByteReader<'a>, WindriveError> {
        self.require(offset)?;
        Ok(ByteReader::new(&self.buf[offset..], layout))
    }
}

/// NUL-terminated UTF-16 copy of `s`, ready to pass as `PCWSTR`.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode UTF-16 up to the first NUL (or the end of the slice).
pub fn from_wide(units: &[u16]) -> String {
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

/// Split a `REG_MULTI_SZ`-style list: NUL-separated strings ended by an empty
/// string. Data after the terminating double NUL is ignored.
pub fn split_multi_sz(units: &[u16]) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in units.split(|&u| u == 0) {
        if chunk.is_empty() {
            break;
        }
        out.push(String::from_utf16_lossy(chunk));
    }
    out
}
