/*!
Bounds-checked little-endian reads over an immutable dump buffer.

All offset arithmetic of the decoders goes through [`BinaryReader`]. Offsets are taken as `u64`
so values read from the file can be passed in without truncating casts, every access is checked
against the end of the buffer and failures are reported as [`Error::TruncatedRead`].
*/

use std::convert::TryFrom;
use std::fmt;
use std::mem::size_of;

use dataview::{DataView, Pod};
use widestring::U16String;

use crate::error::{Error, Result};

/// Upper bound for length-prefixed strings. Longer prefixes are treated as corrupt.
pub const MAX_STRING_BYTES: u64 = 0x1_0000;

#[derive(Clone, Copy)]
pub struct BinaryReader<'a> {
    bytes: &'a [u8],
    // absolute file offset of `bytes[0]`, only used for error reporting
    base: u64,
}

impl<'a> BinaryReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, base: 0 }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Absolute file offset of the first byte of this reader.
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns true if `width` bytes can be read at `offset`.
    pub fn contains(&self, offset: u64, width: u64) -> bool {
        self.check(offset, width).is_ok()
    }

    fn check(&self, offset: u64, width: u64) -> Result<usize> {
        let err = Error::TruncatedRead {
            offset: self.base.saturating_add(offset),
            width,
        };
        let end = offset.checked_add(width).ok_or(err)?;
        if end > self.len() {
            return Err(err);
        }
        usize::try_from(offset).map_err(|_| err)
    }

    /// Reads a plain-old-data structure at `offset`. The value is read unaligned.
    pub fn read_pod<T: Pod>(&self, offset: u64) -> Result<T> {
        let width = size_of::<T>() as u64;
        let start = self.check(offset, width)?;
        DataView::from(self.bytes)
            .try_read::<T>(start)
            .ok_or(Error::TruncatedRead {
                offset: self.base.saturating_add(offset),
                width,
            })
    }

    pub fn read_u8(&self, offset: u64) -> Result<u8> {
        self.read_pod::<u8>(offset)
    }

    pub fn read_u16(&self, offset: u64) -> Result<u16> {
        self.read_pod::<u16>(offset).map(u16::from_le)
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        self.read_pod::<u32>(offset).map(u32::from_le)
    }

    pub fn read_u64(&self, offset: u64) -> Result<u64> {
        self.read_pod::<u64>(offset).map(u64::from_le)
    }

    pub fn read_i64(&self, offset: u64) -> Result<i64> {
        self.read_pod::<i64>(offset).map(i64::from_le)
    }

    /// Reads a pointer sized value, `width` being 4 or 8 bytes.
    pub fn read_ptr(&self, offset: u64, width: u64) -> Result<u64> {
        match width {
            4 => self.read_u32(offset).map(u64::from),
            8 => self.read_u64(offset),
            _ => Err(Error::InvalidArchitecture),
        }
    }

    pub fn read_bytes(&self, offset: u64, len: u64) -> Result<&'a [u8]> {
        let start = self.check(offset, len)?;
        // check() guarantees start + len <= bytes.len()
        Ok(&self.bytes[start..start + len as usize])
    }

    /// Reads a fixed size ascii field. The value ends at the first nul byte,
    /// non-ascii bytes are replaced.
    pub fn read_fixed_ascii(&self, offset: u64, len: u64) -> Result<String> {
        let bytes = self.read_bytes(offset, len)?;
        Ok(bytes
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| {
                if b.is_ascii() {
                    b as char
                } else {
                    std::char::REPLACEMENT_CHARACTER
                }
            })
            .collect())
    }

    /// Reads a nul terminated ascii string of at most `max_len` bytes.
    pub fn read_c_string(&self, offset: u64, max_len: u64) -> Result<String> {
        let available = self.len().saturating_sub(offset).min(max_len);
        if available == 0 {
            return Err(Error::TruncatedRead {
                offset: self.base.saturating_add(offset),
                width: 1,
            });
        }
        self.read_fixed_ascii(offset, available)
    }

    /// Reads `char_count` utf-16 code units. The string ends at the first nul code unit,
    /// invalid surrogates are replaced.
    pub fn read_utf16(&self, offset: u64, char_count: u64) -> Result<String> {
        let width = char_count.checked_mul(2).ok_or(Error::TruncatedRead {
            offset: self.base.saturating_add(offset),
            width: u64::MAX,
        })?;
        let bytes = self.read_bytes(offset, width)?;
        let units = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&c| c != 0)
            .collect::<Vec<u16>>();
        Ok(U16String::from_vec(units).to_string_lossy())
    }

    /// Reads a `MINIDUMP_STRING`: a u32 length in bytes followed by the utf-16 buffer.
    pub fn read_utf16_prefixed(&self, offset: u64) -> Result<String> {
        let len = u64::from(self.read_u32(offset)?);
        if len % 2 != 0 {
            return Err(Error::Encoding);
        }
        if len > MAX_STRING_BYTES {
            return Err(Error::TruncatedBuffer("string length prefix too large"));
        }
        self.read_utf16(offset + 4, len / 2)
    }

    /// Reads a `DUMP_STRING`: a u32 length in characters followed by the utf-16 buffer.
    pub fn read_counted_utf16(&self, offset: u64) -> Result<String> {
        let chars = u64::from(self.read_u32(offset)?);
        if chars * 2 > MAX_STRING_BYTES {
            return Err(Error::TruncatedBuffer("string length prefix too large"));
        }
        self.read_utf16(offset + 4, chars)
    }

    /// Returns a reader over `len` bytes starting at `offset`.
    ///
    /// Offsets passed to the returned reader are relative to `offset`.
    pub fn sub_reader(&self, offset: u64, len: u64) -> Result<BinaryReader<'a>> {
        let bytes = self.read_bytes(offset, len)?;
        Ok(BinaryReader {
            bytes,
            base: self.base.saturating_add(offset),
        })
    }
}

impl<'a> fmt::Debug for BinaryReader<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryReader({} bytes at {:#x})", self.bytes.len(), self.base)
    }
}

impl<'a> From<&'a [u8]> for BinaryReader<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_reads() {
        let buf = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xff,
        ];
        let reader = BinaryReader::new(&buf);
        assert_eq!(reader.read_u8(0).unwrap(), 0x01);
        assert_eq!(reader.read_u16(0).unwrap(), 0x0201);
        assert_eq!(reader.read_u32(1).unwrap(), 0x0504_0302);
        assert_eq!(reader.read_u64(0).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(reader.read_i64(8).unwrap(), -1);
        assert_eq!(reader.read_ptr(0, 4).unwrap(), 0x0403_0201);
    }

    #[test]
    fn out_of_bounds() {
        let buf = [0u8; 8];
        let reader = BinaryReader::new(&buf);
        assert_eq!(
            reader.read_u64(1),
            Err(Error::TruncatedRead {
                offset: 1,
                width: 8
            })
        );
        assert!(reader.read_u32(u64::MAX - 1).is_err());
        assert!(reader.read_bytes(4, u64::MAX).is_err());
        assert!(reader.read_utf16(0, u64::MAX).is_err());
        assert!(reader.read_u8(8).is_err());
        assert_eq!(reader.read_bytes(8, 0).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn sub_reader_offsets() {
        let buf = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let reader = BinaryReader::new(&buf);
        let sub = reader.sub_reader(4, 4).unwrap();
        assert_eq!(sub.base(), 4);
        assert_eq!(sub.read_u8(0).unwrap(), 4);
        assert_eq!(
            sub.read_u32(2),
            Err(Error::TruncatedRead {
                offset: 6,
                width: 4
            })
        );
        assert!(reader.sub_reader(6, 4).is_err());
    }

    #[test]
    fn strings() {
        let mut buf = vec![];
        buf.extend_from_slice(&8u32.to_le_bytes());
        for c in "ab.s".encode_utf16() {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        buf.extend_from_slice(b"PAGE\0\xffxx");

        let reader = BinaryReader::new(&buf);
        assert_eq!(reader.read_utf16_prefixed(0).unwrap(), "ab.s");
        assert_eq!(reader.read_utf16(4, 2).unwrap(), "ab");
        assert_eq!(reader.read_fixed_ascii(12, 4).unwrap(), "PAGE");
        assert_eq!(reader.read_fixed_ascii(12, 8).unwrap(), "PAGE");
        assert_eq!(reader.read_c_string(12, 0x100).unwrap(), "PAGE");

        let mut counted = vec![];
        counted.extend_from_slice(&3u32.to_le_bytes());
        for c in "x.y".encode_utf16() {
            counted.extend_from_slice(&c.to_le_bytes());
        }
        assert_eq!(
            BinaryReader::new(&counted).read_counted_utf16(0).unwrap(),
            "x.y"
        );
    }

    #[test]
    fn odd_string_length() {
        let mut buf = vec![];
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&[0x41, 0x00, 0x42]);
        assert_eq!(
            BinaryReader::new(&buf).read_utf16_prefixed(0),
            Err(Error::Encoding)
        );
    }

    #[test]
    fn oversized_string_prefix() {
        let mut buf = vec![];
        buf.extend_from_slice(&0xffff_fff0u32.to_le_bytes());
        assert!(BinaryReader::new(&buf)
            .read_utf16_prefixed(0)
            .unwrap_err()
            .is_truncation());
    }
}
