use log::debug;

use crate::error::Result;
use crate::reader::BinaryReader;

/// Maximum number of parameters of an `EXCEPTION_RECORD`.
pub const EXCEPTION_MAXIMUM_PARAMETERS: usize = 15;

/// Size of an `EXCEPTION_RECORD64`.
pub const EXCEPTION_RECORD64_SIZE: u64 = 0x98;

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct ExceptionFacts {
    pub code: u32,
    pub flags: u32,
    pub address: u64,
    /// `ExceptionInformation`, at most 15 entries.
    pub info: Vec<u64>,
}

impl ExceptionFacts {
    /// Decodes an `EXCEPTION_RECORD64` located at `offset`.
    ///
    /// ```text
    /// 0x00 ExceptionCode        u32
    /// 0x04 ExceptionFlags       u32
    /// 0x08 ExceptionRecord      u64
    /// 0x10 ExceptionAddress     u64
    /// 0x18 NumberParameters     u32
    /// 0x20 ExceptionInformation [u64; 15]
    /// ```
    pub fn decode64(reader: &BinaryReader, offset: u64) -> Result<Self> {
        let code = reader.read_u32(offset)?;
        let flags = reader.read_u32(offset + 0x4)?;
        let address = reader.read_u64(offset + 0x10)?;

        let mut count = reader.read_u32(offset + 0x18)? as usize;
        if count > EXCEPTION_MAXIMUM_PARAMETERS {
            debug!(
                "exception record claims {} parameters, clamping to {}",
                count, EXCEPTION_MAXIMUM_PARAMETERS
            );
            count = EXCEPTION_MAXIMUM_PARAMETERS;
        }

        let info = (0..count as u64)
            .map(|i| reader.read_u64(offset + 0x20 + i * 8))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            code,
            flags,
            address,
            info,
        })
    }

    /// True if the `EXCEPTION_NONCONTINUABLE` flag is set.
    pub fn is_noncontinuable(&self) -> bool {
        self.flags & 0x1 != 0
    }

    /// For access violations (0xC0000005) and in-page errors (0xC0000006) returns the
    /// access kind and the inaccessible address.
    pub fn access_violation(&self) -> Option<(AccessKind, u64)> {
        if self.code != 0xC000_0005 && self.code != 0xC000_0006 {
            return None;
        }
        if self.info.len() < 2 {
            return None;
        }
        let kind = match self.info[0] {
            0 => AccessKind::Read,
            1 => AccessKind::Write,
            8 => AccessKind::Execute,
            _ => AccessKind::Unknown,
        };
        Some((kind, self.info[1]))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum AccessKind {
    Read,
    Write,
    Execute,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: u32, params: &[u64], claimed: u32) -> Vec<u8> {
        let mut buf = vec![0u8; EXCEPTION_RECORD64_SIZE as usize];
        buf[0..4].copy_from_slice(&code.to_le_bytes());
        buf[4..8].copy_from_slice(&1u32.to_le_bytes());
        buf[0x10..0x18].copy_from_slice(&0xfffff801_12345678u64.to_le_bytes());
        buf[0x18..0x1c].copy_from_slice(&claimed.to_le_bytes());
        for (i, p) in params.iter().enumerate() {
            let at = 0x20 + i * 8;
            buf[at..at + 8].copy_from_slice(&p.to_le_bytes());
        }
        buf
    }

    #[test]
    fn decode_access_violation() {
        let buf = record(0xC000_0005, &[1, 0x10], 2);
        let facts = ExceptionFacts::decode64(&BinaryReader::new(&buf), 0).unwrap();
        assert_eq!(facts.code, 0xC000_0005);
        assert_eq!(facts.address, 0xfffff801_12345678);
        assert_eq!(facts.info, vec![1, 0x10]);
        assert!(facts.is_noncontinuable());
        assert_eq!(facts.access_violation(), Some((AccessKind::Write, 0x10)));
    }

    #[test]
    fn parameter_count_is_clamped() {
        let buf = record(0x8000_0003, &[], 0xffff);
        let facts = ExceptionFacts::decode64(&BinaryReader::new(&buf), 0).unwrap();
        assert_eq!(facts.info.len(), EXCEPTION_MAXIMUM_PARAMETERS);
        assert_eq!(facts.access_violation(), None);
    }

    #[test]
    fn truncated_record() {
        let buf = record(0xC000_0005, &[], 0);
        assert!(ExceptionFacts::decode64(&BinaryReader::new(&buf[..0x10]), 0)
            .unwrap_err()
            .is_truncation());
    }
}
