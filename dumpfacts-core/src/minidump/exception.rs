use super::Location;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;
use crate::types::ExceptionFacts;

/// Size of a `MINIDUMP_EXCEPTION_STREAM`.
pub const EXCEPTION_STREAM_SIZE: u64 = 0xa8;

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct ExceptionStream {
    pub thread_id: u32,
    pub exception: ExceptionFacts,
    /// Context of the faulting thread at the time of the exception.
    pub context: Location,
}

impl ExceptionStream {
    /// ```text
    /// 0x00 ThreadId         u32
    /// 0x08 ExceptionRecord  MINIDUMP_EXCEPTION
    /// 0xa0 ThreadContext    MINIDUMP_LOCATION_DESCRIPTOR
    /// ```
    pub fn decode(reader: &BinaryReader, location: Location) -> Result<Self> {
        let stream = location.reader(reader, "exception stream")?;
        if stream.len() < EXCEPTION_STREAM_SIZE {
            return Err(Error::TruncatedBuffer("exception stream"));
        }

        Ok(Self {
            thread_id: stream.read_u32(0)?,
            exception: ExceptionFacts::decode64(&stream, 0x8)?,
            context: Location::decode(&stream, 0xa0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_stream() {
        let mut buf = vec![0u8; EXCEPTION_STREAM_SIZE as usize];
        buf[0..4].copy_from_slice(&0x1a4u32.to_le_bytes());
        buf[8..12].copy_from_slice(&0xC000_0005u32.to_le_bytes());
        buf[0x18..0x20].copy_from_slice(&0x1500u64.to_le_bytes());
        buf[0x20..0x24].copy_from_slice(&2u32.to_le_bytes());
        buf[0x28..0x30].copy_from_slice(&0u64.to_le_bytes());
        buf[0x30..0x38].copy_from_slice(&0x18u64.to_le_bytes());
        buf[0xa0..0xa4].copy_from_slice(&0x4d0u32.to_le_bytes());
        buf[0xa4..0xa8].copy_from_slice(&0x200u32.to_le_bytes());

        let stream = ExceptionStream::decode(
            &BinaryReader::new(&buf),
            Location::new(EXCEPTION_STREAM_SIZE as u32, 0),
        )
        .unwrap();
        assert_eq!(stream.thread_id, 0x1a4);
        assert_eq!(stream.exception.code, 0xC000_0005);
        assert_eq!(stream.exception.address, 0x1500);
        assert_eq!(stream.exception.info, vec![0, 0x18]);
        assert_eq!(stream.context, Location::new(0x4d0, 0x200));
    }

    #[test]
    fn short_stream() {
        let buf = vec![0u8; 0x40];
        assert_eq!(
            ExceptionStream::decode(&BinaryReader::new(&buf), Location::new(0x40, 0)),
            Err(Error::TruncatedBuffer("exception stream"))
        );
    }
}
