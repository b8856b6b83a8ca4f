use std::iter::FromIterator;

use log::debug;

use super::Location;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;

/// Default number of stack bytes looked at from the stack pointer upwards.
pub const DEFAULT_STACK_WINDOW: u64 = 32 * 1024;

const MEMORY_DESCRIPTOR_SIZE: u64 = 0x10;
const MEMORY_DESCRIPTOR64_SIZE: u64 = 0x10;

/// A captured range of virtual memory and its location in the file.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct MemoryRange {
    pub start: u64,
    pub size: u64,
    pub file_offset: u64,
}

impl MemoryRange {
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end()
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct MemoryList {
    ranges: Vec<MemoryRange>,
}

impl MemoryList {
    pub fn ranges(&self) -> &[MemoryRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn extend<I: IntoIterator<Item = MemoryRange>>(&mut self, ranges: I) {
        self.ranges.extend(ranges)
    }

    pub fn find(&self, addr: u64) -> Option<&MemoryRange> {
        self.ranges.iter().find(|r| r.contains(addr))
    }

    /// Reads up to `max_len` bytes at `addr`, clamped to the end of the containing range.
    pub fn read<'a>(
        &self,
        reader: &BinaryReader<'a>,
        addr: u64,
        max_len: u64,
    ) -> Option<&'a [u8]> {
        let range = self.find(addr)?;
        let skip = addr - range.start;
        let len = (range.size - skip).min(max_len);
        match reader.read_bytes(range.file_offset.checked_add(skip)?, len) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                debug!(
                    "memory range {:#x} is not backed by the file: {}",
                    range.start, err
                );
                None
            }
        }
    }
}

impl FromIterator<MemoryRange> for MemoryList {
    fn from_iter<I: IntoIterator<Item = MemoryRange>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

/// Decodes a `MINIDUMP_MEMORY_LIST` stream.
pub fn decode_memory_list(reader: &BinaryReader, location: Location) -> Result<Vec<MemoryRange>> {
    let stream = location.reader(reader, "memory list")?;
    let count = u64::from(stream.read_u32(0)?);
    if !stream.contains(4, count * MEMORY_DESCRIPTOR_SIZE) {
        return Err(Error::TruncatedBuffer("memory list"));
    }

    (0..count)
        .map(|i| {
            let entry = 4 + i * MEMORY_DESCRIPTOR_SIZE;
            Ok(MemoryRange {
                start: stream.read_u64(entry)?,
                size: u64::from(stream.read_u32(entry + 8)?),
                file_offset: u64::from(stream.read_u32(entry + 12)?),
            })
        })
        .collect()
}

/// Decodes a `MINIDUMP_MEMORY64_LIST` stream. Range data is stored back to back from the
/// stream's base rva.
pub fn decode_memory64_list(
    reader: &BinaryReader,
    location: Location,
) -> Result<Vec<MemoryRange>> {
    let stream = location.reader(reader, "memory64 list")?;
    let count = stream.read_u64(0)?;
    let base_rva = stream.read_u64(8)?;
    let table_size = count
        .checked_mul(MEMORY_DESCRIPTOR64_SIZE)
        .ok_or(Error::TruncatedBuffer("memory64 list"))?;
    if !stream.contains(0x10, table_size) {
        return Err(Error::TruncatedBuffer("memory64 list"));
    }

    let mut file_offset = base_rva;
    let mut ranges = Vec::with_capacity(count as usize);
    for i in 0..count {
        let entry = 0x10 + i * MEMORY_DESCRIPTOR64_SIZE;
        let start = stream.read_u64(entry)?;
        let size = stream.read_u64(entry + 8)?;
        ranges.push(MemoryRange {
            start,
            size,
            file_offset,
        });
        file_offset = file_offset
            .checked_add(size)
            .ok_or(Error::TruncatedBuffer("memory64 list"))?;
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_list() {
        let mut buf = vec![0u8; 0x20];
        // stream at 0x20
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0x7000u64.to_le_bytes());
        buf.extend_from_slice(&0x10u32.to_le_bytes());
        buf.extend_from_slice(&0x60u32.to_le_bytes());
        buf.extend_from_slice(&0x9000u64.to_le_bytes());
        buf.extend_from_slice(&0x10u32.to_le_bytes());
        buf.extend_from_slice(&0x70u32.to_le_bytes());
        buf.resize(0x60, 0);
        buf.extend((0..0x20).map(|b| b as u8));

        let reader = BinaryReader::new(&buf);
        let list = decode_memory_list(&reader, Location::new(0x24, 0x20))
            .unwrap()
            .into_iter()
            .collect::<MemoryList>();
        assert_eq!(list.ranges().len(), 2);
        assert_eq!(list.read(&reader, 0x7004, 4).unwrap(), &[4, 5, 6, 7]);
        // clamped to the end of the range
        assert_eq!(list.read(&reader, 0x900e, 0x100).unwrap(), &[0x1e, 0x1f]);
        assert_eq!(list.read(&reader, 0x8000, 4), None);
    }

    #[test]
    fn memory64_list() {
        let mut buf = vec![];
        buf.extend_from_slice(&2u64.to_le_bytes());
        buf.extend_from_slice(&0x30u64.to_le_bytes());
        buf.extend_from_slice(&0x1000u64.to_le_bytes());
        buf.extend_from_slice(&0x8u64.to_le_bytes());
        buf.extend_from_slice(&0x3000u64.to_le_bytes());
        buf.extend_from_slice(&0x8u64.to_le_bytes());
        buf.extend((0..0x10).map(|b| b as u8));

        let reader = BinaryReader::new(&buf);
        let ranges = decode_memory64_list(&reader, Location::new(0x30, 0)).unwrap();
        assert_eq!(ranges[1].file_offset, 0x38);
        let list = ranges.into_iter().collect::<MemoryList>();
        assert_eq!(list.read(&reader, 0x3000, 2).unwrap(), &[8, 9]);
    }

    #[test]
    fn count_past_stream_end() {
        let mut buf = vec![];
        buf.extend_from_slice(&0xffffu32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 0x10]);
        assert_eq!(
            decode_memory_list(&BinaryReader::new(&buf), Location::new(0x14, 0)),
            Err(Error::TruncatedBuffer("memory list"))
        );
    }
}
