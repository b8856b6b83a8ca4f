use super::{Location, MemoryRange};
use crate::error::{Error, Result};
use crate::reader::BinaryReader;

/// Size of a `MINIDUMP_THREAD`.
pub const THREAD_ENTRY_SIZE: u64 = 0x30;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct ThreadInfo {
    pub thread_id: u32,
    pub suspend_count: u32,
    pub priority_class: u32,
    pub priority: u32,
    pub teb: u64,
    /// Captured stack memory of the thread.
    pub stack: MemoryRange,
    pub context: Location,
}

impl ThreadInfo {
    /// Decodes a `MINIDUMP_THREAD` at `offset`.
    ///
    /// ```text
    /// 0x00 ThreadId       u32
    /// 0x04 SuspendCount   u32
    /// 0x08 PriorityClass  u32
    /// 0x0c Priority       u32
    /// 0x10 Teb            u64
    /// 0x18 Stack          MINIDUMP_MEMORY_DESCRIPTOR
    /// 0x28 ThreadContext  MINIDUMP_LOCATION_DESCRIPTOR
    /// ```
    pub fn decode(reader: &BinaryReader, offset: u64) -> Result<Self> {
        let stack_memory = Location::decode(reader, offset + 0x20)?;
        Ok(Self {
            thread_id: reader.read_u32(offset)?,
            suspend_count: reader.read_u32(offset + 0x4)?,
            priority_class: reader.read_u32(offset + 0x8)?,
            priority: reader.read_u32(offset + 0xc)?,
            teb: reader.read_u64(offset + 0x10)?,
            stack: MemoryRange {
                start: reader.read_u64(offset + 0x18)?,
                size: u64::from(stack_memory.data_size),
                file_offset: u64::from(stack_memory.rva),
            },
            context: Location::decode(reader, offset + 0x28)?,
        })
    }
}

/// Decodes the thread list stream.
pub fn decode_thread_list(reader: &BinaryReader, location: Location) -> Result<Vec<ThreadInfo>> {
    let stream = location.reader(reader, "thread list")?;
    let count = u64::from(stream.read_u32(0)?);
    if !stream.contains(4, count * THREAD_ENTRY_SIZE) {
        return Err(Error::TruncatedBuffer("thread list"));
    }

    (0..count)
        .map(|i| ThreadInfo::decode(&stream, 4 + i * THREAD_ENTRY_SIZE))
        .collect()
}

/// Finds a thread by id.
pub fn find_thread(threads: &[ThreadInfo], thread_id: u32) -> Option<&ThreadInfo> {
    threads.iter().find(|t| t.thread_id == thread_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_list() {
        let mut buf = vec![];
        buf.extend_from_slice(&2u32.to_le_bytes());
        for tid in &[0x1a4u32, 0x2b8] {
            buf.extend_from_slice(&tid.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&0x20u32.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&0x7ff_d000u64.to_le_bytes());
            buf.extend_from_slice(&0x000000e5_1234_0000u64.to_le_bytes());
            buf.extend_from_slice(&0x2000u32.to_le_bytes());
            buf.extend_from_slice(&0x4000u32.to_le_bytes());
            buf.extend_from_slice(&0x4d0u32.to_le_bytes());
            buf.extend_from_slice(&0x8000u32.to_le_bytes());
        }

        let threads = decode_thread_list(&BinaryReader::new(&buf), Location::new(100, 0)).unwrap();
        assert_eq!(threads.len(), 2);
        let t = find_thread(&threads, 0x2b8).unwrap();
        assert_eq!(t.priority_class, 0x20);
        assert_eq!(t.stack.start, 0x000000e5_1234_0000);
        assert_eq!(t.stack.size, 0x2000);
        assert_eq!(t.context, Location::new(0x4d0, 0x8000));
        assert!(find_thread(&threads, 1).is_none());
    }

    #[test]
    fn truncated_thread_list() {
        let mut buf = vec![];
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 0x30]);
        assert_eq!(
            decode_thread_list(&BinaryReader::new(&buf), Location::new(0x34, 0)),
            Err(Error::TruncatedBuffer("thread list"))
        );
    }
}
