/*!
Decoder for user mode minidumps (`MDMP`).

Only the header and the stream directory are decoded up front. Every stream is decoded when it
is requested and validates its own offsets, so a malformed stream only fails the accessor for
that stream.
*/

pub mod exception;
pub mod memory;
pub mod misc;
pub mod modules;
pub mod system_info;
pub mod threads;

pub use exception::ExceptionStream;
pub use memory::{MemoryList, MemoryRange, DEFAULT_STACK_WINDOW};
pub use misc::{MiscInfo, MiscInfoFlags};
pub use modules::decode_codeview;
pub use system_info::{ProductType, SystemInfo};
pub use threads::ThreadInfo;

use std::collections::HashMap;
use std::mem::size_of;

use dataview::Pod;
use log::{debug, info, trace};

use crate::context::RegisterState;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;
use crate::types::{Architecture, Module};

/// 'MDMP'
pub const MINIDUMP_SIGNATURE: u32 = 0x504D_444D;
/// Low word of the header version.
pub const MINIDUMP_VERSION: u32 = 0xa793;

/// `MINIDUMP_STREAM_TYPE` values.
pub mod stream_type {
    pub const UNUSED: u32 = 0;
    pub const THREAD_LIST: u32 = 3;
    pub const MODULE_LIST: u32 = 4;
    pub const MEMORY_LIST: u32 = 5;
    pub const EXCEPTION: u32 = 6;
    pub const SYSTEM_INFO: u32 = 7;
    pub const MEMORY64_LIST: u32 = 9;
    pub const UNLOADED_MODULE_LIST: u32 = 14;
    pub const MISC_INFO: u32 = 15;
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct RawHeader {
    pub signature: u32,
    pub version: u32,
    pub number_of_streams: u32,
    pub stream_directory_rva: u32,
    pub checksum: u32,
    pub time_date_stamp: u32,
    pub flags: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct RawDirectory {
    pub stream_type: u32,
    pub data_size: u32,
    pub rva: u32,
}

unsafe impl Pod for RawHeader {}
unsafe impl Pod for RawDirectory {}

/// `MINIDUMP_LOCATION_DESCRIPTOR`
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Location {
    pub data_size: u32,
    pub rva: u32,
}

impl Location {
    pub fn new(data_size: u32, rva: u32) -> Self {
        Self { data_size, rva }
    }

    pub fn decode(reader: &BinaryReader, offset: u64) -> Result<Self> {
        Ok(Self {
            data_size: reader.read_u32(offset)?,
            rva: reader.read_u32(offset + 4)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.data_size == 0 || self.rva == 0
    }

    /// Returns a reader restricted to the bytes of this location.
    pub fn reader<'a>(
        &self,
        reader: &BinaryReader<'a>,
        what: &'static str,
    ) -> Result<BinaryReader<'a>> {
        reader
            .sub_reader(u64::from(self.rva), u64::from(self.data_size))
            .map_err(|_| Error::TruncatedBuffer(what))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct MinidumpHeader {
    pub version: u32,
    pub number_of_streams: u32,
    pub stream_directory_rva: u32,
    pub checksum: u32,
    pub time_date_stamp: u32,
    pub flags: u64,
}

/// A parsed minidump borrowing the underlying buffer.
#[derive(Debug, Clone)]
pub struct Minidump<'a> {
    reader: BinaryReader<'a>,
    header: MinidumpHeader,
    directory: HashMap<u32, Location>,
}

impl<'a> Minidump<'a> {
    /// Parses the header and the stream directory.
    pub fn parse(reader: BinaryReader<'a>) -> Result<Self> {
        if reader.len() < size_of::<RawHeader>() as u64 {
            return Err(Error::HeaderTooSmall);
        }

        let raw = reader.read_pod::<RawHeader>(0)?;
        if raw.signature != MINIDUMP_SIGNATURE {
            return Err(Error::BadSignature);
        }
        if raw.version & 0xffff != MINIDUMP_VERSION {
            debug!("unexpected minidump version {:#x}", raw.version);
        }

        let entry_size = size_of::<RawDirectory>() as u64;
        let directory_rva = u64::from(raw.stream_directory_rva);
        if !reader.contains(
            directory_rva,
            u64::from(raw.number_of_streams) * entry_size,
        ) {
            return Err(Error::TruncatedBuffer("stream directory"));
        }

        let mut directory = HashMap::new();
        for i in 0..u64::from(raw.number_of_streams) {
            let entry = reader.read_pod::<RawDirectory>(directory_rva + i * entry_size)?;
            trace!(
                "stream {}: type={} size={:#x} rva={:#x}",
                i,
                entry.stream_type,
                entry.data_size,
                entry.rva
            );
            if entry.stream_type == stream_type::UNUSED {
                continue;
            }
            // the first stream of a type wins
            directory
                .entry(entry.stream_type)
                .or_insert_with(|| Location::new(entry.data_size, entry.rva));
        }

        info!(
            "minidump verified: {} streams, flags {:#x}",
            directory.len(),
            raw.flags
        );

        Ok(Self {
            reader,
            header: MinidumpHeader {
                version: raw.version,
                number_of_streams: raw.number_of_streams,
                stream_directory_rva: raw.stream_directory_rva,
                checksum: raw.checksum,
                time_date_stamp: raw.time_date_stamp,
                flags: raw.flags,
            },
            directory,
        })
    }

    pub fn header(&self) -> &MinidumpHeader {
        &self.header
    }

    pub fn reader(&self) -> &BinaryReader<'a> {
        &self.reader
    }

    pub fn has_stream(&self, stream_type: u32) -> bool {
        self.directory.contains_key(&stream_type)
    }

    /// Location of a stream, `Error::MissingStream` if the directory has no entry for it.
    pub fn stream(&self, stream_type: u32) -> Result<Location> {
        self.directory
            .get(&stream_type)
            .copied()
            .ok_or(Error::MissingStream(stream_type))
    }

    /// Stream types present in the directory, sorted.
    pub fn stream_types(&self) -> Vec<u32> {
        let mut types = self.directory.keys().copied().collect::<Vec<_>>();
        types.sort_unstable();
        types
    }

    pub fn system_info(&self) -> Result<SystemInfo> {
        SystemInfo::decode(&self.reader, self.stream(stream_type::SYSTEM_INFO)?)
    }

    pub fn modules(&self) -> Result<Vec<Module>> {
        modules::decode_module_list(&self.reader, self.stream(stream_type::MODULE_LIST)?)
    }

    pub fn unloaded_modules(&self) -> Result<Vec<Module>> {
        modules::decode_unloaded_module_list(
            &self.reader,
            self.stream(stream_type::UNLOADED_MODULE_LIST)?,
        )
    }

    pub fn threads(&self) -> Result<Vec<ThreadInfo>> {
        threads::decode_thread_list(&self.reader, self.stream(stream_type::THREAD_LIST)?)
    }

    pub fn exception(&self) -> Result<ExceptionStream> {
        ExceptionStream::decode(&self.reader, self.stream(stream_type::EXCEPTION)?)
    }

    pub fn misc_info(&self) -> Result<MiscInfo> {
        MiscInfo::decode(&self.reader, self.stream(stream_type::MISC_INFO)?)
    }

    /// Memory ranges of the memory list and memory64 list streams.
    ///
    /// Each list is decoded on its own and a malformed list is skipped. Fails with
    /// `Error::MissingStream` if neither stream is present, or with the first decode error if
    /// no range could be recovered.
    pub fn memory(&self) -> Result<MemoryList> {
        let decoders: [(u32, fn(&BinaryReader, Location) -> Result<Vec<MemoryRange>>); 2] = [
            (stream_type::MEMORY_LIST, memory::decode_memory_list),
            (stream_type::MEMORY64_LIST, memory::decode_memory64_list),
        ];

        let mut list = MemoryList::default();
        let mut found = false;
        let mut first_err = None;
        for (ty, decode) in decoders.iter() {
            let location = match self.stream(*ty) {
                Ok(location) => location,
                Err(_) => continue,
            };
            found = true;
            match decode(&self.reader, location) {
                Ok(ranges) => list.extend(ranges),
                Err(err) => {
                    debug!("skipping malformed memory stream {}: {}", ty, err);
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            _ if !found => Err(Error::MissingStream(stream_type::MEMORY_LIST)),
            Some(err) if list.is_empty() => Err(err),
            _ => Ok(list),
        }
    }

    /// Processor architecture of the dumped process.
    ///
    /// Taken from the system info stream, or guessed from the context flags of the exception
    /// thread if that stream is missing or malformed.
    pub fn architecture(&self) -> Architecture {
        if let Ok(info) = self.system_info() {
            return info.architecture;
        }

        let guess = self
            .exception()
            .ok()
            .and_then(|e| self.guess_architecture(e.context));
        match guess {
            Some(arch) => {
                debug!("system info unavailable, guessed {} from context flags", arch);
                arch
            }
            None => Architecture::Unknown(0),
        }
    }

    fn guess_architecture(&self, context: Location) -> Option<Architecture> {
        let rva = u64::from(context.rva);
        let flags_x86 = self.reader.read_u32(rva).ok()?;
        let flags_amd64 = self.reader.read_u32(rva + 0x30).unwrap_or_default();
        Architecture::from_context_flags(flags_x86, flags_amd64)
    }

    /// Decodes a `CONTEXT` record referenced by a location descriptor.
    pub fn context(&self, location: Location, arch: Architecture) -> Result<RegisterState> {
        let expected = RegisterState::context_size(arch).ok_or(Error::InvalidArchitecture)?;
        if u64::from(location.data_size) < expected {
            return Err(Error::TruncatedBuffer("context record"));
        }
        let ctx = location.reader(&self.reader, "context record")?;
        RegisterState::decode(&ctx, 0, arch)
    }

    /// Register state of the exception thread.
    pub fn exception_context(&self) -> Result<RegisterState> {
        let exception = self.exception()?;
        self.context(exception.context, self.architecture())
    }

    /// Returns up to `max_len` bytes of captured memory starting at `addr`.
    ///
    /// Looks at the memory list streams first and at the stack ranges of the thread list after.
    pub fn read_memory(&self, addr: u64, max_len: u64) -> Option<&'a [u8]> {
        if let Ok(memory) = self.memory() {
            if let Some(bytes) = memory.read(&self.reader, addr, max_len) {
                return Some(bytes);
            }
        }

        let threads = self.threads().ok()?;
        let stacks = threads.iter().map(|t| t.stack).collect::<MemoryList>();
        stacks.read(&self.reader, addr, max_len)
    }

    /// Bounded window of stack bytes at `sp`.
    pub fn stack_window(&self, sp: u64) -> Option<&'a [u8]> {
        self.read_memory(sp, DEFAULT_STACK_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_sizes() {
        assert_eq!(size_of::<RawHeader>(), 0x20);
        assert_eq!(size_of::<RawDirectory>(), 0xc);
    }

    #[test]
    fn header_too_small() {
        let buf = b"MDMP\x93\xa7\0\0".to_vec();
        assert_eq!(
            Minidump::parse(BinaryReader::new(&buf)).unwrap_err(),
            Error::HeaderTooSmall
        );
    }

    #[test]
    fn truncated_directory() {
        let mut buf = vec![0u8; 0x20];
        buf[0..4].copy_from_slice(b"MDMP");
        buf[8..12].copy_from_slice(&4u32.to_le_bytes());
        buf[12..16].copy_from_slice(&0x20u32.to_le_bytes());
        assert_eq!(
            Minidump::parse(BinaryReader::new(&buf)).unwrap_err(),
            Error::TruncatedBuffer("stream directory")
        );
    }

    #[test]
    fn missing_streams() {
        let mut buf = vec![0u8; 0x20];
        buf[0..4].copy_from_slice(b"MDMP");
        buf[12..16].copy_from_slice(&0x20u32.to_le_bytes());
        let dump = Minidump::parse(BinaryReader::new(&buf)).unwrap();
        assert!(dump.stream_types().is_empty());
        assert_eq!(
            dump.modules().unwrap_err(),
            Error::MissingStream(stream_type::MODULE_LIST)
        );
        assert_eq!(
            dump.exception().unwrap_err(),
            Error::MissingStream(stream_type::EXCEPTION)
        );
        assert_eq!(dump.architecture(), Architecture::Unknown(0));
        assert_eq!(dump.stack_window(0x1000), None);
    }

    fn corrupt_memory_list_dump(with_memory64: bool) -> Vec<u8> {
        let streams: u32 = if with_memory64 { 2 } else { 1 };
        let mut buf = vec![0u8; 0x70];
        buf[0..4].copy_from_slice(b"MDMP");
        buf[8..12].copy_from_slice(&streams.to_le_bytes());
        buf[12..16].copy_from_slice(&0x20u32.to_le_bytes());

        // memory list claiming 100 descriptors in a 4 byte stream
        buf[0x20..0x24].copy_from_slice(&stream_type::MEMORY_LIST.to_le_bytes());
        buf[0x24..0x28].copy_from_slice(&4u32.to_le_bytes());
        buf[0x28..0x2c].copy_from_slice(&0x38u32.to_le_bytes());
        buf[0x38..0x3c].copy_from_slice(&100u32.to_le_bytes());

        // memory64 list with one 0x10 byte range at 0x1000
        buf[0x2c..0x30].copy_from_slice(&stream_type::MEMORY64_LIST.to_le_bytes());
        buf[0x30..0x34].copy_from_slice(&0x20u32.to_le_bytes());
        buf[0x34..0x38].copy_from_slice(&0x40u32.to_le_bytes());
        buf[0x40..0x48].copy_from_slice(&1u64.to_le_bytes());
        buf[0x48..0x50].copy_from_slice(&0x60u64.to_le_bytes());
        buf[0x50..0x58].copy_from_slice(&0x1000u64.to_le_bytes());
        buf[0x58..0x60].copy_from_slice(&0x10u64.to_le_bytes());
        for (i, b) in buf[0x60..0x70].iter_mut().enumerate() {
            *b = 0xa0 + i as u8;
        }
        buf
    }

    #[test]
    fn corrupt_memory_list_keeps_memory64() {
        let buf = corrupt_memory_list_dump(true);
        let dump = Minidump::parse(BinaryReader::new(&buf)).unwrap();

        let memory = dump.memory().unwrap();
        assert_eq!(memory.ranges().len(), 1);
        assert_eq!(memory.ranges()[0].start, 0x1000);
        assert_eq!(dump.read_memory(0x1004, 4), Some(&[0xa4u8, 0xa5, 0xa6, 0xa7][..]));
        assert_eq!(dump.stack_window(0x1000).map(<[u8]>::len), Some(0x10));
    }

    #[test]
    fn corrupt_memory_list_alone() {
        let buf = corrupt_memory_list_dump(false);
        let dump = Minidump::parse(BinaryReader::new(&buf)).unwrap();
        assert_eq!(
            dump.memory().unwrap_err(),
            Error::TruncatedBuffer("memory list")
        );
        assert_eq!(dump.stack_window(0x1000), None);
    }

    #[test]
    fn location_bounds() {
        let buf = vec![0u8; 0x40];
        let reader = BinaryReader::new(&buf);
        assert!(Location::new(0x10, 0x30).reader(&reader, "x").is_ok());
        assert_eq!(
            Location::new(0x20, 0x30).reader(&reader, "x").unwrap_err(),
            Error::TruncatedBuffer("x")
        );
    }
}
