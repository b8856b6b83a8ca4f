/*!
Decoder for 64-bit Windows kernel crash dumps (`PAGEDU64`).

The 0x2000 byte header is read as a whole and then split into [`KernelHeader`] facts. The
exception record, the context record, the triage driver table and the physical memory layout
are decoded on request.
*/

pub mod physical;
pub mod triage;

pub use physical::{MemoryRun, PhysicalMemoryMap};
pub use triage::TriageHeader;

use std::fmt;

use dataview::Pod;
use log::{debug, info, warn};

use crate::context::RegisterState;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;
use crate::types::{Architecture, ExceptionFacts, Module, OsVersion};

use physical::PhysicalMemoryDescriptor;

/// 'PAGE'
pub const DUMP_SIGNATURE: u32 = 0x4547_4150;
/// 'DU64'
pub const DUMP_VALID_DUMP64: u32 = 0x3436_5544;

/// Size of the 64-bit dump header. Page data or the triage section follows it.
pub const DUMP_HEADER64_SIZE: u64 = 0x2000;

/// Offsets into the 64-bit dump header.
pub mod offsets {
    pub const BUG_CHECK_CODE: u64 = 0x38;
    pub const BUG_CHECK_PARAMETERS: u64 = 0x40;
    pub const PHYSICAL_MEMORY_BLOCK: u64 = 0x88;
    pub const CONTEXT_RECORD: u64 = 0x348;
    pub const EXCEPTION_RECORD: u64 = 0xf00;
    pub const DUMP_TYPE: u64 = 0xf98;
    pub const COMMENT: u64 = 0xfb0;
    pub const SYSTEM_UP_TIME: u64 = 0x1030;
    pub const PRODUCT_TYPE: u64 = 0x1040;
}

/// A 64bit Microsoft Windows crash dump header.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct DumpHeader64 {
    pub signature: u32,                                 // 0x0000
    pub valid_dump: u32,                                // 0x0004
    pub major_version: u32,                             // 0x0008
    pub minor_version: u32,                             // 0x000c
    pub directory_table_base: u64,                      // 0x0010
    pub pfn_data_base: u64,                             // 0x0018
    pub ps_loaded_module_list: u64,                     // 0x0020
    pub ps_active_process_head: u64,                    // 0x0028
    pub machine_image_type: u32,                        // 0x0030
    pub number_processors: u32,                         // 0x0034
    pub bug_check_code: u32,                            // 0x0038
    pub _pad_bug_check: u32,                            // 0x003c
    pub bug_check_parameters: [u64; 4],                 // 0x0040
    pub version_user: [u8; 32],                         // 0x0060
    pub kd_debugger_data_block: u64,                    // 0x0080
    pub physical_memory_block: PhysicalMemoryDescriptor, // 0x0088
    pub pad0: [u8; 176],                                // 0x0298
    pub context_record: [u8; 3000],                     // 0x0348
    pub exception_record: [u8; 152],                    // 0x0f00
    pub dump_type: u32,                                 // 0x0f98
    pub _pad_dump_type: u32,                            // 0x0f9c
    pub required_dump_space: u64,                       // 0x0fa0
    pub system_time: u64,                               // 0x0fa8
    pub comment: [u8; 0x80],                            // 0x0fb0 may not be present
    pub system_up_time: u64,                            // 0x1030
    pub mini_dump_fields: u32,                          // 0x1038
    pub secondary_data_state: u32,                      // 0x103c
    pub product_type: u32,                              // 0x1040
    pub suite_mask: u32,                                // 0x1044
    pub writer_status: u32,                             // 0x1048
    pub unused0: u8,                                    // 0x104c
    pub kd_secondary_version: u8,                       // 0x104d
    pub unused1: [u8; 2],                               // 0x104e
    pub reserved0: [u8; 4016],                          // 0x1050
} // size: 0x2000

unsafe impl Pod for DumpHeader64 {}

/// Value of the `DumpType` header field.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum DumpType {
    Full,
    Summary,
    Header,
    Triage,
    BitmapFull,
    BitmapKernel,
    Automatic,
    KernelMemory,
    KernelAndUserMemory,
    CompleteMemory,
    Unknown(u32),
}

impl From<u32> for DumpType {
    fn from(value: u32) -> Self {
        match value {
            1 => DumpType::Full,
            2 => DumpType::Summary,
            3 => DumpType::Header,
            4 => DumpType::Triage,
            5 => DumpType::BitmapFull,
            6 => DumpType::BitmapKernel,
            7 => DumpType::Automatic,
            8 => DumpType::KernelMemory,
            9 => DumpType::KernelAndUserMemory,
            0xa => DumpType::CompleteMemory,
            other => DumpType::Unknown(other),
        }
    }
}

impl fmt::Display for DumpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DumpType::Full => "full memory dump",
            DumpType::Summary => "kernel summary dump",
            DumpType::Header => "header only dump",
            DumpType::Triage => "small memory dump",
            DumpType::BitmapFull => "full bitmap dump",
            DumpType::BitmapKernel => "kernel bitmap dump",
            DumpType::Automatic => "automatic memory dump",
            DumpType::KernelMemory => "kernel memory dump",
            DumpType::KernelAndUserMemory => "kernel and user memory dump",
            DumpType::CompleteMemory => "complete memory dump",
            DumpType::Unknown(v) => return write!(f, "unknown dump type {:#x}", v),
        };
        f.write_str(name)
    }
}

/// Facts taken from the fixed offsets of the dump header.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct KernelHeader {
    pub version: OsVersion,
    pub directory_table_base: u64,
    pub pfn_database: u64,
    pub ps_loaded_module_list: u64,
    pub ps_active_process_head: u64,
    pub machine_type: u32,
    pub architecture: Architecture,
    pub processor_count: u32,
    pub bug_check_code: u32,
    pub bug_check_parameters: [u64; 4],
    pub kd_debugger_data_block: u64,
    pub dump_type: DumpType,
    pub required_dump_space: u64,
    /// `FILETIME` of the crash.
    pub system_time: u64,
    /// Up-time in 100ns units.
    pub system_up_time: u64,
    pub comment: Option<String>,
    pub product_type: u32,
    pub suite_mask: u32,
}

impl KernelHeader {
    fn from_raw(raw: &DumpHeader64, comment: Option<String>) -> Self {
        Self {
            version: OsVersion::from_kernel_header(raw.major_version, raw.minor_version),
            directory_table_base: raw.directory_table_base,
            pfn_database: raw.pfn_data_base,
            ps_loaded_module_list: raw.ps_loaded_module_list,
            ps_active_process_head: raw.ps_active_process_head,
            machine_type: raw.machine_image_type,
            architecture: Architecture::from_machine_type(raw.machine_image_type),
            processor_count: raw.number_processors,
            bug_check_code: raw.bug_check_code,
            bug_check_parameters: raw.bug_check_parameters,
            kd_debugger_data_block: raw.kd_debugger_data_block,
            dump_type: DumpType::from(raw.dump_type),
            required_dump_space: raw.required_dump_space,
            system_time: raw.system_time,
            system_up_time: raw.system_up_time,
            comment,
            product_type: raw.product_type,
            suite_mask: raw.suite_mask,
        }
    }
}

/// A parsed kernel dump borrowing the underlying buffer.
#[derive(Debug, Clone)]
pub struct KernelDump<'a> {
    reader: BinaryReader<'a>,
    header: KernelHeader,
    memory_descriptor: PhysicalMemoryDescriptor,
}

impl<'a> KernelDump<'a> {
    /// Parses the header of a kernel dump.
    ///
    /// Buffers shorter than the 0x2000 byte header fail with `Error::HeaderTooSmall`.
    pub fn parse(reader: BinaryReader<'a>) -> Result<Self> {
        if reader.len() < DUMP_HEADER64_SIZE {
            debug!(
                "kernel dump of {:#x} bytes is smaller than its header",
                reader.len()
            );
            return Err(Error::HeaderTooSmall);
        }

        let raw = reader.read_pod::<DumpHeader64>(0)?;
        if raw.signature != DUMP_SIGNATURE || raw.valid_dump != DUMP_VALID_DUMP64 {
            return Err(Error::BadSignature);
        }

        let comment = reader
            .read_fixed_ascii(offsets::COMMENT, 0x80)
            .ok()
            .filter(|c| !c.is_empty() && !c.starts_with("PAGE"));

        let header = KernelHeader::from_raw(&raw, comment);
        if header.architecture != Architecture::Amd64 {
            warn!(
                "unexpected machine type {:#x} in 64-bit kernel dump",
                header.machine_type
            );
        }

        info!(
            "64-bit kernel dump verified: {} build {} stop code {:#x}",
            header.dump_type, header.version, header.bug_check_code
        );

        Ok(Self {
            reader,
            header,
            memory_descriptor: raw.physical_memory_block,
        })
    }

    pub fn header(&self) -> &KernelHeader {
        &self.header
    }

    pub fn reader(&self) -> &BinaryReader<'a> {
        &self.reader
    }

    pub fn dump_type(&self) -> DumpType {
        self.header.dump_type
    }

    pub fn bug_check_code(&self) -> u32 {
        self.header.bug_check_code
    }

    pub fn bug_check_parameters(&self) -> [u64; 4] {
        self.header.bug_check_parameters
    }

    /// Decodes the exception record embedded in the header.
    ///
    /// Returns `None` if the record is zeroed.
    pub fn exception(&self) -> Result<Option<ExceptionFacts>> {
        let facts = ExceptionFacts::decode64(&self.reader, offsets::EXCEPTION_RECORD)?;
        if facts.code == 0 && facts.address == 0 {
            Ok(None)
        } else {
            Ok(Some(facts))
        }
    }

    /// Architecture used for the context record.
    ///
    /// Falls back to the context flags if the machine type is not recognized.
    pub fn context_architecture(&self) -> Architecture {
        match self.header.architecture {
            Architecture::Unknown(_) => {
                let flags_x86 = self
                    .reader
                    .read_u32(offsets::CONTEXT_RECORD)
                    .unwrap_or_default();
                let flags_amd64 = self
                    .reader
                    .read_u32(offsets::CONTEXT_RECORD + 0x30)
                    .unwrap_or_default();
                Architecture::from_context_flags(flags_x86, flags_amd64)
                    .unwrap_or(self.header.architecture)
            }
            arch => arch,
        }
    }

    /// Decodes the context record of the crashing processor.
    pub fn context(&self) -> Result<RegisterState> {
        RegisterState::decode(
            &self.reader,
            offsets::CONTEXT_RECORD,
            self.context_architecture(),
        )
    }

    /// Decodes the triage header, present in small memory dumps only.
    pub fn triage_header(&self) -> Result<Option<TriageHeader>> {
        if self.header.dump_type != DumpType::Triage {
            return Ok(None);
        }
        TriageHeader::decode(&self.reader).map(Some)
    }

    /// Loaded drivers recorded in the triage driver table.
    ///
    /// Dumps without a driver table yield an empty list.
    pub fn modules(&self) -> Result<Vec<Module>> {
        match self.triage_header()? {
            Some(header) => Ok(triage::driver_list(&self.reader, &header)),
            None => {
                debug!("{} has no driver table", self.header.dump_type);
                Ok(vec![])
            }
        }
    }

    /// All strings of the triage string pool.
    pub fn string_pool(&self) -> Result<Vec<String>> {
        Ok(self
            .triage_header()?
            .map(|header| triage::string_pool(&self.reader, &header))
            .unwrap_or_default())
    }

    /// Physical memory layout of full and bitmap dumps.
    pub fn memory_map(&self) -> Result<Option<PhysicalMemoryMap>> {
        match self.header.dump_type {
            DumpType::Full | DumpType::CompleteMemory => {
                physical::parse_full_dump(&self.memory_descriptor, DUMP_HEADER64_SIZE).map(Some)
            }
            DumpType::BitmapFull
            | DumpType::BitmapKernel
            | DumpType::KernelMemory
            | DumpType::KernelAndUserMemory
            | DumpType::Automatic => {
                physical::parse_bitmap_dump(&self.reader, DUMP_HEADER64_SIZE).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    fn header_offset<T>(header: &DumpHeader64, field: &T) -> usize {
        field as *const T as usize - header as *const DumpHeader64 as usize
    }

    #[test]
    fn struct_size() {
        assert_eq!(size_of::<DumpHeader64>() as u64, DUMP_HEADER64_SIZE);
    }

    #[test]
    fn struct_members() {
        let buf = vec![0u8; DUMP_HEADER64_SIZE as usize];
        let header = BinaryReader::new(&buf).read_pod::<DumpHeader64>(0).unwrap();
        assert_eq!(header_offset(&header, &header.machine_image_type), 0x30);
        assert_eq!(
            header_offset(&header, &header.bug_check_code) as u64,
            offsets::BUG_CHECK_CODE
        );
        assert_eq!(
            header_offset(&header, &header.bug_check_parameters) as u64,
            offsets::BUG_CHECK_PARAMETERS
        );
        assert_eq!(header_offset(&header, &header.kd_debugger_data_block), 0x80);
        assert_eq!(
            header_offset(&header, &header.physical_memory_block) as u64,
            offsets::PHYSICAL_MEMORY_BLOCK
        );
        assert_eq!(
            header_offset(&header, &header.context_record) as u64,
            offsets::CONTEXT_RECORD
        );
        assert_eq!(
            header_offset(&header, &header.exception_record) as u64,
            offsets::EXCEPTION_RECORD
        );
        assert_eq!(
            header_offset(&header, &header.dump_type) as u64,
            offsets::DUMP_TYPE
        );
        assert_eq!(header_offset(&header, &header.required_dump_space), 0xfa0);
        assert_eq!(
            header_offset(&header, &header.comment) as u64,
            offsets::COMMENT
        );
        assert_eq!(
            header_offset(&header, &header.system_up_time) as u64,
            offsets::SYSTEM_UP_TIME
        );
        assert_eq!(
            header_offset(&header, &header.product_type) as u64,
            offsets::PRODUCT_TYPE
        );
        assert_eq!(header_offset(&header, &header.suite_mask), 0x1044);
    }

    #[test]
    fn header_too_small() {
        let mut buf = vec![0u8; 0x1fff];
        buf[0..8].copy_from_slice(b"PAGEDU64");
        assert_eq!(
            KernelDump::parse(BinaryReader::new(&buf)).unwrap_err(),
            Error::HeaderTooSmall
        );
    }

    #[test]
    fn bad_signature() {
        let mut buf = vec![0u8; 0x2000];
        buf[0..8].copy_from_slice(b"PAGEDU32");
        assert_eq!(
            KernelDump::parse(BinaryReader::new(&buf)).unwrap_err(),
            Error::BadSignature
        );
    }

    #[test]
    fn dump_types() {
        assert_eq!(DumpType::from(4), DumpType::Triage);
        assert_eq!(DumpType::from(0x42), DumpType::Unknown(0x42));
        assert_eq!(DumpType::Triage.to_string(), "small memory dump");
    }
}
