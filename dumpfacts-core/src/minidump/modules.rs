use log::{trace, warn};

use super::Location;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;
use crate::types::{CodeViewInfo, Module, ModuleOrigin};

/// Size of a `MINIDUMP_MODULE`.
pub const MODULE_ENTRY_SIZE: u64 = 108;

/// 'RSDS'
pub const CV_SIGNATURE_RSDS: u32 = 0x5344_5352;

/// Offsets into `MINIDUMP_MODULE`.
pub mod offsets {
    pub const BASE_OF_IMAGE: u64 = 0x00;
    pub const SIZE_OF_IMAGE: u64 = 0x08;
    pub const CHECKSUM: u64 = 0x0c;
    pub const TIME_DATE_STAMP: u64 = 0x10;
    pub const MODULE_NAME_RVA: u64 = 0x14;
    pub const CV_RECORD: u64 = 0x4c;
    pub const MISC_RECORD: u64 = 0x54;
}

/// Decodes the module list stream.
///
/// Entries whose name cannot be read are skipped.
pub fn decode_module_list(reader: &BinaryReader, location: Location) -> Result<Vec<Module>> {
    let stream = location.reader(reader, "module list")?;
    let count = u64::from(stream.read_u32(0)?);
    if !stream.contains(4, count * MODULE_ENTRY_SIZE) {
        return Err(Error::TruncatedBuffer("module list"));
    }

    let mut modules = Vec::with_capacity(count as usize);
    for i in 0..count {
        let entry = 4 + i * MODULE_ENTRY_SIZE;

        let name_rva = u64::from(stream.read_u32(entry + offsets::MODULE_NAME_RVA)?);
        let path = match reader.read_utf16_prefixed(name_rva) {
            Ok(path) if !path.is_empty() => path,
            Ok(_) | Err(_) => {
                warn!("module {} has an unreadable name at {:#x}", i, name_rva);
                continue;
            }
        };

        let base = stream.read_u64(entry + offsets::BASE_OF_IMAGE)?;
        let size = u64::from(stream.read_u32(entry + offsets::SIZE_OF_IMAGE)?);
        let mut module = Module::from_path(&path, base, size, ModuleOrigin::ModuleList);
        module.checksum = stream.read_u32(entry + offsets::CHECKSUM)?;
        module.timestamp = stream.read_u32(entry + offsets::TIME_DATE_STAMP)?;

        let cv = Location::decode(&stream, entry + offsets::CV_RECORD)?;
        module.codeview = decode_codeview(reader, cv);

        trace!("module {}: {}", i, module);
        modules.push(module);
    }

    Ok(modules)
}

/// Decodes the unloaded module list stream.
///
/// The stream carries its own header and entry sizes, entries may be larger than the fields
/// decoded here.
pub fn decode_unloaded_module_list(
    reader: &BinaryReader,
    location: Location,
) -> Result<Vec<Module>> {
    let stream = location.reader(reader, "unloaded module list")?;
    let header_size = u64::from(stream.read_u32(0)?);
    let entry_size = u64::from(stream.read_u32(4)?);
    let count = u64::from(stream.read_u32(8)?);

    if header_size < 12 || entry_size < 24 {
        return Err(Error::TruncatedBuffer("unloaded module list header"));
    }
    if !stream.contains(header_size, count * entry_size) {
        return Err(Error::TruncatedBuffer("unloaded module list"));
    }

    let mut modules = vec![];
    for i in 0..count {
        let entry = header_size + i * entry_size;
        let name_rva = u64::from(stream.read_u32(entry + 0x14)?);
        let path = match reader.read_utf16_prefixed(name_rva) {
            Ok(path) if !path.is_empty() => path,
            _ => continue,
        };

        let base = stream.read_u64(entry)?;
        let size = u64::from(stream.read_u32(entry + 0x8)?);
        let mut module = Module::from_path(&path, base, size, ModuleOrigin::UnloadedModuleList);
        module.checksum = stream.read_u32(entry + 0xc)?;
        module.timestamp = stream.read_u32(entry + 0x10)?;
        modules.push(module);
    }

    Ok(modules)
}

/// Decodes an `RSDS` CodeView record. Other record types and malformed records yield `None`.
pub fn decode_codeview(reader: &BinaryReader, location: Location) -> Option<CodeViewInfo> {
    if location.is_empty() || location.data_size < 24 {
        return None;
    }
    let record = location.reader(reader, "codeview record").ok()?;
    if record.read_u32(0).ok()? != CV_SIGNATURE_RSDS {
        return None;
    }

    let mut guid = [0u8; 16];
    guid.copy_from_slice(record.read_bytes(4, 16).ok()?);
    let age = record.read_u32(20).ok()?;
    let pdb_name = record.read_c_string(24, record.len() - 24).ok()?;

    Some(CodeViewInfo {
        pdb_name,
        guid,
        age,
    })
}
