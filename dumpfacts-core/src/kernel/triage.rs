/*!
Driver table and string pool of kernel triage dumps.

A `TRIAGE_DUMP64` header follows the dump header and points at a table of `DUMP_DRIVER_ENTRY64`
records. Driver names live in a separate string pool as `DUMP_STRING`s. All offsets stored in
the triage header and the driver entries are absolute file offsets.
*/

use log::{debug, trace};

use crate::error::Result;
use crate::reader::BinaryReader;
use crate::types::{Module, ModuleOrigin};

/// Location of the `TRIAGE_DUMP64` header.
pub const TRIAGE_HEADER_OFFSET: u64 = 0x2000;

/// Size of a `DUMP_DRIVER_ENTRY64`.
pub const DRIVER_ENTRY_SIZE: u64 = 0x90;

/// Offsets into `TRIAGE_DUMP64`.
pub mod offsets {
    pub const DRIVER_LIST_OFFSET: u64 = 0x30;
    pub const DRIVER_COUNT: u64 = 0x34;
    pub const STRING_POOL_OFFSET: u64 = 0x38;
    pub const STRING_POOL_SIZE: u64 = 0x3c;
}

/// Offsets into `DUMP_DRIVER_ENTRY64`.
pub mod entry_offsets {
    pub const DRIVER_NAME_OFFSET: u64 = 0x00;
    pub const DLL_BASE: u64 = 0x38;
    pub const SIZE_OF_IMAGE: u64 = 0x48;
    pub const CHECKSUM: u64 = 0x80;
    pub const TIME_DATE_STAMP: u64 = 0x88;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct TriageHeader {
    pub driver_list_offset: u32,
    pub driver_count: u32,
    pub string_pool_offset: u32,
    pub string_pool_size: u32,
}

impl TriageHeader {
    pub fn decode(reader: &BinaryReader) -> Result<Self> {
        let base = TRIAGE_HEADER_OFFSET;
        Ok(Self {
            driver_list_offset: reader.read_u32(base + offsets::DRIVER_LIST_OFFSET)?,
            driver_count: reader.read_u32(base + offsets::DRIVER_COUNT)?,
            string_pool_offset: reader.read_u32(base + offsets::STRING_POOL_OFFSET)?,
            string_pool_size: reader.read_u32(base + offsets::STRING_POOL_SIZE)?,
        })
    }

    fn pool_range(&self) -> (u64, u64) {
        let start = u64::from(self.string_pool_offset);
        (start, start + u64::from(self.string_pool_size))
    }

    /// Returns true if a name offset points into the string pool (or into the file when the
    /// pool size is not recorded).
    fn is_valid_name_offset(&self, offset: u64, file_len: u64) -> bool {
        if offset == 0 || offset.saturating_add(4) > file_len {
            return false;
        }
        let (start, end) = self.pool_range();
        self.string_pool_size == 0 || (start <= offset && offset < end)
    }
}

/// Walks the driver table.
///
/// The walk ends without error after `driver_count` entries, at the first entry with a zero or
/// out-of-range name offset or at the first entry that cannot be read.
pub fn driver_list(reader: &BinaryReader, header: &TriageHeader) -> Vec<Module> {
    let mut modules = vec![];
    let list = u64::from(header.driver_list_offset);
    if list == 0 {
        debug!("triage dump has no driver list");
        return modules;
    }

    for i in 0..u64::from(header.driver_count) {
        let entry = list + i * DRIVER_ENTRY_SIZE;
        match read_driver_entry(reader, header, entry) {
            Some(module) => {
                trace!("driver entry {}: {}", i, module);
                modules.push(module);
            }
            None => {
                debug!(
                    "driver table walk stopped at entry {} of {}",
                    i, header.driver_count
                );
                break;
            }
        }
    }

    modules
}

fn read_driver_entry(reader: &BinaryReader, header: &TriageHeader, entry: u64) -> Option<Module> {
    if !reader.contains(entry, DRIVER_ENTRY_SIZE) {
        return None;
    }

    let name_offset = u64::from(
        reader
            .read_u32(entry + entry_offsets::DRIVER_NAME_OFFSET)
            .ok()?,
    );
    if !header.is_valid_name_offset(name_offset, reader.len()) {
        return None;
    }
    let path = reader.read_counted_utf16(name_offset).ok()?;
    if path.is_empty() {
        return None;
    }

    let base = reader.read_u64(entry + entry_offsets::DLL_BASE).ok()?;
    let size = reader.read_u32(entry + entry_offsets::SIZE_OF_IMAGE).ok()?;

    let mut module = Module::from_path(&path, base, u64::from(size), ModuleOrigin::DriverTable);
    module.checksum = reader.read_u32(entry + entry_offsets::CHECKSUM).ok()?;
    module.timestamp = reader.read_u32(entry + entry_offsets::TIME_DATE_STAMP).ok()?;
    Some(module)
}

/// Reads every `DUMP_STRING` of the string pool.
///
/// Entries are nul terminated and start at 8-byte aligned offsets. Reading stops at the end of
/// the pool or at the first malformed entry.
pub fn string_pool(reader: &BinaryReader, header: &TriageHeader) -> Vec<String> {
    let mut strings = vec![];
    let (start, end) = header.pool_range();
    if start == 0 || header.string_pool_size == 0 {
        return strings;
    }
    let end = end.min(reader.len());

    let mut offset = start;
    while offset + 4 <= end {
        let chars = match reader.read_u32(offset) {
            Ok(chars) => u64::from(chars),
            Err(_) => break,
        };
        // length prefix, characters and the terminating nul
        let entry_size = 4 + (chars + 1) * 2;
        if chars == 0 || offset + entry_size > end {
            break;
        }
        match reader.read_counted_utf16(offset) {
            Ok(s) => strings.push(s),
            Err(_) => break,
        }
        offset += (entry_size + 7) & !7;
    }

    strings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u32(buf: &mut [u8], at: u64, v: u32) {
        let at = at as usize;
        buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn put_u64(buf: &mut [u8], at: u64, v: u64) {
        let at = at as usize;
        buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
    }

    fn put_dump_string(buf: &mut Vec<u8>, s: &str) -> u64 {
        while buf.len() % 8 != 0 {
            buf.push(0);
        }
        let offset = buf.len() as u64;
        let units = s.encode_utf16().collect::<Vec<_>>();
        buf.extend_from_slice(&(units.len() as u32).to_le_bytes());
        for u in units {
            buf.extend_from_slice(&u.to_le_bytes());
        }
        buf.extend_from_slice(&[0, 0]);
        offset
    }

    /// Builds a triage section with the given drivers. The driver list starts at 0x2100 and
    /// the string pool at 0x2800.
    fn build(drivers: &[(&str, u64, u32)], count: u32) -> Vec<u8> {
        let list = 0x2100u64;
        let pool = 0x2800u64;
        let mut buf = vec![0u8; pool as usize];

        let mut names = vec![];
        for (name, _, _) in drivers {
            names.push(put_dump_string(&mut buf, name));
        }
        let pool_size = buf.len() as u64 - pool;

        put_u32(&mut buf, TRIAGE_HEADER_OFFSET + offsets::DRIVER_LIST_OFFSET, list as u32);
        put_u32(&mut buf, TRIAGE_HEADER_OFFSET + offsets::DRIVER_COUNT, count);
        put_u32(&mut buf, TRIAGE_HEADER_OFFSET + offsets::STRING_POOL_OFFSET, pool as u32);
        put_u32(
            &mut buf,
            TRIAGE_HEADER_OFFSET + offsets::STRING_POOL_SIZE,
            pool_size as u32,
        );

        for (i, ((_, base, size), name)) in drivers.iter().zip(names).enumerate() {
            let entry = list + i as u64 * DRIVER_ENTRY_SIZE;
            put_u32(&mut buf, entry + entry_offsets::DRIVER_NAME_OFFSET, name as u32);
            put_u64(&mut buf, entry + entry_offsets::DLL_BASE, *base);
            put_u32(&mut buf, entry + entry_offsets::SIZE_OF_IMAGE, *size);
            put_u32(&mut buf, entry + entry_offsets::CHECKSUM, 0xabcd);
            put_u32(&mut buf, entry + entry_offsets::TIME_DATE_STAMP, 0x5f00_0000);
        }
        buf
    }

    #[test]
    fn walk_driver_table() {
        let buf = build(
            &[
                ("\\SystemRoot\\system32\\ntoskrnl.exe", 0xfffff800_00000000, 0x100_0000),
                ("\\SystemRoot\\System32\\drivers\\nvlddmkm.sys", 0xfffff801_00000000, 0x20_0000),
            ],
            2,
        );
        let reader = BinaryReader::new(&buf);
        let header = TriageHeader::decode(&reader).unwrap();
        assert_eq!(header.driver_count, 2);

        let modules = driver_list(&reader, &header);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name, "ntoskrnl.exe");
        assert_eq!(modules[1].name, "nvlddmkm.sys");
        assert_eq!(modules[1].base, 0xfffff801_00000000);
        assert_eq!(modules[1].size, 0x20_0000);
        assert_eq!(modules[1].checksum, 0xabcd);
        assert_eq!(modules[1].origin, ModuleOrigin::DriverTable);

        assert_eq!(
            string_pool(&reader, &header),
            vec![
                "\\SystemRoot\\system32\\ntoskrnl.exe".to_string(),
                "\\SystemRoot\\System32\\drivers\\nvlddmkm.sys".to_string()
            ]
        );
    }

    #[test]
    fn walk_stops_at_zero_name_offset() {
        // claims three entries, the third one is zeroed
        let buf = build(&[("a.sys", 0x1000, 0x1000), ("b.sys", 0x4000, 0x1000)], 3);
        let reader = BinaryReader::new(&buf);
        let header = TriageHeader::decode(&reader).unwrap();
        let modules = driver_list(&reader, &header);
        assert_eq!(modules.len(), 2);
    }

    #[test]
    fn walk_stops_at_out_of_range_name() {
        let mut buf = build(&[("a.sys", 0x1000, 0x1000), ("b.sys", 0x4000, 0x1000)], 2);
        put_u32(&mut buf, 0x2100 + DRIVER_ENTRY_SIZE, 0x7fff_0000);
        let reader = BinaryReader::new(&buf);
        let header = TriageHeader::decode(&reader).unwrap();
        let modules = driver_list(&reader, &header);
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "a.sys");
    }

    #[test]
    fn truncated_triage_header() {
        let buf = vec![0u8; 0x2010];
        assert!(TriageHeader::decode(&BinaryReader::new(&buf))
            .unwrap_err()
            .is_truncation());
    }
}
