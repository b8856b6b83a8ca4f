/*!
Physical memory layout of full and bitmap kernel dumps.

Both map physical pages to file offsets. Full dumps store the pages of every run back to back
directly after the header, bitmap dumps store a bitmap of present pages followed by the pages
themselves.
*/

use std::fmt;
use std::mem::size_of;

use dataview::Pod;
use log::{debug, info};

use crate::error::{Error, Result};
use crate::reader::BinaryReader;

/// The number of `PhysicalMemoryRun`s contained in the header.
pub const PHYSICAL_MEMORY_MAX_RUNS: usize = 0x20;

const PAGE_SHIFT: u64 = 12;
const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// 'FDMP', full bitmap dump.
pub const BMP_SIGNATURE_FULL: u32 = 0x504D_4446;
/// 'SDMP', kernel bitmap dump.
pub const BMP_SIGNATURE_SUMMARY: u32 = 0x504D_4453;
/// 'DUMP'
pub const BMP_VALID_DUMP: u32 = 0x504D_5544;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct PhysicalMemoryRun {
    pub base_page: u64,
    pub page_count: u64,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct PhysicalMemoryDescriptor {
    pub number_of_runs: u32,
    pub _pad: u32,
    pub number_of_pages: u64,
    pub runs: [PhysicalMemoryRun; PHYSICAL_MEMORY_MAX_RUNS],
}

unsafe impl Pod for PhysicalMemoryRun {}
unsafe impl Pod for PhysicalMemoryDescriptor {}

impl fmt::Debug for PhysicalMemoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PhysicalMemoryDescriptor")
            .field("number_of_runs", &self.number_of_runs)
            .field("number_of_pages", &self.number_of_pages)
            .finish()
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct BmpHeader {
    pub signature: u32,
    pub valid_dump: u32,
    pub _pad: [u8; 0x20 - 0x8],
    pub first_page: u64,
    pub total_present_pages: u64,
    pub pages: u64,
}

unsafe impl Pod for BmpHeader {}

/// A contiguous range of physical memory and where its bytes live in the file.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct MemoryRun {
    pub base: u64,
    pub size: u64,
    pub file_offset: u64,
}

impl MemoryRun {
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }
}

/// Ordered list of physical memory runs.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct PhysicalMemoryMap {
    runs: Vec<MemoryRun>,
}

impl PhysicalMemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_remap(&mut self, base: u64, size: u64, file_offset: u64) {
        debug!(
            "adding memory mapping: base={:x} size={:x} file_offset={:x}",
            base, size, file_offset
        );
        self.runs.push(MemoryRun {
            base,
            size,
            file_offset,
        });
    }

    pub fn runs(&self) -> &[MemoryRun] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total number of bytes covered by all runs.
    pub fn total_size(&self) -> u64 {
        self.runs.iter().map(|r| r.size).sum()
    }

    /// Translates a physical address into a file offset.
    pub fn translate(&self, phys: u64) -> Option<u64> {
        self.runs
            .iter()
            .find(|r| r.base <= phys && phys < r.end())
            .and_then(|r| r.file_offset.checked_add(phys - r.base))
    }
}

/// Builds the memory map of a full dump out of the header's physical memory descriptor.
///
/// Run data starts right after the header and is stored contiguously.
pub fn parse_full_dump(
    descriptor: &PhysicalMemoryDescriptor,
    header_size: u64,
) -> Result<PhysicalMemoryMap> {
    let number_of_runs = descriptor.number_of_runs as usize;
    if number_of_runs > PHYSICAL_MEMORY_MAX_RUNS {
        return Err(Error::TruncatedBuffer(
            "too many memory runs in physical memory descriptor",
        ));
    }

    let mut mem_map = PhysicalMemoryMap::new();
    let mut file_offset = header_size;

    for run in descriptor.runs.iter().take(number_of_runs) {
        let base = run.base_page << PAGE_SHIFT;
        let size = run
            .page_count
            .checked_mul(PAGE_SIZE)
            .ok_or(Error::TruncatedBuffer("memory run size overflows"))?;
        mem_map.push_remap(base, size, file_offset);
        file_offset = file_offset
            .checked_add(size)
            .ok_or(Error::TruncatedBuffer("memory run size overflows"))?;
    }

    Ok(mem_map)
}

/// Builds the memory map of a bitmap dump whose `BmpHeader` is located at `offset`.
///
/// Consecutive present pages are merged into a single run.
pub fn parse_bitmap_dump(reader: &BinaryReader, offset: u64) -> Result<PhysicalMemoryMap> {
    let header = reader.read_pod::<BmpHeader>(offset)?;

    if header.signature != BMP_SIGNATURE_FULL && header.signature != BMP_SIGNATURE_SUMMARY {
        return Err(Error::BadSignature);
    }
    if header.valid_dump != BMP_VALID_DUMP {
        return Err(Error::BadSignature);
    }

    info!(
        "bitmap dump - first_page: {:x} present_pages: {:x} pages: {:x}",
        header.first_page, header.total_present_pages, header.pages
    );

    let bitmap_len = header
        .pages
        .checked_add(7)
        .map(|bits| bits / 8)
        .ok_or(Error::TruncatedBuffer("bitmap size overflows"))?;
    let bitmap = reader
        .read_bytes(offset + size_of::<BmpHeader>() as u64, bitmap_len)
        .map_err(|_| Error::TruncatedBuffer("bitmap extends past the end of the file"))?;

    let mut mem_map = PhysicalMemoryMap::new();
    let mut file_offset = header.first_page;
    let mut run_start: Option<u64> = None;

    for page in 0..header.pages {
        let present = bitmap[(page / 8) as usize] & (1 << (page % 8)) != 0;
        match (present, run_start) {
            (true, None) => run_start = Some(page),
            (false, Some(start)) => {
                let size = (page - start) * PAGE_SIZE;
                mem_map.push_remap(start * PAGE_SIZE, size, file_offset);
                file_offset = file_offset.saturating_add(size);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        let size = (header.pages - start) * PAGE_SIZE;
        mem_map.push_remap(start * PAGE_SIZE, size, file_offset);
    }

    info!(
        "bitmap dump maps {:x} bytes in {} runs",
        mem_map.total_size(),
        mem_map.runs().len()
    );

    Ok(mem_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed_descriptor() -> PhysicalMemoryDescriptor {
        PhysicalMemoryDescriptor {
            number_of_runs: 0,
            _pad: 0,
            number_of_pages: 0,
            runs: [PhysicalMemoryRun {
                base_page: 0,
                page_count: 0,
            }; PHYSICAL_MEMORY_MAX_RUNS],
        }
    }

    #[test]
    fn struct_sizes() {
        assert_eq!(size_of::<PhysicalMemoryRun>(), 0x10);
        assert_eq!(size_of::<PhysicalMemoryDescriptor>(), 0x210);
        assert_eq!(size_of::<BmpHeader>(), 0x38);
    }

    #[test]
    fn full_dump_runs() {
        let mut descriptor = zeroed_descriptor();
        descriptor.number_of_runs = 2;
        descriptor.runs[0] = PhysicalMemoryRun {
            base_page: 1,
            page_count: 0x9e,
        };
        descriptor.runs[1] = PhysicalMemoryRun {
            base_page: 0x100,
            page_count: 0x10,
        };

        let map = parse_full_dump(&descriptor, 0x2000).unwrap();
        assert_eq!(map.runs().len(), 2);
        assert_eq!(map.runs()[1].file_offset, 0x2000 + 0x9e000);
        assert_eq!(map.translate(0x1000), Some(0x2000));
        assert_eq!(map.translate(0x100_010), Some(0x2000 + 0x9e000 + 0x10));
        assert_eq!(map.translate(0x0), None);
        assert_eq!(map.total_size(), 0xae000);
    }

    #[test]
    fn too_many_runs() {
        let mut descriptor = zeroed_descriptor();
        descriptor.number_of_runs = 0x21;
        assert!(parse_full_dump(&descriptor, 0x2000).is_err());
    }

    #[test]
    fn bitmap_runs() {
        let mut buf = vec![0u8; 0x38];
        buf[0..4].copy_from_slice(&BMP_SIGNATURE_SUMMARY.to_le_bytes());
        buf[4..8].copy_from_slice(&BMP_VALID_DUMP.to_le_bytes());
        buf[0x20..0x28].copy_from_slice(&0x4000u64.to_le_bytes());
        buf[0x28..0x30].copy_from_slice(&5u64.to_le_bytes());
        buf[0x30..0x38].copy_from_slice(&16u64.to_le_bytes());
        // pages 0..3 and 9..11 present
        buf.extend_from_slice(&[0b0000_0111, 0b0000_0110]);

        let map = parse_bitmap_dump(&BinaryReader::new(&buf), 0).unwrap();
        assert_eq!(
            map.runs(),
            &[
                MemoryRun {
                    base: 0,
                    size: 0x3000,
                    file_offset: 0x4000
                },
                MemoryRun {
                    base: 0x9000,
                    size: 0x2000,
                    file_offset: 0x7000
                },
            ]
        );
    }

    #[test]
    fn bitmap_bad_signature() {
        let buf = vec![0u8; 0x40];
        assert_eq!(
            parse_bitmap_dump(&BinaryReader::new(&buf), 0),
            Err(Error::BadSignature)
        );
    }
}
