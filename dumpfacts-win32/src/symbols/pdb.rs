use std::convert::TryFrom;
use std::fs;
use std::path::Path;
use std::{fmt, io, result};

use log::{debug, info};
use pdb::{FallibleIterator, Source, SourceSlice, SourceView, PDB};

use super::table::SymbolTable;
use crate::error::{Error, Result};

/// Public and procedure symbols of a pdb file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbSymbols {
    table: SymbolTable,
}

impl PdbSymbols {
    pub fn new(pdb_slice: &[u8]) -> Result<Self> {
        let pdb_buffer = PdbSourceBuffer::new(pdb_slice);
        let mut pdb = PDB::open(pdb_buffer).map_err(|_| Error::PDB("unable to open pdb"))?;

        let symbol_table = pdb
            .global_symbols()
            .map_err(|_| Error::PDB("unable to read global symbols"))?;
        let address_map = pdb
            .address_map()
            .map_err(|_| Error::PDB("unable to read address map"))?;

        let mut table = SymbolTable::new();

        let mut symbols = symbol_table.iter();
        while let Some(symbol) = symbols
            .next()
            .map_err(|_| Error::PDB("malformed symbol record"))?
        {
            if let Ok(pdb::SymbolData::Public(data)) = symbol.parse() {
                if let Some(rva) = data.offset.to_rva(&address_map) {
                    table.insert(u64::from(rva.0), &data.name.to_string());
                }
            }
        }

        debug!("pdb contains {} public symbols", table.len());
        Ok(Self { table })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("loading pdb from {}", path.as_ref().to_string_lossy());
        let bytes = fs::read(path).map_err(|_| Error::PDB("unable to read pdb file"))?;
        Self::new(&bytes)
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_table(self) -> SymbolTable {
        self.table
    }
}

pub struct PdbSourceBuffer<'a> {
    bytes: &'a [u8],
}

impl<'a> PdbSourceBuffer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl<'a> fmt::Debug for PdbSourceBuffer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdbSourceBuffer({} bytes)", self.bytes.len())
    }
}

impl<'a, 's> Source<'s> for PdbSourceBuffer<'a> {
    fn view(
        &mut self,
        slices: &[SourceSlice],
    ) -> result::Result<Box<dyn SourceView<'s>>, io::Error> {
        let len = slices.iter().fold(0_usize, |acc, s| acc + s.size);

        let mut bytes = Vec::with_capacity(len);
        for slice in slices {
            let chunk = usize::try_from(slice.offset)
                .ok()
                .and_then(|start| self.bytes.get(start..start.checked_add(slice.size)?))
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "pdb slice out of bounds")
                })?;
            bytes.extend_from_slice(chunk);
        }

        Ok(Box::new(PdbSourceBufferView { bytes }))
    }
}

#[derive(Clone)]
struct PdbSourceBufferView {
    bytes: Vec<u8>,
}

impl fmt::Debug for PdbSourceBufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PdbSourceBufferView({} bytes)", self.bytes.len())
    }
}

impl Drop for PdbSourceBufferView {
    fn drop(&mut self) {
        // no-op
    }
}

impl SourceView<'_> for PdbSourceBufferView {
    fn as_slice(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdb_data() {
        assert!(PdbSymbols::new(&[]).is_err());
        assert!(PdbSymbols::new(b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0").is_err());
        assert!(PdbSymbols::from_file("/nonexistent/file.pdb").is_err());
    }

    #[test]
    fn source_view_bounds() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let mut source = PdbSourceBuffer::new(&data);
        let slices = [
            SourceSlice { offset: 4, size: 2 },
            SourceSlice { offset: 0, size: 2 },
        ];
        let view = source.view(&slices).unwrap();
        assert_eq!(view.as_slice(), &[5, 6, 1, 2]);

        let out_of_bounds = [SourceSlice { offset: 5, size: 4 }];
        assert!(source.view(&out_of_bounds).is_err());
    }
}
