/*!
Container detection and dispatch.

The declared file name of a dump is only used as a logged hint. The signature always decides
which decoder is used.
*/

use std::fmt;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::error::{Error, Result};
use crate::kernel::KernelDump;
use crate::minidump::{Minidump, MINIDUMP_SIGNATURE};
use crate::reader::BinaryReader;

/// Signature of 64-bit kernel dumps.
pub const KERNEL64_SIGNATURE: &[u8; 8] = b"PAGEDU64";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum Format {
    Kernel64,
    Minidump,
    Unknown,
}

impl Format {
    /// Classifies a buffer by its leading signature.
    ///
    /// Buffers shorter than a signature are `Format::Unknown`.
    pub fn detect(bytes: &[u8]) -> Self {
        let reader = BinaryReader::new(bytes);
        if reader.read_bytes(0, 8).ok() == Some(&KERNEL64_SIGNATURE[..]) {
            Format::Kernel64
        } else if reader.read_u32(0).ok() == Some(MINIDUMP_SIGNATURE) {
            Format::Minidump
        } else {
            Format::Unknown
        }
    }

    /// Format suggested by a file name, if the name carries any hint.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        let file = crate::types::file_name(&lower);
        if file == "memory.dmp" || lower.ends_with(".kdmp") {
            Some(Format::Kernel64)
        } else if lower.ends_with(".mdmp") || lower.ends_with(".hdmp") {
            Some(Format::Minidump)
        } else {
            None
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Format::Kernel64 => f.write_str("kernel dump (PAGEDU64)"),
            Format::Minidump => f.write_str("minidump (MDMP)"),
            Format::Unknown => f.write_str("unknown"),
        }
    }
}

/// An immutable dump buffer together with its detected format.
#[derive(Clone)]
pub struct RawDump {
    bytes: Vec<u8>,
    format: Format,
    name: Option<String>,
}

impl RawDump {
    pub fn new(bytes: Vec<u8>) -> Self {
        let format = Format::detect(&bytes);
        Self {
            bytes,
            format,
            name: None,
        }
    }

    /// Creates a dump with a declared file name. A mismatch between the name and the detected
    /// format is logged and otherwise ignored.
    pub fn with_name(bytes: Vec<u8>, name: &str) -> Self {
        let mut dump = Self::new(bytes);
        match Format::from_file_name(name) {
            Some(hint) if hint != dump.format => warn!(
                "file name {} suggests a {} but the signature says {}",
                name, hint, dump.format
            ),
            _ => info!("{}: detected {}", name, dump.format),
        }
        dump.name = Some(name.to_string());
        dump
    }

    /// Reads a dump from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes =
            fs::read(path.as_ref()).map_err(|_| Error::Other("unable to read dump file"))?;
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Ok(match name {
            Some(name) => Self::with_name(bytes, &name),
            None => Self::new(bytes),
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn reader(&self) -> BinaryReader<'_> {
        BinaryReader::new(&self.bytes)
    }

    /// Dispatches to the decoder matching the detected format.
    pub fn parse(&self) -> Result<ParsedDump<'_>> {
        match self.format {
            Format::Kernel64 => KernelDump::parse(self.reader()).map(ParsedDump::Kernel),
            Format::Minidump => Minidump::parse(self.reader()).map(ParsedDump::Minidump),
            Format::Unknown => Err(Error::UnknownFormat),
        }
    }
}

impl fmt::Debug for RawDump {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RawDump")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("name", &self.name)
            .finish()
    }
}

/// A decoded container.
#[derive(Debug, Clone)]
pub enum ParsedDump<'a> {
    Kernel(KernelDump<'a>),
    Minidump(Minidump<'a>),
}

impl<'a> ParsedDump<'a> {
    pub fn format(&self) -> Format {
        match self {
            ParsedDump::Kernel(_) => Format::Kernel64,
            ParsedDump::Minidump(_) => Format::Minidump,
        }
    }

    pub fn reader(&self) -> &BinaryReader<'a> {
        match self {
            ParsedDump::Kernel(dump) => dump.reader(),
            ParsedDump::Minidump(dump) => dump.reader(),
        }
    }
}
