use std::fmt;

use log::debug;

use super::Location;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;
use crate::types::{Architecture, OsVersion};

/// Size of `MINIDUMP_SYSTEM_INFO`.
pub const SYSTEM_INFO_SIZE: u64 = 0x38;

/// `VER_NT_*` product types.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum ProductType {
    Workstation,
    DomainController,
    Server,
    Unknown(u8),
}

impl From<u8> for ProductType {
    fn from(value: u8) -> Self {
        match value {
            1 => ProductType::Workstation,
            2 => ProductType::DomainController,
            3 => ProductType::Server,
            other => ProductType::Unknown(other),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProductType::Workstation => f.write_str("workstation"),
            ProductType::DomainController => f.write_str("domain controller"),
            ProductType::Server => f.write_str("server"),
            ProductType::Unknown(v) => write!(f, "unknown({})", v),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct SystemInfo {
    pub architecture: Architecture,
    pub processor_level: u16,
    pub processor_revision: u16,
    pub processor_count: u8,
    pub product_type: ProductType,
    pub version: OsVersion,
    pub platform_id: u32,
    /// Service pack string, e.g. `Service Pack 1`.
    pub csd_version: Option<String>,
    pub suite_mask: u16,
    /// CPUID vendor string of x86 and amd64 processors.
    pub cpu_vendor: Option<String>,
}

impl SystemInfo {
    /// Decodes `MINIDUMP_SYSTEM_INFO`.
    ///
    /// ```text
    /// 0x00 ProcessorArchitecture  u16
    /// 0x02 ProcessorLevel         u16
    /// 0x04 ProcessorRevision      u16
    /// 0x06 NumberOfProcessors     u8
    /// 0x07 ProductType            u8
    /// 0x08 MajorVersion           u32
    /// 0x0c MinorVersion           u32
    /// 0x10 BuildNumber            u32
    /// 0x14 PlatformId             u32
    /// 0x18 CSDVersionRva          u32
    /// 0x1c SuiteMask              u16
    /// 0x20 Cpu                    CPU_INFORMATION
    /// ```
    pub fn decode(reader: &BinaryReader, location: Location) -> Result<Self> {
        let stream = location.reader(reader, "system info")?;
        if stream.len() < SYSTEM_INFO_SIZE {
            return Err(Error::TruncatedBuffer("system info"));
        }

        let architecture = Architecture::from_processor_architecture(stream.read_u16(0)?);

        let csd_rva = u64::from(stream.read_u32(0x18)?);
        let csd_version = if csd_rva != 0 {
            match reader.read_utf16_prefixed(csd_rva) {
                Ok(s) if !s.is_empty() => Some(s),
                Ok(_) => None,
                Err(err) => {
                    debug!("unable to read csd version string: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let cpu_vendor = match architecture {
            Architecture::Amd64 | Architecture::X86 => stream
                .read_fixed_ascii(0x20, 12)
                .ok()
                .filter(|v| !v.is_empty()),
            _ => None,
        };

        Ok(Self {
            architecture,
            processor_level: stream.read_u16(0x2)?,
            processor_revision: stream.read_u16(0x4)?,
            processor_count: stream.read_u8(0x6)?,
            product_type: ProductType::from(stream.read_u8(0x7)?),
            version: OsVersion::new(
                stream.read_u32(0x8)?,
                stream.read_u32(0xc)?,
                stream.read_u32(0x10)?,
            ),
            platform_id: stream.read_u32(0x14)?,
            csd_version,
            suite_mask: stream.read_u16(0x1c)?,
            cpu_vendor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_info(arch: u16) -> Vec<u8> {
        let mut buf = vec![0u8; 0x40];
        let stream = &mut buf[0x8..];
        stream[0..2].copy_from_slice(&arch.to_le_bytes());
        stream[2..4].copy_from_slice(&6u16.to_le_bytes());
        stream[6] = 16;
        stream[7] = 1;
        stream[8..12].copy_from_slice(&10u32.to_le_bytes());
        stream[0x10..0x14].copy_from_slice(&19045u32.to_le_bytes());
        stream[0x14..0x18].copy_from_slice(&2u32.to_le_bytes());
        stream[0x20..0x2c].copy_from_slice(b"GenuineIntel");
        buf
    }

    #[test]
    fn decode_amd64() {
        let buf = system_info(9);
        let info = SystemInfo::decode(&BinaryReader::new(&buf), Location::new(0x38, 0x8)).unwrap();
        assert_eq!(info.architecture, Architecture::Amd64);
        assert_eq!(info.processor_count, 16);
        assert_eq!(info.product_type, ProductType::Workstation);
        assert_eq!(info.version.to_string(), "10.0.19045");
        assert_eq!(info.csd_version, None);
        assert_eq!(info.cpu_vendor.as_deref(), Some("GenuineIntel"));
    }

    #[test]
    fn arm64_has_no_vendor_string() {
        let buf = system_info(12);
        let info = SystemInfo::decode(&BinaryReader::new(&buf), Location::new(0x38, 0x8)).unwrap();
        assert_eq!(info.architecture, Architecture::Arm64);
        assert_eq!(info.cpu_vendor, None);
    }

    #[test]
    fn short_stream() {
        let buf = system_info(9);
        assert_eq!(
            SystemInfo::decode(&BinaryReader::new(&buf), Location::new(0x20, 0x8)),
            Err(Error::TruncatedBuffer("system info"))
        );
    }
}
