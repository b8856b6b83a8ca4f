use super::Location;
use crate::error::{Error, Result};
use crate::reader::BinaryReader;

/// Size of the original `MINIDUMP_MISC_INFO`.
pub const MISC_INFO_SIZE: u64 = 0x18;

bitflags! {
    /// `MINIDUMP_MISC1_*` validity flags.
    #[cfg_attr(feature = "serde", derive(::serde::Serialize))]
    pub struct MiscInfoFlags: u32 {
        const PROCESS_ID = 0x0000_0001;
        const PROCESS_TIMES = 0x0000_0002;
        const PROCESSOR_POWER_INFO = 0x0000_0004;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct MiscInfo {
    pub flags: MiscInfoFlags,
    pub process_id: Option<u32>,
    /// Seconds since the unix epoch.
    pub process_create_time: Option<u32>,
    pub process_user_time: Option<u32>,
    pub process_kernel_time: Option<u32>,
    pub processor_max_mhz: Option<u32>,
    pub processor_current_mhz: Option<u32>,
}

impl MiscInfo {
    /// Decodes `MINIDUMP_MISC_INFO` and the processor power fields of `MINIDUMP_MISC_INFO_2`.
    /// Fields are only reported if their validity flag is set.
    pub fn decode(reader: &BinaryReader, location: Location) -> Result<Self> {
        let stream = location.reader(reader, "misc info")?;
        if stream.len() < MISC_INFO_SIZE {
            return Err(Error::TruncatedBuffer("misc info"));
        }

        let flags = MiscInfoFlags::from_bits_truncate(stream.read_u32(0x4)?);

        let (process_id, process_create_time, process_user_time, process_kernel_time) = {
            let pid = if flags.contains(MiscInfoFlags::PROCESS_ID) {
                Some(stream.read_u32(0x8)?)
            } else {
                None
            };
            if flags.contains(MiscInfoFlags::PROCESS_TIMES) {
                (
                    pid,
                    Some(stream.read_u32(0xc)?),
                    Some(stream.read_u32(0x10)?),
                    Some(stream.read_u32(0x14)?),
                )
            } else {
                (pid, None, None, None)
            }
        };

        let (processor_max_mhz, processor_current_mhz) =
            if flags.contains(MiscInfoFlags::PROCESSOR_POWER_INFO) && stream.len() >= 0x2c {
                (Some(stream.read_u32(0x18)?), Some(stream.read_u32(0x1c)?))
            } else {
                (None, None)
            };

        Ok(Self {
            flags,
            process_id,
            process_create_time,
            process_user_time,
            process_kernel_time,
            processor_max_mhz,
            processor_current_mhz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_fields() {
        let mut buf = vec![0u8; 0x18];
        buf[0..4].copy_from_slice(&0x18u32.to_le_bytes());
        buf[4..8].copy_from_slice(&3u32.to_le_bytes());
        buf[8..12].copy_from_slice(&4242u32.to_le_bytes());
        buf[12..16].copy_from_slice(&1_600_000_000u32.to_le_bytes());

        let info = MiscInfo::decode(&BinaryReader::new(&buf), Location::new(0x18, 0)).unwrap();
        assert_eq!(info.process_id, Some(4242));
        assert_eq!(info.process_create_time, Some(1_600_000_000));
        assert_eq!(info.processor_max_mhz, None);
    }

    #[test]
    fn flags_gate_fields() {
        let mut buf = vec![0u8; 0x18];
        buf[8..12].copy_from_slice(&4242u32.to_le_bytes());
        let info = MiscInfo::decode(&BinaryReader::new(&buf), Location::new(0x18, 0)).unwrap();
        assert_eq!(info.process_id, None);
        assert!(info.flags.is_empty());
    }
}
