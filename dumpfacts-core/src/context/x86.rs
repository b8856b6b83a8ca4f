use crate::error::{Error, Result};
use crate::reader::BinaryReader;

use super::Segments;

/// Size of the x86 `CONTEXT` structure including the extended registers area.
pub const CONTEXT_X86_SIZE: u64 = 0x2cc;

/// Offsets into the x86 `CONTEXT` structure.
pub mod offsets {
    pub const CONTEXT_FLAGS: u64 = 0x00;
    pub const SEG_GS: u64 = 0x8c;
    pub const SEG_FS: u64 = 0x90;
    pub const SEG_ES: u64 = 0x94;
    pub const SEG_DS: u64 = 0x98;
    pub const EDI: u64 = 0x9c;
    pub const ESI: u64 = 0xa0;
    pub const EBX: u64 = 0xa4;
    pub const EDX: u64 = 0xa8;
    pub const ECX: u64 = 0xac;
    pub const EAX: u64 = 0xb0;
    pub const EBP: u64 = 0xb4;
    pub const EIP: u64 = 0xb8;
    pub const SEG_CS: u64 = 0xbc;
    pub const EFLAGS: u64 = 0xc0;
    pub const ESP: u64 = 0xc4;
    pub const SEG_SS: u64 = 0xc8;
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct X86Registers {
    pub context_flags: u32,
    pub eip: u32,
    pub esp: u32,
    pub ebp: u32,
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub eflags: u32,
    pub segments: Segments,
}

impl X86Registers {
    /// Decodes an x86 `CONTEXT` at `offset`.
    pub fn decode(reader: &BinaryReader, offset: u64) -> Result<Self> {
        if !reader.contains(offset, CONTEXT_X86_SIZE) {
            return Err(Error::TruncatedBuffer("x86 context record"));
        }

        // segment selectors are stored as dwords
        let seg = |at: u64| reader.read_u32(offset + at).map(|v| v as u16);

        Ok(Self {
            context_flags: reader.read_u32(offset + offsets::CONTEXT_FLAGS)?,
            segments: Segments {
                cs: seg(offsets::SEG_CS)?,
                ds: seg(offsets::SEG_DS)?,
                es: seg(offsets::SEG_ES)?,
                fs: seg(offsets::SEG_FS)?,
                gs: seg(offsets::SEG_GS)?,
                ss: seg(offsets::SEG_SS)?,
            },
            edi: reader.read_u32(offset + offsets::EDI)?,
            esi: reader.read_u32(offset + offsets::ESI)?,
            ebx: reader.read_u32(offset + offsets::EBX)?,
            edx: reader.read_u32(offset + offsets::EDX)?,
            ecx: reader.read_u32(offset + offsets::ECX)?,
            eax: reader.read_u32(offset + offsets::EAX)?,
            ebp: reader.read_u32(offset + offsets::EBP)?,
            eip: reader.read_u32(offset + offsets::EIP)?,
            eflags: reader.read_u32(offset + offsets::EFLAGS)?,
            esp: reader.read_u32(offset + offsets::ESP)?,
        })
    }

    /// Encodes the registers back into a zero-filled `CONTEXT` record.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CONTEXT_X86_SIZE as usize];
        let values = [
            (offsets::CONTEXT_FLAGS, self.context_flags),
            (offsets::SEG_GS, u32::from(self.segments.gs)),
            (offsets::SEG_FS, u32::from(self.segments.fs)),
            (offsets::SEG_ES, u32::from(self.segments.es)),
            (offsets::SEG_DS, u32::from(self.segments.ds)),
            (offsets::EDI, self.edi),
            (offsets::ESI, self.esi),
            (offsets::EBX, self.ebx),
            (offsets::EDX, self.edx),
            (offsets::ECX, self.ecx),
            (offsets::EAX, self.eax),
            (offsets::EBP, self.ebp),
            (offsets::EIP, self.eip),
            (offsets::SEG_CS, u32::from(self.segments.cs)),
            (offsets::EFLAGS, self.eflags),
            (offsets::ESP, self.esp),
            (offsets::SEG_SS, u32::from(self.segments.ss)),
        ];
        for (at, value) in values.iter() {
            let at = *at as usize;
            buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_encoded() {
        let regs = X86Registers {
            context_flags: 0x0001_0007,
            eip: 0x7712_3456,
            esp: 0x0019_fe00,
            ebp: 0x0019_fe40,
            eax: 0xdead_beef,
            eflags: 0x202,
            segments: Segments {
                cs: 0x23,
                ss: 0x2b,
                fs: 0x53,
                ..Default::default()
            },
            ..Default::default()
        };
        let buf = regs.encode();
        assert_eq!(
            X86Registers::decode(&BinaryReader::new(&buf), 0).unwrap(),
            regs
        );
    }

    #[test]
    fn short_context() {
        let buf = vec![0u8; 0xcc];
        assert!(X86Registers::decode(&BinaryReader::new(&buf), 0)
            .unwrap_err()
            .is_truncation());
    }
}
