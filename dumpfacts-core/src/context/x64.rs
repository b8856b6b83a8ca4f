use crate::error::{Error, Result};
use crate::reader::BinaryReader;

use super::Segments;

/// Size of the amd64 `CONTEXT` structure.
pub const CONTEXT_AMD64_SIZE: u64 = 0x4d0;

/// Offsets into the amd64 `CONTEXT` structure.
pub mod offsets {
    pub const CONTEXT_FLAGS: u64 = 0x30;
    pub const MX_CSR: u64 = 0x34;
    pub const SEG_CS: u64 = 0x38;
    pub const SEG_DS: u64 = 0x3a;
    pub const SEG_ES: u64 = 0x3c;
    pub const SEG_FS: u64 = 0x3e;
    pub const SEG_GS: u64 = 0x40;
    pub const SEG_SS: u64 = 0x42;
    pub const EFLAGS: u64 = 0x44;
    pub const DR0: u64 = 0x48;
    pub const DR7: u64 = 0x70;
    pub const RAX: u64 = 0x78;
    pub const RSP: u64 = 0x98;
    pub const RBP: u64 = 0xa0;
    pub const R15: u64 = 0xf0;
    pub const RIP: u64 = 0xf8;
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct DebugRegisters {
    pub dr0: u64,
    pub dr1: u64,
    pub dr2: u64,
    pub dr3: u64,
    pub dr6: u64,
    pub dr7: u64,
}

impl DebugRegisters {
    /// True if any of the local/global enable bits of dr7 are set.
    pub fn any_enabled(&self) -> bool {
        self.dr7 & 0xff != 0
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Amd64Registers {
    pub context_flags: u32,
    pub mx_csr: u32,
    pub rip: u64,
    pub rsp: u64,
    pub rbp: u64,
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub eflags: u32,
    pub segments: Segments,
    pub debug: DebugRegisters,
}

impl Amd64Registers {
    /// Decodes an amd64 `CONTEXT` at `offset`.
    pub fn decode(reader: &BinaryReader, offset: u64) -> Result<Self> {
        if !reader.contains(offset, CONTEXT_AMD64_SIZE) {
            return Err(Error::TruncatedBuffer("amd64 context record"));
        }

        let gpr = |idx: u64| reader.read_u64(offset + offsets::RAX + idx * 8);

        Ok(Self {
            context_flags: reader.read_u32(offset + offsets::CONTEXT_FLAGS)?,
            mx_csr: reader.read_u32(offset + offsets::MX_CSR)?,
            segments: Segments {
                cs: reader.read_u16(offset + offsets::SEG_CS)?,
                ds: reader.read_u16(offset + offsets::SEG_DS)?,
                es: reader.read_u16(offset + offsets::SEG_ES)?,
                fs: reader.read_u16(offset + offsets::SEG_FS)?,
                gs: reader.read_u16(offset + offsets::SEG_GS)?,
                ss: reader.read_u16(offset + offsets::SEG_SS)?,
            },
            eflags: reader.read_u32(offset + offsets::EFLAGS)?,
            debug: DebugRegisters {
                dr0: reader.read_u64(offset + offsets::DR0)?,
                dr1: reader.read_u64(offset + offsets::DR0 + 0x8)?,
                dr2: reader.read_u64(offset + offsets::DR0 + 0x10)?,
                dr3: reader.read_u64(offset + offsets::DR0 + 0x18)?,
                dr6: reader.read_u64(offset + offsets::DR0 + 0x20)?,
                dr7: reader.read_u64(offset + offsets::DR7)?,
            },
            // rax, rcx, rdx, rbx, rsp, rbp, rsi, rdi, r8 .. r15
            rax: gpr(0)?,
            rcx: gpr(1)?,
            rdx: gpr(2)?,
            rbx: gpr(3)?,
            rsp: gpr(4)?,
            rbp: gpr(5)?,
            rsi: gpr(6)?,
            rdi: gpr(7)?,
            r8: gpr(8)?,
            r9: gpr(9)?,
            r10: gpr(10)?,
            r11: gpr(11)?,
            r12: gpr(12)?,
            r13: gpr(13)?,
            r14: gpr(14)?,
            r15: gpr(15)?,
            rip: reader.read_u64(offset + offsets::RIP)?,
        })
    }

    /// Encodes the registers back into a zero-filled `CONTEXT` record.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CONTEXT_AMD64_SIZE as usize];
        let mut put = |at: u64, bytes: &[u8]| {
            let at = at as usize;
            buf[at..at + bytes.len()].copy_from_slice(bytes);
        };

        put(offsets::CONTEXT_FLAGS, &self.context_flags.to_le_bytes());
        put(offsets::MX_CSR, &self.mx_csr.to_le_bytes());
        put(offsets::SEG_CS, &self.segments.cs.to_le_bytes());
        put(offsets::SEG_DS, &self.segments.ds.to_le_bytes());
        put(offsets::SEG_ES, &self.segments.es.to_le_bytes());
        put(offsets::SEG_FS, &self.segments.fs.to_le_bytes());
        put(offsets::SEG_GS, &self.segments.gs.to_le_bytes());
        put(offsets::SEG_SS, &self.segments.ss.to_le_bytes());
        put(offsets::EFLAGS, &self.eflags.to_le_bytes());

        let debug = [
            self.debug.dr0,
            self.debug.dr1,
            self.debug.dr2,
            self.debug.dr3,
            self.debug.dr6,
            self.debug.dr7,
        ];
        for (i, dr) in debug.iter().enumerate() {
            put(offsets::DR0 + i as u64 * 8, &dr.to_le_bytes());
        }

        let gprs = [
            self.rax, self.rcx, self.rdx, self.rbx, self.rsp, self.rbp, self.rsi, self.rdi,
            self.r8, self.r9, self.r10, self.r11, self.r12, self.r13, self.r14, self.r15,
        ];
        for (i, reg) in gprs.iter().enumerate() {
            put(offsets::RAX + i as u64 * 8, &reg.to_le_bytes());
        }
        put(offsets::RIP, &self.rip.to_le_bytes());

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_offsets() {
        assert_eq!(offsets::RSP, offsets::RAX + 4 * 8);
        assert_eq!(offsets::RBP, offsets::RAX + 5 * 8);
        assert_eq!(offsets::R15, offsets::RAX + 15 * 8);
        assert_eq!(offsets::RIP, offsets::R15 + 8);
        assert_eq!(offsets::DR7, offsets::DR0 + 5 * 8);
    }

    #[test]
    fn decode_encoded() {
        let regs = Amd64Registers {
            context_flags: 0x0010_001f,
            rip: 0xfffff802_1d2a3b4c,
            rsp: 0xffffa001_23456780,
            rbp: 0xffffa001_23456800,
            rax: 1,
            rcx: 0xa,
            r15: 0xf,
            eflags: 0x246,
            segments: Segments {
                cs: 0x10,
                ss: 0x18,
                ..Default::default()
            },
            debug: DebugRegisters {
                dr7: 0x401,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut buf = vec![0xccu8; 0x10];
        buf.extend(regs.encode());

        let decoded = Amd64Registers::decode(&BinaryReader::new(&buf), 0x10).unwrap();
        assert_eq!(decoded, regs);
        assert!(decoded.debug.any_enabled());
    }

    #[test]
    fn short_context() {
        let buf = vec![0u8; CONTEXT_AMD64_SIZE as usize - 1];
        assert_eq!(
            Amd64Registers::decode(&BinaryReader::new(&buf), 0),
            Err(Error::TruncatedBuffer("amd64 context record"))
        );
    }
}
