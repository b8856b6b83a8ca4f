/*!
Decoding of architecture specific `CONTEXT` records.

A decoded [`RegisterState`] is an immutable snapshot. Derived values like the instruction pointer
are always read out of the tagged variant. [`RegisterState::anomalies`] reports suspicious states
without correcting them.
*/

pub mod x64;
pub mod x86;

pub use x64::{Amd64Registers, DebugRegisters, CONTEXT_AMD64_SIZE};
pub use x86::{X86Registers, CONTEXT_X86_SIZE};

use std::fmt;

use crate::error::{Error, Result};
use crate::reader::BinaryReader;
use crate::types::Architecture;

bitflags! {
    /// Bits of the processor status word.
    pub struct EFlags: u32 {
        const CARRY = 0x0001;
        const PARITY = 0x0004;
        const ADJUST = 0x0010;
        const ZERO = 0x0040;
        const SIGN = 0x0080;
        const TRAP = 0x0100;
        const INTERRUPT = 0x0200;
        const DIRECTION = 0x0400;
        const OVERFLOW = 0x0800;
    }
}

impl EFlags {
    /// Short names of all set flags, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        let table = [
            (EFlags::CARRY, "CF"),
            (EFlags::PARITY, "PF"),
            (EFlags::ADJUST, "AF"),
            (EFlags::ZERO, "ZF"),
            (EFlags::SIGN, "SF"),
            (EFlags::TRAP, "TF"),
            (EFlags::INTERRUPT, "IF"),
            (EFlags::DIRECTION, "DF"),
            (EFlags::OVERFLOW, "OF"),
        ];
        table
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Segments {
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub fs: u16,
    pub gs: u16,
    pub ss: u16,
}

impl Segments {
    /// Requested privilege level of the code segment selector.
    pub fn cpl(&self) -> u8 {
        (self.cs & 0x3) as u8
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum RegisterState {
    Amd64(Amd64Registers),
    X86(X86Registers),
}

impl RegisterState {
    /// Decodes a `CONTEXT` record for `arch` at `offset`.
    pub fn decode(reader: &BinaryReader, offset: u64, arch: Architecture) -> Result<Self> {
        match arch {
            Architecture::Amd64 => Amd64Registers::decode(reader, offset).map(RegisterState::Amd64),
            Architecture::X86 => X86Registers::decode(reader, offset).map(RegisterState::X86),
            _ => Err(Error::InvalidArchitecture),
        }
    }

    /// Expected size of the `CONTEXT` record for `arch`.
    pub fn context_size(arch: Architecture) -> Option<u64> {
        match arch {
            Architecture::Amd64 => Some(CONTEXT_AMD64_SIZE),
            Architecture::X86 => Some(CONTEXT_X86_SIZE),
            _ => None,
        }
    }

    pub fn architecture(&self) -> Architecture {
        match self {
            RegisterState::Amd64(_) => Architecture::Amd64,
            RegisterState::X86(_) => Architecture::X86,
        }
    }

    pub fn instruction_pointer(&self) -> u64 {
        match self {
            RegisterState::Amd64(r) => r.rip,
            RegisterState::X86(r) => u64::from(r.eip),
        }
    }

    pub fn stack_pointer(&self) -> u64 {
        match self {
            RegisterState::Amd64(r) => r.rsp,
            RegisterState::X86(r) => u64::from(r.esp),
        }
    }

    pub fn frame_pointer(&self) -> u64 {
        match self {
            RegisterState::Amd64(r) => r.rbp,
            RegisterState::X86(r) => u64::from(r.ebp),
        }
    }

    pub fn eflags(&self) -> EFlags {
        let raw = match self {
            RegisterState::Amd64(r) => r.eflags,
            RegisterState::X86(r) => r.eflags,
        };
        EFlags::from_bits_truncate(raw)
    }

    pub fn segments(&self) -> Segments {
        match self {
            RegisterState::Amd64(r) => r.segments,
            RegisterState::X86(r) => r.segments,
        }
    }

    /// Required stack pointer alignment at an arbitrary instruction boundary.
    fn stack_alignment(&self) -> u64 {
        match self {
            RegisterState::Amd64(_) => 16,
            RegisterState::X86(_) => 4,
        }
    }

    /// Reports suspicious register values.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = vec![];
        let ip = self.instruction_pointer();
        let sp = self.stack_pointer();

        if ip == 0 {
            anomalies.push(Anomaly::NullInstructionPointer);
        }

        if sp == 0 {
            anomalies.push(Anomaly::NullStackPointer);
        } else if sp % self.stack_alignment() != 0 {
            anomalies.push(Anomaly::MisalignedStackPointer {
                sp,
                alignment: self.stack_alignment(),
            });
        }

        if let RegisterState::Amd64(_) = self {
            if !is_canonical(ip) {
                anomalies.push(Anomaly::NonCanonicalInstructionPointer(ip));
            }
        }

        let segments = self.segments();
        if segments.cs != 0 && ip != 0 {
            if let Some(kernel_start) = self.architecture().kernel_space_start() {
                let kernel_ip = ip >= kernel_start;
                let kernel_mode = segments.cpl() == 0;
                if kernel_ip != kernel_mode {
                    anomalies.push(Anomaly::PrivilegeMismatch {
                        cs: segments.cs,
                        ip,
                    });
                }
            }
        }

        if self.eflags().contains(EFlags::TRAP) {
            anomalies.push(Anomaly::SingleStep);
        }

        anomalies
    }
}

/// True if bits 48..64 of `addr` are a sign extension of bit 47.
pub fn is_canonical(addr: u64) -> bool {
    let upper = addr >> 47;
    upper == 0 || upper == 0x1ffff
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum Anomaly {
    NullInstructionPointer,
    NullStackPointer,
    MisalignedStackPointer { sp: u64, alignment: u64 },
    /// The code segment privilege level does not match the address range of the
    /// instruction pointer.
    PrivilegeMismatch { cs: u16, ip: u64 },
    NonCanonicalInstructionPointer(u64),
    /// The trap flag is set.
    SingleStep,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Anomaly::NullInstructionPointer => f.write_str("instruction pointer is null"),
            Anomaly::NullStackPointer => f.write_str("stack pointer is null"),
            Anomaly::MisalignedStackPointer { sp, alignment } => write!(
                f,
                "stack pointer {:#x} is not {}-byte aligned",
                sp, alignment
            ),
            Anomaly::PrivilegeMismatch { cs, ip } => write!(
                f,
                "code segment {:#x} (ring {}) does not match instruction pointer {:#x}",
                cs,
                cs & 0x3,
                ip
            ),
            Anomaly::NonCanonicalInstructionPointer(ip) => {
                write!(f, "instruction pointer {:#x} is not canonical", ip)
            }
            Anomaly::SingleStep => f.write_str("trap flag set (single-step)"),
        }
    }
}
