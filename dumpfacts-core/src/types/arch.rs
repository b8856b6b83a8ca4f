use std::fmt;

/// `IMAGE_FILE_MACHINE_*` values found in kernel dump headers.
pub mod machine {
    pub const I386: u32 = 0x014c;
    pub const AMD64: u32 = 0x8664;
    pub const ARM64: u32 = 0xaa64;
}

/// `PROCESSOR_ARCHITECTURE_*` values found in the minidump system info stream.
pub mod processor {
    pub const INTEL: u16 = 0;
    pub const ARM: u16 = 5;
    pub const IA64: u16 = 6;
    pub const AMD64: u16 = 9;
    pub const ARM64: u16 = 12;
}

/// `CONTEXT_*` architecture bits stored in the `ContextFlags` member.
pub mod context_flags {
    pub const I386: u32 = 0x0001_0000;
    pub const AMD64: u32 = 0x0010_0000;
    pub const ARM64: u32 = 0x0040_0000;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum Architecture {
    Amd64,
    X86,
    Arm64,
    Arm,
    Unknown(u32),
}

impl Architecture {
    pub fn from_machine_type(machine: u32) -> Self {
        match machine {
            machine::AMD64 => Architecture::Amd64,
            machine::I386 => Architecture::X86,
            machine::ARM64 => Architecture::Arm64,
            other => Architecture::Unknown(other),
        }
    }

    pub fn from_processor_architecture(arch: u16) -> Self {
        match arch {
            processor::AMD64 => Architecture::Amd64,
            processor::INTEL => Architecture::X86,
            processor::ARM64 => Architecture::Arm64,
            processor::ARM => Architecture::Arm,
            other => Architecture::Unknown(u32::from(other)),
        }
    }

    /// Guesses the architecture from the `ContextFlags` of a raw CONTEXT record.
    ///
    /// `flags_x86` is the dword at offset 0 (x86 layout), `flags_amd64` the dword at
    /// offset 0x30 (amd64 layout).
    pub fn from_context_flags(flags_x86: u32, flags_amd64: u32) -> Option<Self> {
        if flags_amd64 & context_flags::AMD64 != 0 && flags_amd64 & 0xff00_0000 == 0 {
            Some(Architecture::Amd64)
        } else if flags_x86 & context_flags::I386 != 0 && flags_x86 & 0xff00_0000 == 0 {
            Some(Architecture::X86)
        } else {
            None
        }
    }

    /// Pointer width in bytes.
    pub fn pointer_width(self) -> Option<u64> {
        match self {
            Architecture::Amd64 | Architecture::Arm64 => Some(8),
            Architecture::X86 | Architecture::Arm => Some(4),
            Architecture::Unknown(_) => None,
        }
    }

    /// First address of the kernel half of the address space.
    pub fn kernel_space_start(self) -> Option<u64> {
        match self {
            Architecture::Amd64 | Architecture::Arm64 => Some(0xffff_8000_0000_0000),
            Architecture::X86 | Architecture::Arm => Some(0x8000_0000),
            Architecture::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Architecture::Amd64 => f.write_str("x64"),
            Architecture::X86 => f.write_str("x86"),
            Architecture::Arm64 => f.write_str("arm64"),
            Architecture::Arm => f.write_str("arm"),
            Architecture::Unknown(v) => write!(f, "unknown({:#x})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_values() {
        assert_eq!(
            Architecture::from_machine_type(0x8664),
            Architecture::Amd64
        );
        assert_eq!(Architecture::from_machine_type(0x14c), Architecture::X86);
        assert_eq!(
            Architecture::from_processor_architecture(9),
            Architecture::Amd64
        );
        assert_eq!(
            Architecture::from_processor_architecture(0),
            Architecture::X86
        );
        assert_eq!(
            Architecture::from_processor_architecture(0x1234),
            Architecture::Unknown(0x1234)
        );
    }

    #[test]
    fn from_context_flags() {
        assert_eq!(
            Architecture::from_context_flags(0, 0x0010_001f),
            Some(Architecture::Amd64)
        );
        assert_eq!(
            Architecture::from_context_flags(0x0001_0007, 0),
            Some(Architecture::X86)
        );
        assert_eq!(Architecture::from_context_flags(0, 0), None);
        assert_eq!(
            Architecture::from_context_flags(0xffff_ffff, 0xffff_ffff),
            None
        );
    }
}
