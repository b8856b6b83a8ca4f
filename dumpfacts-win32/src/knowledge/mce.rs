/*!
Machine check decoding.

Decodes `IA32_MCi_STATUS` values and the parameters of `WHEA_UNCORRECTABLE_ERROR` (0x124).
The compound MCA error code layouts are taken from the Intel SDM, volume 3, chapter 16.
*/

use std::fmt;

/// Bit positions of `IA32_MCi_STATUS`.
pub mod status_bits {
    pub const VAL: u32 = 63;
    pub const OVER: u32 = 62;
    pub const UC: u32 = 61;
    pub const EN: u32 = 60;
    pub const MISCV: u32 = 59;
    pub const ADDRV: u32 = 58;
    pub const PCC: u32 = 57;
    pub const S: u32 = 56;
    pub const AR: u32 = 55;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum McaSeverity {
    /// Processor context is corrupt.
    Fatal,
    /// Uncorrected error signaled through a machine check that software may recover from.
    Recoverable,
    /// Uncorrected error not signaled yet.
    Deferred,
    Corrected,
}

impl McaSeverity {
    pub fn remediation(self) -> &'static str {
        match self {
            McaSeverity::Fatal => {
                "the processor could not continue; check cooling, power delivery and remove any overclock"
            }
            McaSeverity::Recoverable => {
                "the error was contained; monitor for repeats and update the BIOS and chipset drivers"
            }
            McaSeverity::Deferred => "latent error; test memory and update the BIOS",
            McaSeverity::Corrected => "corrected by hardware; only a concern if it repeats frequently",
        }
    }
}

impl fmt::Display for McaSeverity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            McaSeverity::Fatal => "fatal",
            McaSeverity::Recoverable => "recoverable",
            McaSeverity::Deferred => "deferred",
            McaSeverity::Corrected => "corrected",
        })
    }
}

/// Hardware unit named by the MCA error code.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum McaComponent {
    Cache {
        level: &'static str,
        transaction: &'static str,
        request: &'static str,
    },
    Tlb {
        level: &'static str,
        transaction: &'static str,
    },
    Bus {
        level: &'static str,
        participation: &'static str,
        memory_or_io: &'static str,
        request: &'static str,
        timeout: bool,
    },
    MemoryController {
        transaction: &'static str,
        /// `None` if the channel is not specified.
        channel: Option<u8>,
    },
    Internal(&'static str),
    Other(u16),
}

impl McaComponent {
    /// Decodes the low 16 bits of `IA32_MCi_STATUS`.
    pub fn decode(error_code: u16) -> Self {
        // bit 12 only controls corrected error filtering
        let code = error_code & !0x1000;

        if code & 0xf800 == 0x0800 {
            McaComponent::Bus {
                level: level(code),
                participation: match (code >> 9) & 0x3 {
                    0 => "originated",
                    1 => "responded",
                    2 => "observed",
                    _ => "generic",
                },
                memory_or_io: match (code >> 2) & 0x3 {
                    0 => "memory",
                    2 => "i/o",
                    3 => "other",
                    _ => "reserved",
                },
                request: request(code),
                timeout: code & 0x0100 != 0,
            }
        } else if code & 0xff00 == 0x0100 {
            McaComponent::Cache {
                level: level(code),
                transaction: transaction(code),
                request: request(code),
            }
        } else if code & 0xff80 == 0x0080 {
            let channel = (code & 0xf) as u8;
            McaComponent::MemoryController {
                transaction: match (code >> 4) & 0x7 {
                    0 => "generic",
                    1 => "read",
                    2 => "write",
                    3 => "address/command",
                    4 => "scrubbing",
                    _ => "reserved",
                },
                channel: if channel == 0xf { None } else { Some(channel) },
            }
        } else if code & 0xfff0 == 0x0010 {
            McaComponent::Tlb {
                level: level(code),
                transaction: transaction(code),
            }
        } else {
            match code {
                0x0001 => McaComponent::Internal("unclassified"),
                0x0002 => McaComponent::Internal("microcode rom parity"),
                0x0003 => McaComponent::Internal("external error"),
                0x0004 => McaComponent::Internal("functional redundancy check"),
                0x0005 => McaComponent::Internal("internal parity"),
                0x0006 => McaComponent::Internal("smm handler code access violation"),
                0x0400 => McaComponent::Internal("internal timer"),
                c if c & 0xfc00 == 0x0400 => McaComponent::Internal("internal unclassified"),
                other => McaComponent::Other(other),
            }
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            McaComponent::Cache { .. } | McaComponent::Tlb { .. } => {
                "processor cache error; remove overclocking, check cooling and consider replacing the cpu"
            }
            McaComponent::Bus { .. } => {
                "interconnect error; reseat expansion cards, update the BIOS and check the power supply"
            }
            McaComponent::MemoryController { .. } => {
                "memory error; run a memory test, reseat modules and disable XMP/EXPO profiles"
            }
            McaComponent::Internal(_) => {
                "internal processor error; update the BIOS microcode and check cooling"
            }
            McaComponent::Other(_) => "update the BIOS and check hardware health",
        }
    }
}

impl fmt::Display for McaComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            McaComponent::Cache {
                level,
                transaction,
                request,
            } => write!(f, "{} cache ({} {})", level, transaction, request),
            McaComponent::Tlb { level, transaction } => {
                write!(f, "{} tlb ({})", level, transaction)
            }
            McaComponent::Bus {
                level,
                participation,
                memory_or_io,
                request,
                timeout,
            } => {
                write!(
                    f,
                    "{} bus/interconnect ({} {} {}",
                    level, participation, memory_or_io, request
                )?;
                if *timeout {
                    f.write_str(" timeout")?;
                }
                f.write_str(")")
            }
            McaComponent::MemoryController {
                transaction,
                channel,
            } => match channel {
                Some(channel) => write!(f, "memory controller ({} channel {})", transaction, channel),
                None => write!(f, "memory controller ({})", transaction),
            },
            McaComponent::Internal(what) => write!(f, "internal ({})", what),
            McaComponent::Other(code) => write!(f, "other ({:#06x})", code),
        }
    }
}

fn level(code: u16) -> &'static str {
    match code & 0x3 {
        0 => "L0",
        1 => "L1",
        2 => "L2",
        _ => "generic",
    }
}

fn transaction(code: u16) -> &'static str {
    match (code >> 2) & 0x3 {
        0 => "instruction",
        1 => "data",
        2 => "generic",
        _ => "reserved",
    }
}

fn request(code: u16) -> &'static str {
    match (code >> 4) & 0xf {
        0 => "generic",
        1 => "read",
        2 => "write",
        3 => "data read",
        4 => "data write",
        5 => "instruction fetch",
        6 => "prefetch",
        7 => "eviction",
        8 => "snoop",
        _ => "reserved",
    }
}

/// Decoded `IA32_MCi_STATUS`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct MachineCheckFacts {
    pub status: u64,
    pub valid: bool,
    pub overflow: bool,
    pub uncorrected: bool,
    pub enabled: bool,
    pub misc_valid: bool,
    pub address_valid: bool,
    pub context_corrupt: bool,
    pub signaled: bool,
    pub action_required: bool,
    pub error_code: u16,
    pub model_code: u16,
    pub severity: McaSeverity,
    pub component: McaComponent,
}

impl MachineCheckFacts {
    pub fn decode(status: u64) -> Self {
        let bit = |n: u32| status & (1u64 << n) != 0;

        let uncorrected = bit(status_bits::UC);
        let context_corrupt = bit(status_bits::PCC);
        let signaled = bit(status_bits::S);
        let severity = if uncorrected && context_corrupt {
            McaSeverity::Fatal
        } else if uncorrected && signaled {
            McaSeverity::Recoverable
        } else if uncorrected {
            McaSeverity::Deferred
        } else {
            McaSeverity::Corrected
        };

        let error_code = (status & 0xffff) as u16;
        Self {
            status,
            valid: bit(status_bits::VAL),
            overflow: bit(status_bits::OVER),
            uncorrected,
            enabled: bit(status_bits::EN),
            misc_valid: bit(status_bits::MISCV),
            address_valid: bit(status_bits::ADDRV),
            context_corrupt,
            signaled,
            action_required: bit(status_bits::AR),
            error_code,
            model_code: ((status >> 16) & 0xffff) as u16,
            severity,
            component: McaComponent::decode(error_code),
        }
    }

    /// Combines the remediation hints of severity and component.
    pub fn remediation(&self) -> Vec<&'static str> {
        vec![self.severity.remediation(), self.component.remediation()]
    }
}

impl fmt::Display for MachineCheckFacts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} error in {} (status {:#018x})",
            self.severity, self.component, self.status
        )?;
        if !self.valid {
            f.write_str(" [status not valid]")?;
        }
        if self.overflow {
            f.write_str(" [overflow]")?;
        }
        Ok(())
    }
}

/// `WHEA_ERROR_SOURCE_TYPE`, the first parameter of stop code 0x124.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum WheaErrorSource {
    MachineCheck,
    CorrectedMachineCheck,
    CorrectedPlatformError,
    Nmi,
    PciExpress,
    Generic,
    Init,
    BootErrorRecord,
    SciGeneric,
    Unknown(u64),
}

impl From<u64> for WheaErrorSource {
    fn from(value: u64) -> Self {
        match value {
            0 => WheaErrorSource::MachineCheck,
            1 => WheaErrorSource::CorrectedMachineCheck,
            2 => WheaErrorSource::CorrectedPlatformError,
            3 => WheaErrorSource::Nmi,
            4 => WheaErrorSource::PciExpress,
            5 => WheaErrorSource::Generic,
            6 => WheaErrorSource::Init,
            7 => WheaErrorSource::BootErrorRecord,
            8 => WheaErrorSource::SciGeneric,
            other => WheaErrorSource::Unknown(other),
        }
    }
}

impl WheaErrorSource {
    /// Returns true if parameters 3 and 4 carry `IA32_MCi_STATUS`.
    pub fn is_machine_check(self) -> bool {
        matches!(
            self,
            WheaErrorSource::MachineCheck | WheaErrorSource::CorrectedMachineCheck
        )
    }
}

impl fmt::Display for WheaErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WheaErrorSource::MachineCheck => f.write_str("machine check exception"),
            WheaErrorSource::CorrectedMachineCheck => f.write_str("corrected machine check"),
            WheaErrorSource::CorrectedPlatformError => f.write_str("corrected platform error"),
            WheaErrorSource::Nmi => f.write_str("non-maskable interrupt"),
            WheaErrorSource::PciExpress => f.write_str("pci express error"),
            WheaErrorSource::Generic => f.write_str("generic hardware error"),
            WheaErrorSource::Init => f.write_str("init error"),
            WheaErrorSource::BootErrorRecord => f.write_str("boot error record"),
            WheaErrorSource::SciGeneric => f.write_str("sci generic error"),
            WheaErrorSource::Unknown(v) => write!(f, "unknown source {:#x}", v),
        }
    }
}

/// Decoded parameters of `WHEA_UNCORRECTABLE_ERROR`.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct WheaFacts {
    pub source: WheaErrorSource,
    /// Address of the `WHEA_ERROR_RECORD` in kernel memory.
    pub error_record: u64,
    pub machine_check: Option<MachineCheckFacts>,
}

impl WheaFacts {
    /// Decodes the four parameters of stop code 0x124.
    pub fn decode(parameters: [u64; 4]) -> Self {
        let source = WheaErrorSource::from(parameters[0]);
        let machine_check = if source.is_machine_check() {
            let status = ((parameters[2] & 0xffff_ffff) << 32) | (parameters[3] & 0xffff_ffff);
            Some(MachineCheckFacts::decode(status))
        } else {
            None
        };
        Self {
            source,
            error_record: parameters[1],
            machine_check,
        }
    }
}
