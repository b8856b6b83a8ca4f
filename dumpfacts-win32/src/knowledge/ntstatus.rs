/*!
NTSTATUS and exception code names.
*/

use std::fmt;

/// Severity encoded in the top two bits of an NTSTATUS value.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum Severity {
    Success,
    Informational,
    Warning,
    Error,
}

impl Severity {
    pub fn from_status(code: u32) -> Self {
        match code >> 30 {
            0 => Severity::Success,
            1 => Severity::Informational,
            2 => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Severity::Success => "success",
            Severity::Informational => "informational",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct NtStatusEntry {
    pub code: u32,
    pub name: &'static str,
    pub causes: &'static [&'static str],
    pub remediation: &'static str,
}

impl NtStatusEntry {
    pub fn severity(&self) -> Severity {
        Severity::from_status(self.code)
    }
}

const MEMORY_CAUSES: &[&str] = &[
    "driver or application dereferenced an invalid pointer",
    "use after free or buffer overrun",
    "faulty RAM",
];
const MEMORY_REMEDIATION: &str =
    "update or remove the module owning the faulting address, then test memory with a RAM diagnostic";

const STACK_CAUSES: &[&str] = &["unbounded recursion", "very large stack allocations"];
const STACK_REMEDIATION: &str = "update the faulting application or driver";

const CODE_CAUSES: &[&str] = &[
    "corrupted executable image",
    "execution of data due to memory corruption",
];
const CODE_REMEDIATION: &str = "reinstall the affected software and check the disk for errors";

const IO_CAUSES: &[&str] = &[
    "failing disk or storage controller",
    "loose cables",
    "paging file on a faulty volume",
];
const IO_REMEDIATION: &str = "check SMART data, run chkdsk and reseat storage cables";

const ARITH_CAUSES: &[&str] = &["division by zero or arithmetic overflow in code"];
const ARITH_REMEDIATION: &str = "update the faulting application or driver";

const SECURITY_CAUSES: &[&str] = &[
    "stack buffer overrun detected by /GS",
    "corrupted list entry detected by a fast-fail check",
];
const SECURITY_REMEDIATION: &str =
    "update the faulting module, check for malware if the module is unexpected";

const NO_CAUSES: &[&str] = &[];
const NO_REMEDIATION: &str = "";

#[rustfmt::skip]
static NTSTATUS: &[NtStatusEntry] = &[
    NtStatusEntry { code: 0x0000_0000, name: "STATUS_SUCCESS", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0x0000_0102, name: "STATUS_TIMEOUT", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0x0000_0103, name: "STATUS_PENDING", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0x4000_0015, name: "STATUS_FATAL_APP_EXIT", causes: &["application called abort()"], remediation: "update the application" },
    NtStatusEntry { code: 0x4000_001E, name: "STATUS_WX86_BREAKPOINT", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0x8000_0001, name: "STATUS_GUARD_PAGE_VIOLATION", causes: MEMORY_CAUSES, remediation: MEMORY_REMEDIATION },
    NtStatusEntry { code: 0x8000_0002, name: "STATUS_DATATYPE_MISALIGNMENT", causes: &["unaligned access on a strict alignment path"], remediation: "update the faulting module" },
    NtStatusEntry { code: 0x8000_0003, name: "STATUS_BREAKPOINT", causes: &["hard coded breakpoint hit without a debugger", "assertion in a debug build"], remediation: "update the faulting module or install a release build" },
    NtStatusEntry { code: 0x8000_0004, name: "STATUS_SINGLE_STEP", causes: &["trap flag left set", "debugger or anti-cheat interference"], remediation: "remove debugging or tampering tools" },
    NtStatusEntry { code: 0x8000_0005, name: "STATUS_BUFFER_OVERFLOW", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0x8000_0026, name: "STATUS_LONGJUMP", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0x8000_0029, name: "STATUS_UNWIND_CONSOLIDATE", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC000_0001, name: "STATUS_UNSUCCESSFUL", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC000_0005, name: "STATUS_ACCESS_VIOLATION", causes: MEMORY_CAUSES, remediation: MEMORY_REMEDIATION },
    NtStatusEntry { code: 0xC000_0006, name: "STATUS_IN_PAGE_ERROR", causes: IO_CAUSES, remediation: IO_REMEDIATION },
    NtStatusEntry { code: 0xC000_0008, name: "STATUS_INVALID_HANDLE", causes: &["handle used after close", "handle table corruption"], remediation: "update the faulting module" },
    NtStatusEntry { code: 0xC000_000D, name: "STATUS_INVALID_PARAMETER", causes: &["invalid argument passed to a system service", "CRT invalid parameter handler"], remediation: "update the faulting application" },
    NtStatusEntry { code: 0xC000_0017, name: "STATUS_NO_MEMORY", causes: &["address space or commit exhaustion", "memory leak"], remediation: "close other applications, increase the paging file" },
    NtStatusEntry { code: 0xC000_001D, name: "STATUS_ILLEGAL_INSTRUCTION", causes: CODE_CAUSES, remediation: CODE_REMEDIATION },
    NtStatusEntry { code: 0xC000_0022, name: "STATUS_ACCESS_DENIED", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC000_0025, name: "STATUS_NONCONTINUABLE_EXCEPTION", causes: &["continuation attempted after a fatal exception"], remediation: "update the faulting application" },
    NtStatusEntry { code: 0xC000_0026, name: "STATUS_INVALID_DISPOSITION", causes: &["exception handler returned an invalid value", "corrupted exception registration"], remediation: "update the faulting application" },
    NtStatusEntry { code: 0xC000_0034, name: "STATUS_OBJECT_NAME_NOT_FOUND", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC000_008C, name: "STATUS_ARRAY_BOUNDS_EXCEEDED", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_008D, name: "STATUS_FLOAT_DENORMAL_OPERAND", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_008E, name: "STATUS_FLOAT_DIVIDE_BY_ZERO", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_008F, name: "STATUS_FLOAT_INEXACT_RESULT", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0090, name: "STATUS_FLOAT_INVALID_OPERATION", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0091, name: "STATUS_FLOAT_OVERFLOW", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0092, name: "STATUS_FLOAT_STACK_CHECK", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0093, name: "STATUS_FLOAT_UNDERFLOW", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0094, name: "STATUS_INTEGER_DIVIDE_BY_ZERO", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0095, name: "STATUS_INTEGER_OVERFLOW", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_0096, name: "STATUS_PRIVILEGED_INSTRUCTION", causes: CODE_CAUSES, remediation: CODE_REMEDIATION },
    NtStatusEntry { code: 0xC000_009A, name: "STATUS_INSUFFICIENT_RESOURCES", causes: &["pool exhaustion", "handle or resource leak"], remediation: "look for a leaking driver with poolmon" },
    NtStatusEntry { code: 0xC000_009C, name: "STATUS_DEVICE_DATA_ERROR", causes: IO_CAUSES, remediation: IO_REMEDIATION },
    NtStatusEntry { code: 0xC000_009D, name: "STATUS_DEVICE_NOT_CONNECTED", causes: IO_CAUSES, remediation: IO_REMEDIATION },
    NtStatusEntry { code: 0xC000_00FD, name: "STATUS_STACK_OVERFLOW", causes: STACK_CAUSES, remediation: STACK_REMEDIATION },
    NtStatusEntry { code: 0xC000_0135, name: "STATUS_DLL_NOT_FOUND", causes: &["missing runtime or dependency"], remediation: "reinstall the application and its runtimes" },
    NtStatusEntry { code: 0xC000_0139, name: "STATUS_ENTRYPOINT_NOT_FOUND", causes: &["mismatched dll version"], remediation: "reinstall the application and its runtimes" },
    NtStatusEntry { code: 0xC000_0142, name: "STATUS_DLL_INIT_FAILED", causes: &["dll initialization routine failed", "desktop heap exhaustion"], remediation: "reinstall the application" },
    NtStatusEntry { code: 0xC000_0185, name: "STATUS_IO_DEVICE_ERROR", causes: IO_CAUSES, remediation: IO_REMEDIATION },
    NtStatusEntry { code: 0xC000_0194, name: "STATUS_POSSIBLE_DEADLOCK", causes: &["critical section wait timed out"], remediation: "update the faulting application" },
    NtStatusEntry { code: 0xC000_01E0, name: "STATUS_CRASH_DUMP", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC000_020E, name: "STATUS_TOO_MANY_SECRETS", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC000_021A, name: "STATUS_SYSTEM_PROCESS_TERMINATED", causes: &["csrss or winlogon terminated"], remediation: "run sfc /scannow and check for recently installed system software" },
    NtStatusEntry { code: 0xC000_0221, name: "STATUS_IMAGE_CHECKSUM_MISMATCH", causes: &["corrupted system file", "failing disk"], remediation: "run sfc /scannow and check the disk" },
    NtStatusEntry { code: 0xC000_026E, name: "STATUS_VOLUME_DISMOUNTED", causes: IO_CAUSES, remediation: IO_REMEDIATION },
    NtStatusEntry { code: 0xC000_02B4, name: "STATUS_FLOAT_MULTIPLE_FAULTS", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_02B5, name: "STATUS_FLOAT_MULTIPLE_TRAPS", causes: ARITH_CAUSES, remediation: ARITH_REMEDIATION },
    NtStatusEntry { code: 0xC000_02C5, name: "STATUS_DATATYPE_MISALIGNMENT_ERROR", causes: &["unaligned access on a strict alignment path"], remediation: "update the faulting module" },
    NtStatusEntry { code: 0xC000_0374, name: "STATUS_HEAP_CORRUPTION", causes: &["double free", "heap buffer overrun"], remediation: "update the faulting application, enable page heap to find the writer" },
    NtStatusEntry { code: 0xC000_0409, name: "STATUS_STACK_BUFFER_OVERRUN", causes: SECURITY_CAUSES, remediation: SECURITY_REMEDIATION },
    NtStatusEntry { code: 0xC000_0417, name: "STATUS_INVALID_CRUNTIME_PARAMETER", causes: &["invalid argument passed to a C runtime function"], remediation: "update the faulting application" },
    NtStatusEntry { code: 0xC000_0420, name: "STATUS_ASSERTION_FAILURE", causes: &["assertion failed"], remediation: "update the faulting module" },
    NtStatusEntry { code: 0xC000_0602, name: "STATUS_FAIL_FAST_EXCEPTION", causes: SECURITY_CAUSES, remediation: SECURITY_REMEDIATION },
    NtStatusEntry { code: 0xC000_070A, name: "STATUS_THREADPOOL_HANDLE_EXCEPTION", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC015_000F, name: "STATUS_SXS_EARLY_DEACTIVATION", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xC015_0010, name: "STATUS_SXS_INVALID_DEACTIVATION", causes: NO_CAUSES, remediation: NO_REMEDIATION },
    NtStatusEntry { code: 0xE06D_7363, name: "CPP_EH_EXCEPTION", causes: &["unhandled C++ exception"], remediation: "update the faulting application" },
];

/// Looks up a status code.
pub fn lookup(code: u32) -> Option<&'static NtStatusEntry> {
    NTSTATUS
        .binary_search_by_key(&code, |entry| entry.code)
        .ok()
        .map(|idx| &NTSTATUS[idx])
}

/// Name of a status code, `UNKNOWN_0x<HEX>` for codes missing from the table.
pub fn name_or_unknown(code: u32) -> String {
    lookup(code)
        .map(|entry| entry.name.to_string())
        .unwrap_or_else(|| format!("UNKNOWN_0x{:X}", code))
}

/// Interpretation of an exception or status code for reporting.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct StatusFacts {
    pub code: u32,
    pub name: String,
    pub severity: Severity,
    pub causes: Vec<&'static str>,
    pub remediation: Option<&'static str>,
}

impl StatusFacts {
    pub fn new(code: u32) -> Self {
        let entry = lookup(code);
        Self {
            code,
            name: name_or_unknown(code),
            severity: Severity::from_status(code),
            causes: entry.map(|e| e.causes.to_vec()).unwrap_or_default(),
            remediation: entry.map(|e| e.remediation).filter(|r| !r.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        assert!(NTSTATUS.windows(2).all(|w| w[0].code < w[1].code));
    }

    #[test]
    fn severity_bits() {
        assert_eq!(Severity::from_status(0), Severity::Success);
        assert_eq!(Severity::from_status(0x4000_0015), Severity::Informational);
        assert_eq!(Severity::from_status(0x8000_0003), Severity::Warning);
        assert_eq!(Severity::from_status(0xC000_0005), Severity::Error);
    }

    #[test]
    fn access_violation() {
        let facts = StatusFacts::new(0xC000_0005);
        assert_eq!(facts.name, "STATUS_ACCESS_VIOLATION");
        assert_eq!(facts.severity, Severity::Error);
        assert!(!facts.causes.is_empty());
        assert!(facts.remediation.is_some());
    }

    #[test]
    fn unknown_status() {
        let facts = StatusFacts::new(0xC0DE_0001);
        assert_eq!(facts.name, "UNKNOWN_0xC0DE0001");
        assert!(facts.causes.is_empty());
        assert_eq!(facts.remediation, None);
        assert_eq!(StatusFacts::new(0x0000_0102).remediation, None);
    }
}
