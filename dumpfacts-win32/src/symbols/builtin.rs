/*!
Small built-in symbol tables for well-known kernel entry points.

The offsets are taken from a windows 10 x64 kernel and only serve as a coarse fallback when no
rich table could be loaded. Offsets between two entries resolve to the lower one with its
residual. Past the last entry of a table only `MAX_BUILTIN_RESIDUAL` bytes are attributed to it.
*/

use once_cell::sync::Lazy;

use super::table::SymbolTable;

pub const MAX_BUILTIN_RESIDUAL: u64 = 0x1000;

#[rustfmt::skip]
const NT_SYMBOLS: &[(u64, &str)] = &[
    (0x0003_3a10, "ExAllocatePoolWithTag"),
    (0x0003_4b60, "ExFreePoolWithTag"),
    (0x0008_2c20, "KeWaitForSingleObject"),
    (0x000a_2e30, "IofCallDriver"),
    (0x000a_4f50, "IofCompleteRequest"),
    (0x0012_14b0, "ObfDereferenceObject"),
    (0x0013_1f20, "KeSetEvent"),
    (0x0016_2a40, "KeAcquireSpinLockRaiseToDpc"),
    (0x0016_2b80, "KeReleaseSpinLock"),
    (0x001f_6a50, "KiExecuteAllDpcs"),
    (0x001f_8c90, "KiRetireDpcList"),
    (0x0020_1820, "KiIdleLoop"),
    (0x0040_3c40, "KeBugCheckEx"),
    (0x0040_8e00, "KiPageFault"),
    (0x0040_a1c0, "KiGeneralProtectionFault"),
    (0x0040_b500, "KiDoubleFaultAbort"),
    (0x0040_d240, "KiSystemServiceHandler"),
    (0x0041_2a80, "KiBugCheckDispatch"),
    (0x0041_3b00, "KiSystemCall64"),
    (0x0041_3f85, "KiSystemServiceCopyEnd"),
    (0x0048_7c30, "KiDispatchException"),
    (0x0052_1e10, "PspSystemThreadStartup"),
];

#[rustfmt::skip]
const HAL_SYMBOLS: &[(u64, &str)] = &[
    (0x0000_2010, "HalRequestSoftwareInterrupt"),
    (0x0000_7a30, "HalpTimerClockInterrupt"),
    (0x0001_4c00, "HalProcessorIdle"),
    (0x0003_1d50, "HalpMcaExceptionHandler"),
    (0x0003_8e20, "HalBugCheckSystem"),
];

static NT_TABLE: Lazy<SymbolTable> = Lazy::new(|| NT_SYMBOLS.iter().copied().collect());
static HAL_TABLE: Lazy<SymbolTable> = Lazy::new(|| HAL_SYMBOLS.iter().copied().collect());

/// Returns the built-in table for a module, matched by lowercase file stem.
pub fn table_for(module: &str) -> Option<&'static SymbolTable> {
    let lower = module.to_lowercase();
    let stem = lower.split('.').next().unwrap_or(&lower);
    match stem {
        "nt" | "ntoskrnl" | "ntkrnlmp" | "ntkrnlpa" | "ntkrpamp" => Some(&*NT_TABLE),
        "hal" => Some(&*HAL_TABLE),
        _ => None,
    }
}

/// Looks up `offset` in the built-in table of `module`.
pub fn lookup(module: &str, offset: u64) -> Option<(&'static str, u64)> {
    let table = table_for(module)?;
    let (name, residual) = table.nearest(offset, None)?;
    match table.last_rva() {
        Some(last) if offset > last && residual > MAX_BUILTIN_RESIDUAL => None,
        _ => Some((name, residual)),
    }
}
