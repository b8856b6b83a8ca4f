/*!
# dumpfacts-core

Decoders for Microsoft Windows crash dumps.

This crate turns an in-memory dump buffer into plain fact types. Two containers are supported:

- 64-bit kernel dumps (`PAGEDU64`) as written by the kernel on a bugcheck, including the triage
  driver table of small memory dumps and the physical memory layout of full and bitmap dumps.
- User-mode minidumps (`MDMP`) including system information, modules, threads, memory ranges
  and the exception stream.

All decoders are bounds checked and never read past the end of the buffer. Malformed input is
reported through [`Error`](crate::error::Error), truncated structures can be distinguished with
[`Error::is_truncation`](crate::error::Error::is_truncation).

```
use dumpfacts_core::{Format, RawDump};

let dump = RawDump::new(b"MDMP\x93\xa7\0\0".to_vec());
assert_eq!(dump.format(), Format::Minidump);
```

Interpretation of the decoded facts (stop code names, culprit ranking, symbolization) lives in
the `dumpfacts-win32` crate.
*/

#[macro_use]
extern crate bitflags;

pub mod error;
#[doc(hidden)]
pub use error::{Error, Result};

pub mod reader;
#[doc(hidden)]
pub use reader::BinaryReader;

pub mod types;
#[doc(hidden)]
pub use types::{
    AccessKind, Architecture, CodeViewInfo, ExceptionFacts, Module, ModuleOrigin, OsVersion,
};

pub mod context;
#[doc(hidden)]
pub use context::{Anomaly, EFlags, RegisterState};

pub mod kernel;
#[doc(hidden)]
pub use kernel::{DumpType, KernelDump, KernelHeader};

pub mod minidump;
#[doc(hidden)]
pub use minidump::Minidump;

pub mod format;
#[doc(hidden)]
pub use format::{Format, ParsedDump, RawDump};

#[cfg(any(test, feature = "dummy_dump"))]
pub mod dummy;

#[cfg(test)]
mod tests {
    use super::dummy::{DumpMutator, KernelDumpBuilder, MinidumpBuilder};
    use super::*;
    use crate::context::{Amd64Registers, Segments};

    fn sample_kernel_dump() -> Vec<u8> {
        let regs = Amd64Registers {
            rip: 0xfffff801_1000_1234,
            rsp: 0xffff_d000_0000_1000,
            segments: Segments {
                cs: 0x10,
                ss: 0x18,
                ..Default::default()
            },
            eflags: 0x246,
            ..Default::default()
        };
        KernelDumpBuilder::new()
            .bug_check(0xd1, [0x10, 2, 0, 0xfffff801_1000_1234])
            .context(regs)
            .exception(0xc000_0005, 0xfffff801_1000_1234, &[0, 0x10])
            .driver("\\SystemRoot\\system32\\ntoskrnl.exe", 0xfffff801_0000_0000, 0x100_0000)
            .driver("\\SystemRoot\\System32\\drivers\\bad.sys", 0xfffff801_1000_0000, 0x8000)
            .build()
    }

    fn sample_minidump() -> Vec<u8> {
        MinidumpBuilder::new()
            .module("C:\\app\\app.exe", 0x7ff6_0000_0000, 0x2_0000)
            .module_with_pdb(
                "C:\\Windows\\System32\\ntdll.dll",
                0x7ff8_0000_0000,
                0x1f_0000,
                "ntdll.pdb",
            )
            .thread(1, 0x1000, vec![0x41; 0x100], None)
            .exception(1, 0xc000_0005, 0x7ff6_0000_1000, &[1, 0])
            .memory(0x5000, vec![1, 2, 3, 4])
            .build()
    }

    fn exercise(bytes: &[u8]) {
        let dump = RawDump::new(bytes.to_vec());
        let parsed = match dump.parse() {
            Ok(parsed) => parsed,
            Err(_) => return,
        };
        match parsed {
            ParsedDump::Kernel(kernel) => {
                let _ = kernel.exception();
                let _ = kernel.context().map(|ctx| ctx.anomalies());
                let _ = kernel.modules();
                let _ = kernel.string_pool();
                let _ = kernel.memory_map();
            }
            ParsedDump::Minidump(mini) => {
                let _ = mini.system_info();
                let _ = mini.modules();
                let _ = mini.unloaded_modules();
                let _ = mini.threads();
                let _ = mini.misc_info();
                let _ = mini.memory();
                let _ = mini.exception_context().map(|ctx| ctx.anomalies());
                if let Ok(ctx) = mini.exception_context() {
                    let _ = mini.stack_window(ctx.stack_pointer());
                }
            }
        }
    }

    #[test]
    fn truncated_dumps_never_panic() {
        let mut mutator = DumpMutator::with_seed(0x1234);
        for sample in &[sample_kernel_dump(), sample_minidump()] {
            for _ in 0..200 {
                exercise(&mutator.truncate(sample));
            }
        }
    }

    #[test]
    fn corrupted_dumps_never_panic() {
        let mut mutator = DumpMutator::with_seed(0xdead);
        for sample in &[sample_kernel_dump(), sample_minidump()] {
            for _ in 0..200 {
                exercise(&mutator.corrupt(sample, 16));
            }
        }
    }

    #[test]
    fn every_prefix_of_a_minidump() {
        let sample = sample_minidump();
        for len in 0..sample.len() {
            exercise(&sample[..len]);
        }
    }

    #[test]
    fn parsing_is_deterministic() {
        let bytes = sample_kernel_dump();
        let first = RawDump::new(bytes.clone());
        let second = RawDump::new(bytes);
        match (first.parse().unwrap(), second.parse().unwrap()) {
            (ParsedDump::Kernel(a), ParsedDump::Kernel(b)) => {
                assert_eq!(a.header(), b.header());
                assert_eq!(a.modules().unwrap(), b.modules().unwrap());
                assert_eq!(a.exception().unwrap(), b.exception().unwrap());
            }
            _ => panic!("expected kernel dumps"),
        }
    }

    #[test]
    fn kernel_dump_facts() {
        let dump = RawDump::new(sample_kernel_dump());
        let kernel = match dump.parse().unwrap() {
            ParsedDump::Kernel(kernel) => kernel,
            _ => panic!("expected a kernel dump"),
        };
        assert_eq!(kernel.dump_type(), DumpType::Triage);
        assert_eq!(kernel.bug_check_parameters()[3], 0xfffff801_1000_1234);

        let modules = kernel.modules().unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[1].name, "bad.sys");
        assert!(modules[1].contains(0xfffff801_1000_1234));

        let ctx = kernel.context().unwrap();
        assert_eq!(ctx.instruction_pointer(), 0xfffff801_1000_1234);
        assert_eq!(ctx.architecture(), Architecture::Amd64);

        let exception = kernel.exception().unwrap().unwrap();
        assert_eq!(
            exception.access_violation(),
            Some((AccessKind::Read, 0x10))
        );
    }
}
