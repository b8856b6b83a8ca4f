use std::sync::Once;

use dumpfacts_core::context::Amd64Registers;
use dumpfacts_core::dummy::{DumpMutator, KernelDumpBuilder, MinidumpBuilder};
use dumpfacts_core::{Format, ModuleOrigin, RegisterState};
use dumpfacts_win32::culprit::validator;
use dumpfacts_win32::prelude::v1::*;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

static LOGGER: Once = Once::new();

fn init() {
    LOGGER.call_once(|| {
        let _ = simple_logger::init_with_level(log::Level::Debug);
    });
}

fn amd64(rip: u64, rsp: u64) -> Amd64Registers {
    Amd64Registers {
        rip,
        rsp,
        ..Amd64Registers::default()
    }
}

fn two_module_minidump() -> Vec<u8> {
    MinidumpBuilder::new()
        .module("a.sys", 0x1000, 0x2000)
        .module("b.sys", 0x4000, 0x1000)
        .exception(1, 0xc000_0005, 0x1500, &[0, 0x10])
        .exception_context(RegisterState::Amd64(amd64(0x1500, 0x8000)))
        .build()
}

#[test]
fn irql_bug_check() {
    init();
    let bytes = KernelDumpBuilder::new()
        .bug_check(0xa, [0x10, 2, 0, 0xfffff801_1234_5678])
        .build();
    let result = analyze(bytes).unwrap();

    let bug_check = result.bug_check.unwrap();
    assert_eq!(bug_check.code, 0xa);
    assert_eq!(bug_check.name, "IRQL_NOT_LESS_OR_EQUAL");
    assert_eq!(bug_check.parameters, [0x10, 2, 0, 0xfffff801_1234_5678]);
    assert_eq!(result.format, Format::Kernel64);
}

#[test]
fn unknown_bug_check() {
    init();
    let bytes = KernelDumpBuilder::new().bug_check(0x65f4, [0; 4]).build();
    let result = analyze(bytes).unwrap();
    assert_eq!(result.bug_check.unwrap().name, "UNKNOWN_0x65F4");
}

#[test]
fn exception_module_ranks_first() {
    init();
    let result = analyze(two_module_minidump()).unwrap();

    let culprit = result.culprit().unwrap();
    assert_eq!(culprit.module, "a.sys");
    assert_eq!(culprit.confidence, Confidence::High);
    assert!(culprit.reasons.contains(&Reason::ExceptionAddress(0x1500)));
    // the instruction pointer matches the exception address and is not counted twice
    assert!(!culprit
        .reasons
        .iter()
        .any(|r| matches!(r, Reason::InstructionPointer(_))));

    let status = result.exception_status.as_ref().unwrap();
    assert_eq!(status.name, "STATUS_ACCESS_VIOLATION");
    assert_eq!(result.fault_address(), Some(0x1500));

    assert_eq!(result.symbols.len(), 1);
    assert_eq!(result.symbols[0].formatted, "a.sys+0x500");
}

#[test]
fn stack_references_count() {
    init();
    let mut stack = vec![];
    for value in &[0x4010u64, 0x4020, 0x4ff0, 0x9999_0000, 0] {
        stack.extend_from_slice(&value.to_le_bytes());
    }
    let ctx = RegisterState::Amd64(amd64(0x1500, 0x8000));
    let bytes = MinidumpBuilder::new()
        .module("a.sys", 0x1000, 0x2000)
        .module("b.sys", 0x4000, 0x1000)
        .exception(1, 0xc000_0005, 0x1500, &[])
        .exception_context(ctx)
        .thread(1, 0x8000, stack, Some(ctx))
        .build();

    let result = analyze(bytes).unwrap();
    assert_eq!(result.stack_references.get("b.sys"), Some(&3));

    let b = result.verdicts.iter().find(|v| v.module == "b.sys").unwrap();
    assert!(b.reasons.contains(&Reason::StackReferences(3)));
    assert_eq!(b.confidence, Confidence::Low);
    assert_eq!(result.culprit().unwrap().module, "a.sys");
}

#[test]
fn stack_scan_disabled() {
    init();
    let ctx = RegisterState::Amd64(amd64(0x1500, 0x8000));
    let bytes = MinidumpBuilder::new()
        .module("b.sys", 0x4000, 0x1000)
        .exception(1, 0xc000_0005, 0x1500, &[])
        .exception_context(ctx)
        .thread(1, 0x8000, 0x4010u64.to_le_bytes().to_vec(), Some(ctx))
        .build();

    let config = AnalysisConfig {
        stack_scan: false,
        ..AnalysisConfig::default()
    };
    let result = Analyzer::new()
        .config(config)
        .analyze_bytes(bytes, None)
        .unwrap();
    assert!(result.stack_references.is_empty());
}

#[test]
fn triage_driver_culprit() {
    init();
    let bytes = KernelDumpBuilder::new()
        .bug_check(0xd1, [0x10, 2, 0, 0xfffff801_0000_1500])
        .driver(r"\SystemRoot\system32\ntoskrnl.exe", 0xfffff802_0000_0000, 0x100_0000)
        .driver(r"\SystemRoot\system32\drivers\rt640x64.sys", 0xfffff801_0000_0000, 0x10_0000)
        .build();
    let result = analyze(bytes).unwrap();

    assert!(matches!(result.dump_kind, DumpKind::Kernel(_)));
    assert_eq!(result.modules.len(), 2);

    let culprit = result.culprit().unwrap();
    assert_eq!(culprit.module, "rt640x64.sys");
    assert!(culprit
        .reasons
        .contains(&Reason::ParameterAddress(0xfffff801_0000_1500)));
    assert!(culprit.remediation.is_some());
    assert!(result
        .symbols
        .iter()
        .any(|s| s.formatted == "rt640x64.sys+0x1500"));
}

#[test]
fn whea_machine_check() {
    init();
    let status_hi = (1u64 << 31) | (1 << 29) | (1 << 25);
    let bytes = KernelDumpBuilder::new()
        .bug_check(0x124, [0, 0xffff_c000_0000_1000, status_hi, 0x0000_0135])
        .build();
    let result = analyze(bytes).unwrap();

    let whea = result.whea.unwrap();
    assert_eq!(whea.source, WheaErrorSource::MachineCheck);
    assert_eq!(whea.error_record, 0xffff_c000_0000_1000);
    let mce = whea.machine_check.unwrap();
    assert!(mce.valid);
    assert!(mce.uncorrected);
    assert!(mce.context_corrupt);
}

#[test]
fn text_scan_without_module_table() {
    init();
    let mut bytes = KernelDumpBuilder::new()
        .bug_check(0x116, [0xffff_a000_0000_0000, 0xfffff801_0000_2000, 0, 2])
        .build();
    bytes.extend_from_slice(b"\0\0driver.sys\0garbage\0nvlddmkm.sys\0wXr.sys\0NVLDDMKM.SYS\0");

    let result = analyze(bytes).unwrap();
    assert_eq!(result.modules.len(), 1);
    assert_eq!(result.modules[0].name, "nvlddmkm.sys");
    assert_eq!(result.modules[0].origin, ModuleOrigin::TextScan);

    let culprit = result.culprit().unwrap();
    assert_eq!(culprit.module, "nvlddmkm.sys");
    assert!(culprit.reasons.contains(&Reason::StopCodeAssociated(0x116)));
    assert!(!culprit
        .reasons
        .iter()
        .any(|r| matches!(r, Reason::ExceptionAddress(_))));
}

#[test]
fn text_scan_disabled() {
    init();
    let mut bytes = KernelDumpBuilder::new().bug_check(0x116, [0; 4]).build();
    bytes.extend_from_slice(b"\0nvlddmkm.sys\0");

    let config = AnalysisConfig {
        text_scan: false,
        ..AnalysisConfig::default()
    };
    let result = Analyzer::new()
        .config(config)
        .analyze_bytes(bytes, None)
        .unwrap();
    assert!(result.modules.is_empty());
    assert!(result.culprit().is_none());
}

#[test]
fn loaded_symbols_are_used() {
    init();
    let resolver = SymbolResolver::new();
    resolver.load_table(
        "a.sys",
        vec![(0x400, "DriverDispatch"), (0x600, "DriverUnload")]
            .into_iter()
            .collect(),
    );

    let result = Analyzer::new()
        .resolver(&resolver)
        .analyze_bytes(two_module_minidump(), Some("crash.dmp"))
        .unwrap();
    assert_eq!(result.symbols[0].formatted, "a.sys!DriverDispatch+0x100");
    assert_eq!(result.symbols[0].residual, 0x100);

    assert_eq!(resolver.resolve("nt", 0x403c40).formatted, "nt!KeBugCheckEx");
    assert!(resolver.resolve("unknown.sys", 0x10).is_fallback());
}

#[test]
fn validator_cases() {
    assert!(!validator::is_valid("wXr.sys"));
    assert!(!validator::is_valid("../etc/passwd"));
    assert!(!validator::is_valid(""));
    assert!(!validator::is_valid(&format!("{}.sys", "a".repeat(200))));
    assert!(validator::is_valid("ndis.sys"));
}

#[test]
fn deterministic() {
    init();
    let bytes = two_module_minidump();
    let first = analyze(bytes.clone()).unwrap();
    let second = analyze(bytes).unwrap();
    assert_eq!(first, second);
}

#[test]
fn truncated_header() {
    init();
    let bytes = KernelDumpBuilder::new().bug_check(0xa, [0; 4]).build();
    match analyze(bytes[..0x100].to_vec()) {
        Err(Error::Core(err)) => assert!(err.is_truncation()),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn unknown_format() {
    assert!(analyze(b"not a dump at all".to_vec()).is_err());
    assert!(analyze(vec![]).is_err());
}

#[test]
fn damaged_dumps_never_panic() {
    init();
    let samples = vec![
        two_module_minidump(),
        KernelDumpBuilder::new()
            .bug_check(0xd1, [0, 2, 0, 0xfffff801_0000_1500])
            .driver("ndis.sys", 0xfffff801_0000_0000, 0x1000)
            .exception(0xc000_0005, 0xfffff801_0000_1500, &[0, 0])
            .build(),
    ];

    let mut mutator = DumpMutator::with_seed(0x1234);
    for sample in &samples {
        for _ in 0..64 {
            let _ = analyze(mutator.truncate(sample));
            let _ = analyze(mutator.corrupt(sample, 32));
        }
    }

    let mut rng = XorShiftRng::seed_from_u64(7);
    for signature in &[&b"PAGEDU64"[..], &b"MDMP\x93\xa7\0\0"[..]] {
        for _ in 0..64 {
            let len = rng.gen_range(0, 0x3000);
            let mut bytes = signature.to_vec();
            bytes.extend((0..len).map(|_| rng.gen::<u8>()));
            let _ = analyze(bytes);
        }
    }
}
