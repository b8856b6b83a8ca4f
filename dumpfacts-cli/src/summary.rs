use std::fmt::Write;

use dumpfacts_win32::analysis::AnalysisResult;

const LABEL_WIDTH: usize = 12;

fn line(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<width$} {}", label, value, width = LABEL_WIDTH);
}

fn detail(out: &mut String, value: &str) {
    let _ = writeln!(out, "{:<width$} {}", "", value, width = LABEL_WIDTH);
}

/// Human readable report of an analysis.
pub fn summary(result: &AnalysisResult) -> String {
    let mut out = String::new();

    line(
        &mut out,
        "format:",
        &format!("{}, {}", result.format, result.dump_kind),
    );

    let system = &result.system;
    let mut sys = vec![];
    if let Some(version) = &system.version {
        sys.push(format!("windows {}", version));
    }
    if let Some(arch) = &system.architecture {
        sys.push(arch.to_string());
    }
    if let Some(count) = system.processor_count {
        sys.push(format!("{} processors", count));
    }
    if let Some(vendor) = &system.cpu_vendor {
        sys.push(vendor.clone());
    }
    if !sys.is_empty() {
        line(&mut out, "system:", &sys.join(", "));
    }
    if let Some(comment) = &system.comment {
        line(&mut out, "comment:", comment);
    }
    if let Some(pid) = system.process_id {
        line(&mut out, "process:", &pid.to_string());
    }

    if let Some(bug_check) = &result.bug_check {
        line(&mut out, "bug check:", &bug_check.to_string());
    }
    if let Some(whea) = &result.whea {
        line(
            &mut out,
            "whea:",
            &format!("{}, error record {:#x}", whea.source, whea.error_record),
        );
        if let Some(mce) = &whea.machine_check {
            detail(&mut out, &mce.to_string());
        }
    }

    if let Some(exception) = &result.exception {
        let name = result
            .exception_status
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or_default();
        line(
            &mut out,
            "exception:",
            &format!("{:#010x} {} at {:#x}", exception.code, name, exception.address),
        );
        if let Some(status) = &result.exception_status {
            for cause in status.causes.iter() {
                detail(&mut out, &format!("possible cause: {}", cause));
            }
        }
    }

    if let Some(regs) = &result.registers {
        line(
            &mut out,
            "registers:",
            &format!(
                "ip {:#x} sp {:#x} flags [{}]",
                regs.instruction_pointer(),
                regs.stack_pointer(),
                regs.eflags().names().join(" ")
            ),
        );
    }
    for anomaly in result.anomalies.iter() {
        line(&mut out, "anomaly:", &anomaly.to_string());
    }

    line(
        &mut out,
        "modules:",
        &format!(
            "{} loaded, {} unloaded",
            result.modules.len(),
            result.unloaded_modules.len()
        ),
    );
    for symbol in result.symbols.iter() {
        line(&mut out, "symbol:", &symbol.to_string());
    }

    if result.verdicts.is_empty() {
        line(&mut out, "culprit:", "no suspicious module found");
    }
    for (i, verdict) in result.verdicts.iter().enumerate() {
        let label = if i == 0 { "culprit:" } else { "suspect:" };
        line(&mut out, label, &verdict.to_string());
        for reason in verdict.reasons.iter() {
            detail(&mut out, &format!("- {}", reason));
        }
        if let Some(remediation) = verdict.remediation {
            detail(&mut out, &format!("remediation: {}", remediation));
        }
    }

    for note in result.notes.iter() {
        line(&mut out, "note:", note);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use dumpfacts_core::dummy::{KernelDumpBuilder, MinidumpBuilder};
    use dumpfacts_win32::analysis::analyze;

    #[test]
    fn kernel_summary() {
        let bytes = KernelDumpBuilder::new()
            .bug_check(0xd1, [0x10, 2, 0, 0xfffff801_0000_1500])
            .driver("rt640x64.sys", 0xfffff801_0000_0000, 0x10_0000)
            .build();
        let text = summary(&analyze(bytes).unwrap());

        assert!(text.contains("DRIVER_IRQL_NOT_LESS_OR_EQUAL"));
        assert!(text.contains("culprit:     rt640x64.sys"));
        assert!(text.contains("remediation:"));
    }

    #[test]
    fn minidump_summary() {
        let bytes = MinidumpBuilder::new()
            .module("a.sys", 0x1000, 0x2000)
            .exception(1, 0xc000_0005, 0x1500, &[0, 0])
            .build();
        let text = summary(&analyze(bytes).unwrap());

        assert!(text.contains("STATUS_ACCESS_VIOLATION at 0x1500"));
        assert!(text.contains("symbol:      a.sys+0x500"));
        assert!(text.contains("modules:     1 loaded, 0 unloaded"));
    }
}
