/*!
End to end analysis of a dump buffer.

The [`Analyzer`] decodes a [`RawDump`], interprets the decoded facts with the knowledge bases and
ranks the loaded modules. Failures of individual structures never abort the analysis, they
leave the corresponding field empty and are recorded in [`AnalysisResult::notes`]. The output
only depends on the input bytes and the loaded symbol tables, so identical buffers always yield
identical results.
*/

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info, warn};

use dumpfacts_core::kernel::DumpType;
use dumpfacts_core::minidump::MiscInfo;
use dumpfacts_core::types::dedup_modules;
use dumpfacts_core::{
    Anomaly, Architecture, ExceptionFacts, Format, KernelDump, Minidump, Module, OsVersion,
    ParsedDump, RawDump, RegisterState,
};

use crate::culprit::{self, validator, DriverVerdict, Ranker};
use crate::error::Result;
use crate::knowledge::{BugCheckFacts, StatusFacts, WheaFacts};
use crate::symbols::{SymbolMatch, SymbolResolver};

/// Stop code of `WHEA_UNCORRECTABLE_ERROR`.
pub const WHEA_UNCORRECTABLE_ERROR: u32 = 0x124;

/// Default number of leading bytes searched by the text scan.
pub const DEFAULT_SCAN_LIMIT: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct AnalysisConfig {
    /// Search raw bytes for driver names when no structured module table exists.
    pub text_scan: bool,
    pub scan_limit: usize,
    /// Count module references on the crashing thread's stack.
    pub stack_scan: bool,
    /// Symbolize the exception address, instruction pointer and parameter address.
    pub symbolize: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            text_scan: true,
            scan_limit: DEFAULT_SCAN_LIMIT,
            stack_scan: true,
            symbolize: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum DumpKind {
    Kernel(DumpType),
    Minidump,
}

impl fmt::Display for DumpKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DumpKind::Kernel(dump_type) => write!(f, "{}", dump_type),
            DumpKind::Minidump => f.write_str("user mode minidump"),
        }
    }
}

/// Environment facts of the crashed system.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct SystemFacts {
    pub architecture: Option<Architecture>,
    pub version: Option<OsVersion>,
    pub processor_count: Option<u32>,
    pub cpu_vendor: Option<String>,
    /// `FILETIME` of the crash, kernel dumps only.
    pub system_time: Option<u64>,
    /// Up-time in 100ns units, kernel dumps only.
    pub system_up_time: Option<u64>,
    pub comment: Option<String>,
    pub process_id: Option<u32>,
    pub process_create_time: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct AnalysisResult {
    pub format: Format,
    pub dump_kind: DumpKind,
    pub system: SystemFacts,
    pub bug_check: Option<BugCheckFacts>,
    pub exception: Option<ExceptionFacts>,
    /// Interpretation of the exception code.
    pub exception_status: Option<StatusFacts>,
    pub registers: Option<RegisterState>,
    pub anomalies: Vec<Anomaly>,
    pub modules: Vec<Module>,
    pub unloaded_modules: Vec<Module>,
    /// Pointers into modules found on the crashing stack, keyed by lowercase module name.
    pub stack_references: BTreeMap<String, u32>,
    pub verdicts: Vec<DriverVerdict>,
    pub symbols: Vec<SymbolMatch>,
    pub whea: Option<WheaFacts>,
    /// Structures that could not be decoded.
    pub notes: Vec<String>,
}

impl AnalysisResult {
    fn new(format: Format, dump_kind: DumpKind) -> Self {
        Self {
            format,
            dump_kind,
            system: SystemFacts::default(),
            bug_check: None,
            exception: None,
            exception_status: None,
            registers: None,
            anomalies: vec![],
            modules: vec![],
            unloaded_modules: vec![],
            stack_references: BTreeMap::new(),
            verdicts: vec![],
            symbols: vec![],
            whea: None,
            notes: vec![],
        }
    }

    /// The highest ranked verdict.
    pub fn culprit(&self) -> Option<&DriverVerdict> {
        self.verdicts.first()
    }

    /// Address the crash is attributed to: the exception address, or the faulting
    /// address carried by the bug check parameters.
    pub fn fault_address(&self) -> Option<u64> {
        self.exception
            .as_ref()
            .map(|e| e.address)
            .filter(|&a| a != 0)
            .or_else(|| self.bug_check.as_ref().and_then(BugCheckFacts::parameter_address))
    }

    fn note(&mut self, what: &str, err: dumpfacts_core::Error) {
        debug!("{}: {}", what, err);
        self.notes.push(format!("{}: {}", what, err));
    }
}

/// Runs the analysis pipeline over dumps.
///
/// ```
/// use dumpfacts_core::{dummy::KernelDumpBuilder, RawDump};
/// use dumpfacts_win32::analysis::Analyzer;
///
/// let bytes = KernelDumpBuilder::new().bug_check(0xa, [1, 2, 0, 0x1234]).build();
/// let result = Analyzer::new().analyze(&RawDump::new(bytes)).unwrap();
/// assert_eq!(result.bug_check.unwrap().name, "IRQL_NOT_LESS_OR_EQUAL");
/// ```
pub struct Analyzer<'r> {
    config: AnalysisConfig,
    resolver: Option<&'r SymbolResolver>,
}

impl<'r> Default for Analyzer<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Analyzer<'r> {
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            resolver: None,
        }
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `resolver` for symbolization instead of a resolver without remote sources.
    pub fn resolver(mut self, resolver: &'r SymbolResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Analyzes a dump. Fails only if the container itself cannot be decoded.
    pub fn analyze(&self, dump: &RawDump) -> Result<AnalysisResult> {
        if let (Some(name), Some(hint)) = (
            dump.name(),
            dump.name().and_then(Format::from_file_name),
        ) {
            if hint != dump.format() {
                warn!(
                    "{} looks like a {} by name but is a {} by signature",
                    name,
                    hint,
                    dump.format()
                );
            }
        }

        let mut result = match dump.parse()? {
            ParsedDump::Kernel(kernel) => self.analyze_kernel(&kernel),
            ParsedDump::Minidump(mini) => self.analyze_minidump(&mini),
        };

        if result.modules.is_empty() && self.config.text_scan {
            let limit = dump.bytes().len().min(self.config.scan_limit);
            result.modules = culprit::scan_module_names(&dump.bytes()[..limit]);
            info!("text scan found {} module names", result.modules.len());
        }
        result.modules = validator::filter_modules(dedup_modules(result.modules));

        self.rank(&mut result);
        if self.config.symbolize {
            self.symbolize(&mut result);
        }

        info!(
            "analysis done: {} modules, {} verdicts",
            result.modules.len(),
            result.verdicts.len()
        );
        Ok(result)
    }

    pub fn analyze_bytes(&self, bytes: Vec<u8>, name: Option<&str>) -> Result<AnalysisResult> {
        let dump = match name {
            Some(name) => RawDump::with_name(bytes, name),
            None => RawDump::new(bytes),
        };
        self.analyze(&dump)
    }

    fn analyze_kernel(&self, kernel: &KernelDump) -> AnalysisResult {
        let header = kernel.header();
        let mut result = AnalysisResult::new(Format::Kernel64, DumpKind::Kernel(header.dump_type));

        result.system = SystemFacts {
            architecture: Some(kernel.context_architecture()),
            version: Some(header.version),
            processor_count: Some(header.processor_count),
            system_time: Some(header.system_time),
            system_up_time: Some(header.system_up_time),
            comment: header.comment.clone(),
            ..SystemFacts::default()
        };

        let bug_check = BugCheckFacts::new(header.bug_check_code, header.bug_check_parameters);
        if bug_check.code == WHEA_UNCORRECTABLE_ERROR {
            result.whea = Some(WheaFacts::decode(bug_check.parameters));
        }
        result.bug_check = Some(bug_check);

        match kernel.exception() {
            Ok(exception) => result.exception = exception,
            Err(err) => result.note("exception record", err),
        }

        match kernel.context() {
            Ok(ctx) => result.registers = Some(ctx),
            Err(err) => result.note("context record", err),
        }

        match kernel.modules() {
            Ok(modules) => result.modules = modules,
            Err(err) => result.note("driver table", err),
        }

        self.finish_exception(&mut result);
        result
    }

    fn analyze_minidump(&self, mini: &Minidump) -> AnalysisResult {
        let mut result = AnalysisResult::new(Format::Minidump, DumpKind::Minidump);

        match mini.system_info() {
            Ok(info) => {
                result.system.version = Some(info.version);
                result.system.processor_count = Some(u32::from(info.processor_count));
                result.system.cpu_vendor = info.cpu_vendor;
            }
            Err(err) => result.note("system info", err),
        }
        result.system.architecture = Some(mini.architecture());

        if let Ok(MiscInfo {
            process_id,
            process_create_time,
            ..
        }) = mini.misc_info()
        {
            result.system.process_id = process_id;
            result.system.process_create_time = process_create_time;
        }

        match mini.modules() {
            Ok(modules) => result.modules = modules,
            Err(err) => result.note("module list", err),
        }
        if let Ok(unloaded) = mini.unloaded_modules() {
            result.unloaded_modules = unloaded;
        }

        match mini.exception() {
            Ok(stream) => {
                result.exception = Some(stream.exception);
                match mini.exception_context() {
                    Ok(ctx) => result.registers = Some(ctx),
                    Err(err) => result.note("exception context", err),
                }
            }
            Err(err) => result.note("exception stream", err),
        }

        self.finish_exception(&mut result);

        if self.config.stack_scan {
            if let Some(ctx) = result.registers {
                result.stack_references = scan_stack(mini, &ctx, &result.modules);
            }
        }

        result
    }

    fn finish_exception(&self, result: &mut AnalysisResult) {
        if let Some(exception) = &result.exception {
            result.exception_status = Some(StatusFacts::new(exception.code));
        }
        if let Some(ctx) = &result.registers {
            result.anomalies = ctx.anomalies();
        }
    }

    fn rank(&self, result: &mut AnalysisResult) {
        let mut ranker = Ranker::new(&result.modules);
        if let Some(addr) = result.exception.as_ref().map(|e| e.address).filter(|&a| a != 0) {
            ranker = ranker.exception_address(addr);
        }
        if let Some(ip) = result
            .registers
            .map(|ctx| ctx.instruction_pointer())
            .filter(|&ip| ip != 0)
        {
            ranker = ranker.instruction_pointer(ip);
        }
        if let Some(bug_check) = &result.bug_check {
            ranker = ranker.stop_code(bug_check.code);
            if let Some(addr) = bug_check.parameter_address() {
                ranker = ranker.parameter_address(addr);
            }
        }
        result.verdicts = ranker.stack_hits(result.stack_references.clone()).rank();
    }

    fn symbolize(&self, result: &mut AnalysisResult) {
        let local;
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => {
                local = SymbolResolver::new();
                &local
            }
        };
        resolver.register_modules(&result.modules);

        let mut addresses = vec![];
        if let Some(exception) = &result.exception {
            addresses.push(exception.address);
        }
        if let Some(ctx) = &result.registers {
            addresses.push(ctx.instruction_pointer());
        }
        if let Some(addr) = result.bug_check.as_ref().and_then(BugCheckFacts::parameter_address) {
            addresses.push(addr);
        }

        let mut seen = BTreeSet::new();
        for addr in addresses.into_iter().filter(|&a| a != 0) {
            if !seen.insert(addr) {
                continue;
            }
            if let Some(symbol) = resolver.resolve_address(addr, &result.modules) {
                result.symbols.push(symbol);
            }
        }
    }
}

fn scan_stack(mini: &Minidump, ctx: &RegisterState, modules: &[Module]) -> BTreeMap<String, u32> {
    let width = match ctx.architecture().pointer_width() {
        Some(width) => width,
        None => return BTreeMap::new(),
    };
    match mini.stack_window(ctx.stack_pointer()) {
        Some(window) => culprit::stack_hits(window, width, modules),
        None => {
            debug!("no stack memory at {:#x}", ctx.stack_pointer());
            BTreeMap::new()
        }
    }
}

/// Analyzes a buffer with the default configuration.
pub fn analyze(bytes: Vec<u8>) -> Result<AnalysisResult> {
    Analyzer::new().analyze_bytes(bytes, None)
}
