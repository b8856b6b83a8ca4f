/*!
Heuristic ranking of modules by how likely they are to have caused a crash.

The score is additive and only meant to order candidates:

| signal                                             | weight       |
|----------------------------------------------------|--------------|
| module contains the exception address              | +100         |
| module contains the context instruction pointer    | +80          |
| module contains a bug check parameter address      | +60          |
| third party module from a structured table         | +20          |
| third party module found by text scan              | +10          |
| listed in the problematic driver catalog           | +10          |
| catalog entry lists the current stop code          | +15          |
| attributed to a named non-microsoft vendor         | +5           |
| pointers into the module on the crashing stack     | +3 each, ≤15 |
| kernel image, window manager or graphics kernel    | -50          |
*/

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};

use dumpfacts_core::Module;

use crate::knowledge::{drivers, vendors};

pub const EXCEPTION_ADDRESS_WEIGHT: i32 = 100;
pub const INSTRUCTION_POINTER_WEIGHT: i32 = 80;
pub const PARAMETER_ADDRESS_WEIGHT: i32 = 60;
pub const THIRD_PARTY_WEIGHT: i32 = 20;
pub const SCANNED_THIRD_PARTY_WEIGHT: i32 = 10;
pub const CATALOG_WEIGHT: i32 = 10;
pub const STOP_CODE_WEIGHT: i32 = 15;
pub const VENDOR_WEIGHT: i32 = 5;
pub const STACK_HIT_WEIGHT: i32 = 3;
pub const STACK_HIT_CAP: i32 = 15;
pub const CARRIER_PENALTY: i32 = -50;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

/// A single signal that contributed to a verdict.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub enum Reason {
    ExceptionAddress(u64),
    InstructionPointer(u64),
    ParameterAddress(u64),
    ThirdParty,
    ScannedThirdParty,
    KnownProblematic(&'static str),
    StopCodeAssociated(u32),
    Vendor(&'static str),
    StackReferences(u32),
    Carrier,
}

impl Reason {
    pub fn weight(&self) -> i32 {
        match self {
            Reason::ExceptionAddress(_) => EXCEPTION_ADDRESS_WEIGHT,
            Reason::InstructionPointer(_) => INSTRUCTION_POINTER_WEIGHT,
            Reason::ParameterAddress(_) => PARAMETER_ADDRESS_WEIGHT,
            Reason::ThirdParty => THIRD_PARTY_WEIGHT,
            Reason::ScannedThirdParty => SCANNED_THIRD_PARTY_WEIGHT,
            Reason::KnownProblematic(_) => CATALOG_WEIGHT,
            Reason::StopCodeAssociated(_) => STOP_CODE_WEIGHT,
            Reason::Vendor(_) => VENDOR_WEIGHT,
            Reason::StackReferences(n) => {
                ((*n).min(STACK_HIT_CAP as u32) as i32 * STACK_HIT_WEIGHT).min(STACK_HIT_CAP)
            }
            Reason::Carrier => CARRIER_PENALTY,
        }
    }

    fn is_fault_address(&self) -> bool {
        matches!(
            self,
            Reason::ExceptionAddress(_) | Reason::InstructionPointer(_)
        )
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reason::ExceptionAddress(a) => write!(f, "contains exception address {:#x}", a),
            Reason::InstructionPointer(a) => write!(f, "contains instruction pointer {:#x}", a),
            Reason::ParameterAddress(a) => {
                write!(f, "contains bug check parameter address {:#x}", a)
            }
            Reason::ThirdParty => f.write_str("third party module"),
            Reason::ScannedThirdParty => f.write_str("third party name found in dump text"),
            Reason::KnownProblematic(vendor) => {
                write!(f, "known problematic {} driver", vendor)
            }
            Reason::StopCodeAssociated(code) => {
                write!(f, "driver is associated with stop code {:#x}", code)
            }
            Reason::Vendor(vendor) => write!(f, "vendor {}", vendor),
            Reason::StackReferences(n) => write!(f, "{} references on the crashing stack", n),
            Reason::Carrier => f.write_str("carrier module, rarely the root cause"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct DriverVerdict {
    pub module: String,
    pub vendor: Option<String>,
    pub is_microsoft: bool,
    pub suspicion_score: i32,
    pub confidence: Confidence,
    pub reasons: Vec<Reason>,
    /// Catalog remediation if the module is a known problematic driver.
    pub remediation: Option<&'static str>,
}

impl fmt::Display for DriverVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (score {}, {} confidence)",
            self.module, self.suspicion_score, self.confidence
        )
    }
}

/// Builder collecting the signals of one crash and ranking its modules.
///
/// ```
/// use dumpfacts_core::{Module, ModuleOrigin};
/// use dumpfacts_win32::culprit::{Confidence, Ranker};
///
/// let modules = vec![
///     Module::new("a.sys", 0x1000, 0x2000, ModuleOrigin::ModuleList),
///     Module::new("b.sys", 0x4000, 0x1000, ModuleOrigin::ModuleList),
/// ];
/// let verdicts = Ranker::new(&modules).exception_address(0x1500).rank();
/// assert_eq!(verdicts[0].module, "a.sys");
/// assert_eq!(verdicts[0].confidence, Confidence::High);
/// ```
pub struct Ranker<'a> {
    modules: &'a [Module],
    exception_address: Option<u64>,
    instruction_pointer: Option<u64>,
    parameter_address: Option<u64>,
    stop_code: Option<u32>,
    stack_hits: BTreeMap<String, u32>,
}

impl<'a> Ranker<'a> {
    pub fn new(modules: &'a [Module]) -> Self {
        Self {
            modules,
            exception_address: None,
            instruction_pointer: None,
            parameter_address: None,
            stop_code: None,
            stack_hits: BTreeMap::new(),
        }
    }

    pub fn exception_address(mut self, addr: u64) -> Self {
        self.exception_address = Some(addr);
        self
    }

    pub fn instruction_pointer(mut self, addr: u64) -> Self {
        self.instruction_pointer = Some(addr);
        self
    }

    pub fn parameter_address(mut self, addr: u64) -> Self {
        self.parameter_address = Some(addr);
        self
    }

    pub fn stop_code(mut self, code: u32) -> Self {
        self.stop_code = Some(code);
        self
    }

    /// Stack reference counts keyed by lowercase module name.
    pub fn stack_hits(mut self, hits: BTreeMap<String, u32>) -> Self {
        self.stack_hits = hits;
        self
    }

    /// Scores every module and returns those with a positive score, highest first.
    ///
    /// Ties are broken by module name so the order is stable.
    pub fn rank(&self) -> Vec<DriverVerdict> {
        let mut verdicts: Vec<DriverVerdict> = self
            .modules
            .iter()
            .map(|m| self.judge(m))
            .filter(|v| v.suspicion_score > 0)
            .collect();

        verdicts.sort_by(|a, b| match b.suspicion_score.cmp(&a.suspicion_score) {
            Ordering::Equal => a.module.to_lowercase().cmp(&b.module.to_lowercase()),
            other => other,
        });

        debug!("ranked {} of {} modules", verdicts.len(), self.modules.len());
        verdicts
    }

    fn judge(&self, module: &Module) -> DriverVerdict {
        let mut reasons = vec![];

        let exception = self.exception_address.filter(|&a| module.contains(a));
        if let Some(addr) = exception {
            reasons.push(Reason::ExceptionAddress(addr));
        }
        if let Some(addr) = self
            .instruction_pointer
            .filter(|&a| module.contains(a) && Some(a) != exception)
        {
            reasons.push(Reason::InstructionPointer(addr));
        }
        if let Some(addr) = self.parameter_address.filter(|&a| {
            module.contains(a) && Some(a) != exception && Some(a) != self.instruction_pointer
        }) {
            reasons.push(Reason::ParameterAddress(addr));
        }

        let is_microsoft = vendors::is_microsoft(&module.name);
        let vendor = vendors::vendor(&module.name);

        if !is_microsoft {
            if module.origin.is_structured() {
                reasons.push(Reason::ThirdParty);
            } else {
                reasons.push(Reason::ScannedThirdParty);
            }
        }

        let catalog = drivers::lookup(&module.name);
        if let Some(info) = catalog {
            reasons.push(Reason::KnownProblematic(info.manufacturer));
            if let Some(code) = self.stop_code.filter(|&c| info.is_associated_with(c)) {
                reasons.push(Reason::StopCodeAssociated(code));
            }
        }

        if let Some(name) = vendor.filter(|_| !is_microsoft) {
            reasons.push(Reason::Vendor(name));
        }

        if let Some(&count) = self.stack_hits.get(&module.name.to_lowercase()) {
            if count > 0 {
                reasons.push(Reason::StackReferences(count));
            }
        }

        let carrier = vendors::is_carrier(&module.name);
        if carrier {
            reasons.push(Reason::Carrier);
        }

        let score = reasons.iter().map(Reason::weight).sum();
        let confidence = confidence(&reasons, carrier, score);
        trace!("{}: score {} from {:?}", module.name, score, reasons);

        DriverVerdict {
            module: module.name.clone(),
            vendor: vendor.map(str::to_string),
            is_microsoft,
            suspicion_score: score,
            confidence,
            reasons,
            remediation: catalog.map(|info| info.remediation),
        }
    }
}

fn confidence(reasons: &[Reason], carrier: bool, score: i32) -> Confidence {
    let fault_address = reasons.iter().any(Reason::is_fault_address);
    let parameter_address = reasons
        .iter()
        .any(|r| matches!(r, Reason::ParameterAddress(_)));

    if fault_address && !carrier {
        Confidence::High
    } else if fault_address || parameter_address || score >= 40 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}
