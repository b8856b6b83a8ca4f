/*!
Last resort module discovery by searching raw dump bytes for driver file names.

Every hit goes through the validator and is tagged `ModuleOrigin::TextScan` so consumers
can tell it apart from structured module tables.
*/

use std::collections::HashSet;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::bytes::Regex;

use dumpfacts_core::{Module, ModuleOrigin};

use super::validator;

/// Upper bound on names returned from a single scan.
pub const MAX_SCANNED_NAMES: usize = 64;

static ASCII_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i-u)[a-z0-9_\-]{1,60}\.(?:sys|dll|exe)\b").unwrap());

static UTF16_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i-u)(?:[a-z0-9_\-]\x00){1,60}\.\x00(?:s\x00y\x00s\x00|d\x00l\x00l\x00|e\x00x\x00e\x00)",
    )
    .unwrap()
});

/// Scans `bytes` for ASCII and UTF-16LE module names.
///
/// Results are in order of first appearance, deduplicated case-insensitively, and only
/// contain names accepted by the validator.
pub fn scan_module_names(bytes: &[u8]) -> Vec<Module> {
    let mut seen = HashSet::new();
    let mut hits: Vec<(usize, String)> = vec![];

    for m in ASCII_NAME.find_iter(bytes) {
        if let Ok(name) = std::str::from_utf8(m.as_bytes()) {
            hits.push((m.start(), name.to_string()));
        }
    }

    for m in UTF16_NAME.find_iter(bytes) {
        let name: String = m.as_bytes().iter().step_by(2).map(|&b| b as char).collect();
        hits.push((m.start(), name));
    }

    hits.sort_by_key(|(offset, _)| *offset);

    let mut modules = vec![];
    for (offset, name) in hits {
        if !validator::is_valid(&name) {
            trace!("scan hit {:?} at {:#x} rejected", name, offset);
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        modules.push(Module::new(&name, 0, 0, ModuleOrigin::TextScan));
        if modules.len() >= MAX_SCANNED_NAMES {
            debug!("text scan stopped after {} names", MAX_SCANNED_NAMES);
            break;
        }
    }

    modules
}
