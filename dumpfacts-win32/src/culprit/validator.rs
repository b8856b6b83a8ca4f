/*!
Plausibility checks for module names that did not come out of a structured table.
*/

use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use dumpfacts_core::{Module, ModuleOrigin};

pub const MIN_NAME_LEN: usize = 5;
pub const MAX_NAME_LEN: usize = 64;

/// Names that have been seen fabricated by text extraction and are never real drivers.
const DENY_LIST: &[&str] = &[
    "wxr.sys",
    "unknown.sys",
    "driver.sys",
    "example.sys",
    "test.sys",
    "xxx.sys",
    "sample.sys",
    "module.sys",
];

static MODULE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9_-]+\.(sys|dll|exe)$").unwrap());

/// Reason a candidate name was refused.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Rejection {
    Length(usize),
    Grammar,
    DenyListed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::Length(len) => write!(
                f,
                "length {} outside {}..={}",
                len, MIN_NAME_LEN, MAX_NAME_LEN
            ),
            Rejection::Grammar => f.write_str("not a plain .sys/.dll/.exe file name"),
            Rejection::DenyListed => f.write_str("known fabricated name"),
        }
    }
}

/// Checks a candidate module name.
pub fn check(name: &str) -> Result<(), Rejection> {
    let len = name.len();
    if len < MIN_NAME_LEN || len > MAX_NAME_LEN {
        return Err(Rejection::Length(len));
    }

    if !MODULE_NAME.is_match(name) {
        return Err(Rejection::Grammar);
    }

    let lower = name.to_lowercase();
    if DENY_LIST.contains(&lower.as_str()) {
        return Err(Rejection::DenyListed);
    }

    Ok(())
}

pub fn is_valid(name: &str) -> bool {
    check(name).is_ok()
}

/// Drops scanned modules with implausible names. Structured entries pass through untouched.
pub fn filter_modules(modules: Vec<Module>) -> Vec<Module> {
    modules
        .into_iter()
        .filter(|m| {
            if m.origin != ModuleOrigin::TextScan {
                return true;
            }
            match check(&m.name) {
                Ok(()) => true,
                Err(reason) => {
                    debug!("dropping scanned module name {:?}: {}", m.name, reason);
                    false
                }
            }
        })
        .collect()
}
