use std::collections::BTreeMap;
use std::fmt;
use std::iter::FromIterator;

#[cfg(feature = "symstore")]
use crate::error::{Error, Result};

/// Symbol names keyed by their offset from the module base.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: BTreeMap<u64, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rva: u64, name: &str) {
        self.symbols.insert(rva, name.to_string());
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns the highest rva in the table.
    pub fn last_rva(&self) -> Option<u64> {
        self.symbols.keys().next_back().copied()
    }

    /// Returns the name at exactly `rva`.
    pub fn get(&self, rva: u64) -> Option<&str> {
        self.symbols.get(&rva).map(String::as_str)
    }

    /// Finds the closest symbol at or below `rva` together with the residual offset.
    ///
    /// Matches whose residual exceeds `max_residual` are discarded.
    pub fn nearest(&self, rva: u64, max_residual: Option<u64>) -> Option<(&str, u64)> {
        let (start, name) = self.symbols.range(..=rva).next_back()?;
        let residual = rva - start;
        match max_residual {
            Some(limit) if residual > limit => None,
            _ => Some((name.as_str(), residual)),
        }
    }

    /// Parses a json object of the form `{ "0x1a20": "KeBugCheckEx", ... }`.
    #[cfg(feature = "symstore")]
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|_| Error::SymbolUnavailable("malformed json"))?;

        let mut table = Self::new();
        for (key, name) in raw.iter() {
            let digits = key
                .strip_prefix("0x")
                .or_else(|| key.strip_prefix("0X"))
                .ok_or(Error::SymbolUnavailable("symbol offset is not hex"))?;
            let rva = u64::from_str_radix(digits, 16)
                .map_err(|_| Error::SymbolUnavailable("symbol offset is not hex"))?;
            if !name.is_empty() {
                table.insert(rva, name);
            }
        }
        Ok(table)
    }
}

impl<'a> FromIterator<(u64, &'a str)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (u64, &'a str)>>(pairs: I) -> Self {
        let mut table = Self::new();
        for (rva, name) in pairs {
            table.insert(rva, name);
        }
        table
    }
}

/// Outcome of symbolizing a `(module, offset)` pair.
///
/// `symbol` is `None` when no table covered the offset. In that case `formatted` is
/// `module+0x<offset>` and no name is ever guessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct SymbolMatch {
    pub module: String,
    pub symbol: Option<String>,
    /// Offset from the module base that was resolved.
    pub offset: u64,
    /// Distance between the symbol start and `offset`.
    pub residual: u64,
    pub formatted: String,
}

impl SymbolMatch {
    pub fn named(module: &str, symbol: &str, offset: u64, residual: u64) -> Self {
        let formatted = if residual == 0 {
            format!("{}!{}", module, symbol)
        } else {
            format!("{}!{}+{:#x}", module, symbol, residual)
        };
        Self {
            module: module.to_string(),
            symbol: Some(symbol.to_string()),
            offset,
            residual,
            formatted,
        }
    }

    pub fn fallback(module: &str, offset: u64) -> Self {
        Self {
            module: module.to_string(),
            symbol: None,
            offset,
            residual: offset,
            formatted: format!("{}+{:#x}", module, offset),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.symbol.is_none()
    }
}

impl fmt::Display for SymbolMatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        vec![(0x1000, "first"), (0x2000, "second")].into_iter().collect()
    }

    #[test]
    fn nearest_at_or_below() {
        let table = table();
        assert_eq!(table.nearest(0x1000, None), Some(("first", 0)));
        assert_eq!(table.nearest(0x1a20, None), Some(("first", 0xa20)));
        assert_eq!(table.nearest(0x2004, None), Some(("second", 4)));
        assert_eq!(table.nearest(0xfff, None), None);
        assert_eq!(table.nearest(0x3001, Some(0x1000)), None);
        assert_eq!(table.get(0x2000), Some("second"));
    }

    #[test]
    fn formatting() {
        assert_eq!(
            SymbolMatch::named("nt", "KeBugCheckEx", 0x1000, 0).formatted,
            "nt!KeBugCheckEx"
        );
        assert_eq!(
            SymbolMatch::named("nt", "KeBugCheckEx", 0x101a, 0x1a).formatted,
            "nt!KeBugCheckEx+0x1a"
        );
        let fallback = SymbolMatch::fallback("bad.sys", 0x1234);
        assert_eq!(fallback.formatted, "bad.sys+0x1234");
        assert!(fallback.is_fallback());
    }

    #[cfg(feature = "symstore")]
    #[test]
    fn from_json() {
        let table = SymbolTable::from_json(r#"{ "0x10": "a", "0X20": "b" }"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.nearest(0x25, None), Some(("b", 5)));
        assert!(SymbolTable::from_json(r#"{ "16": "a" }"#).is_err());
        assert!(SymbolTable::from_json("[1, 2]").is_err());
        assert!(SymbolTable::from_json("{").is_err());
    }
}
