use dumpfacts_core::CodeViewInfo;

use super::table::SymbolTable;
use crate::error::Result;

#[cfg(feature = "symstore")]
use {
    crate::error::Error,
    log::{debug, info},
    std::time::Duration,
};

/// Default timeout for a single symbol fetch.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;

/// A place rich symbol tables can be fetched from.
///
/// Implementations may block. The resolver runs them off the calling thread with a timeout.
pub trait SymbolSource: Send + Sync {
    /// Fetches the table of `module`. `codeview` is the pdb reference of the module if known.
    fn fetch(&self, module: &str, codeview: Option<&CodeViewInfo>) -> Result<SymbolTable>;
}

/// Fetches `<base_url>/<module>.json` where the document maps `"0x<rva>"` keys to names.
#[cfg(feature = "symstore")]
#[derive(Debug, Clone)]
pub struct HttpSymbolSource {
    base_url: String,
    timeout: Duration,
}

#[cfg(feature = "symstore")]
impl HttpSymbolSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url_for(&self, module: &str) -> String {
        format!("{}/{}.json", self.base_url, module.to_lowercase())
    }
}

#[cfg(feature = "symstore")]
impl SymbolSource for HttpSymbolSource {
    fn fetch(&self, module: &str, _codeview: Option<&CodeViewInfo>) -> Result<SymbolTable> {
        let url = self.url_for(module);
        info!("fetching symbols from {}", url);

        let millis = self.timeout.as_millis() as u64;
        let resp = ureq::get(&url)
            .timeout_connect(millis)
            .timeout_read(millis)
            .call();
        if !resp.ok() {
            debug!("symbol fetch for {} failed with status {}", module, resp.status());
            return Err(Error::SymbolUnavailable("symbol table not available"));
        }

        let body = resp
            .into_string()
            .map_err(|_| Error::SymbolUnavailable("unable to read http response"))?;
        let table = SymbolTable::from_json(&body)?;
        debug!("loaded {} symbols for {}", table.len(), module);
        Ok(table)
    }
}
