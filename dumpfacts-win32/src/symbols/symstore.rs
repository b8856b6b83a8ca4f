use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::home_dir;
use log::{debug, info, warn};

use dumpfacts_core::CodeViewInfo;

use super::pdb::PdbSymbols;
use super::source::{SymbolSource, DEFAULT_FETCH_TIMEOUT_MS};
use super::table::SymbolTable;
use crate::error::{Error, Result};

pub const MICROSOFT_SYMBOL_SERVER: &str = "https://msdl.microsoft.com/download/symbols";

/// Downloads pdb files from a symbol server, keyed by CodeView guid and age.
///
/// Downloaded files are kept in `~/.dumpfacts/cache/<pdb name>/<id>` unless caching is
/// disabled.
#[derive(Debug, Clone)]
pub struct SymbolStore {
    base_url: String,
    cache_path: Option<PathBuf>,
    timeout: Duration,
}

impl Default for SymbolStore {
    fn default() -> Self {
        Self {
            base_url: MICROSOFT_SYMBOL_SERVER.to_string(),
            cache_path: home_dir().map(|home| home.join(".dumpfacts").join("cache")),
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        }
    }
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pdb described by `codeview`, from the local cache if present.
    pub fn load(&self, codeview: &CodeViewInfo) -> Result<Vec<u8>> {
        let id = codeview.symbol_store_id();
        let cache_file = self
            .cache_path
            .as_ref()
            .map(|path| path.join(&codeview.pdb_name).join(&id));

        if let Some(file) = cache_file.as_ref().filter(|file| file.exists()) {
            info!("reading pdb from local cache: {}", file.to_string_lossy());
            return fs::read(file)
                .map_err(|_| Error::SymbolStore("unable to read pdb from local cache"));
        }

        let buffer = self.download(codeview, &id)?;
        if let Some(file) = &cache_file {
            store_cached(file, &buffer);
        }
        Ok(buffer)
    }

    fn download(&self, codeview: &CodeViewInfo, id: &str) -> Result<Vec<u8>> {
        let pdb_url = format!("{}/{}/{}", self.base_url, codeview.pdb_name, id);

        // servers without the plain file answer with a `file.ptr` redirect
        self.download_file(&format!("{}/{}", pdb_url, codeview.pdb_name))
            .or_else(|_| self.download_file(&format!("{}/file.ptr", pdb_url)))
    }

    fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        debug!("requesting {}", url);
        let millis = self.timeout.as_millis() as u64;
        let resp = ureq::get(url)
            .timeout_connect(millis)
            .timeout_read(millis)
            .call();
        if !resp.ok() {
            debug!("{} answered with status {}", url, resp.status());
            return Err(Error::SymbolStore("pdb not found on symbol server"));
        }

        let len = resp
            .header("Content-Length")
            .and_then(|s| s.parse::<usize>().ok());

        let mut buffer = Vec::with_capacity(len.unwrap_or_default());
        resp.into_reader()
            .read_to_end(&mut buffer)
            .map_err(|_| Error::SymbolStore("connection dropped during pdb download"))?;

        if let Some(len) = len {
            if buffer.len() != len {
                debug!("expected {} bytes, received {}", len, buffer.len());
                return Err(Error::SymbolStore("pdb download was truncated"));
            }
        }
        Ok(buffer)
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.cache_path = None;
        self
    }

    pub fn cache_path<P: AsRef<Path>>(mut self, cache_path: P) -> Self {
        self.cache_path = Some(cache_path.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cache write failures are logged and ignored.
fn store_cached(file: &Path, buffer: &[u8]) {
    if let Some(dir) = file.parent() {
        if let Err(err) = fs::create_dir_all(dir) {
            warn!("unable to create pdb cache directory {}: {}", dir.to_string_lossy(), err);
            return;
        }
    }
    info!("writing pdb to local cache: {}", file.to_string_lossy());
    if let Err(err) = fs::write(file, buffer) {
        warn!("unable to write pdb to local cache: {}", err);
    }
}

impl SymbolSource for SymbolStore {
    fn fetch(&self, module: &str, codeview: Option<&CodeViewInfo>) -> Result<SymbolTable> {
        let codeview = codeview.ok_or_else(|| {
            debug!("{} has no codeview record, skipping symbol store", module);
            Error::SymbolUnavailable("module has no codeview record")
        })?;
        let bytes = self.load(codeview)?;
        Ok(PdbSymbols::new(&bytes)?.into_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let store = SymbolStore::new()
            .base_url("http://localhost/symbols/")
            .no_cache();
        assert_eq!(store.base_url, "http://localhost/symbols");
        assert!(store.cache_path.is_none());

        let store = store.cache_path("/tmp/dumpfacts");
        assert_eq!(store.cache_path, Some(PathBuf::from("/tmp/dumpfacts")));
    }

    #[test]
    fn requires_codeview() {
        let store = SymbolStore::new().no_cache();
        assert_eq!(
            store.fetch("ndis.sys", None),
            Err(Error::SymbolUnavailable("module has no codeview record"))
        );
    }
}
