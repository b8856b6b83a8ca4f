use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use once_cell::sync::OnceCell;

use dumpfacts_core::types::module::find_module;
use dumpfacts_core::{CodeViewInfo, Module};

use super::builtin;
use super::source::{SymbolSource, DEFAULT_FETCH_TIMEOUT_MS};
use super::table::{SymbolMatch, SymbolTable};

/// Memoized result of fetching a module's symbol table.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Loaded(Arc<SymbolTable>),
    Unavailable,
    TimedOut,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves `(module, offset)` pairs to symbol names.
///
/// Lookups go through a per-resolver cache, tables loaded explicitly or fetched from the
/// configured sources, the built-in kernel table and finally the `module+0x<offset>` form.
/// Each module is fetched at most once per resolver, concurrent lookups of the same module
/// wait on a single fetch.
pub struct SymbolResolver {
    sources: Vec<Arc<dyn SymbolSource>>,
    timeout: Duration,
    tables: Mutex<HashMap<String, Arc<SymbolTable>>>,
    fetches: Mutex<HashMap<String, Arc<OnceCell<FetchOutcome>>>>,
    codeviews: Mutex<HashMap<String, CodeViewInfo>>,
    cache: Mutex<HashMap<(String, u64), SymbolMatch>>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver {
    /// Creates a resolver without remote sources.
    pub fn new() -> Self {
        Self {
            sources: vec![],
            timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            tables: Mutex::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
            codeviews: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Adds a source queried after the previously added ones.
    pub fn source<S: SymbolSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Upper bound on a single module fetch across all sources.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Installs a rich table for `module`, replacing earlier results for it.
    pub fn load_table(&self, module: &str, table: SymbolTable) {
        let key = module.to_lowercase();
        info!("loaded {} symbols for {}", table.len(), module);
        lock(&self.tables).insert(key.clone(), Arc::new(table));
        lock(&self.cache).retain(|(m, _), _| *m != key);
    }

    /// Remembers the pdb references of modules so sources keyed by guid can be used.
    pub fn register_modules(&self, modules: &[Module]) {
        let mut codeviews = lock(&self.codeviews);
        for module in modules {
            if let Some(codeview) = &module.codeview {
                codeviews.insert(module.name.to_lowercase(), codeview.clone());
            }
        }
    }

    /// Resolves an offset inside `module`, fetching its table if needed.
    pub fn resolve(&self, module: &str, offset: u64) -> SymbolMatch {
        let key = module.to_lowercase();
        if let Some(hit) = lock(&self.cache).get(&(key.clone(), offset)) {
            return hit.clone();
        }

        let table = self.loaded_table(&key).or_else(|| self.fetch(&key));
        let result = lookup(module, offset, table.as_deref());

        lock(&self.cache).insert((key, offset), result.clone());
        result
    }

    /// Like `resolve` but only uses data that is already present. Never starts a fetch.
    pub fn resolve_cached(&self, module: &str, offset: u64) -> SymbolMatch {
        let key = module.to_lowercase();
        if let Some(hit) = lock(&self.cache).get(&(key.clone(), offset)) {
            return hit.clone();
        }

        let table = self.loaded_table(&key).or_else(|| self.fetched_table(&key));
        lookup(module, offset, table.as_deref())
    }

    /// Resolves an absolute address against a module list.
    pub fn resolve_address(&self, addr: u64, modules: &[Module]) -> Option<SymbolMatch> {
        let module = find_module(modules, addr)?;
        Some(self.resolve(&module.name, addr - module.base))
    }

    /// Outcome of a completed fetch for `module`, `None` if none was attempted.
    pub fn fetch_outcome(&self, module: &str) -> Option<FetchOutcome> {
        let cell = lock(&self.fetches).get(&module.to_lowercase()).cloned()?;
        cell.get().cloned()
    }

    fn loaded_table(&self, key: &str) -> Option<Arc<SymbolTable>> {
        lock(&self.tables).get(key).cloned()
    }

    fn fetched_table(&self, key: &str) -> Option<Arc<SymbolTable>> {
        match self.fetch_outcome(key)? {
            FetchOutcome::Loaded(table) => Some(table),
            _ => None,
        }
    }

    fn fetch(&self, key: &str) -> Option<Arc<SymbolTable>> {
        if self.sources.is_empty() {
            return None;
        }

        // the map lock is released before the fetch runs
        let cell = lock(&self.fetches)
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        match cell.get_or_init(|| self.run_fetch(key)) {
            FetchOutcome::Loaded(table) => Some(table.clone()),
            _ => None,
        }
    }

    fn run_fetch(&self, key: &str) -> FetchOutcome {
        let sources = self.sources.clone();
        let codeview = lock(&self.codeviews).get(key).cloned();
        let module = key.to_string();
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("symbols-{}", key))
            .spawn(move || {
                let table = sources
                    .iter()
                    .find_map(|source| source.fetch(&module, codeview.as_ref()).ok());
                // the receiver is gone if the fetch timed out
                let _ = tx.send(table);
            });
        if spawned.is_err() {
            warn!("unable to spawn symbol fetch thread for {}", key);
            return FetchOutcome::Unavailable;
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Some(table)) => {
                debug!("fetched {} symbols for {}", table.len(), key);
                FetchOutcome::Loaded(Arc::new(table))
            }
            Ok(None) => {
                debug!("no symbols available for {}", key);
                FetchOutcome::Unavailable
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("symbol fetch for {} timed out after {:?}", key, self.timeout);
                FetchOutcome::TimedOut
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => FetchOutcome::Unavailable,
        }
    }
}

fn lookup(module: &str, offset: u64, table: Option<&SymbolTable>) -> SymbolMatch {
    if let Some((name, residual)) = table.and_then(|t| t.nearest(offset, None)) {
        return SymbolMatch::named(module, name, offset, residual);
    }
    if let Some((name, residual)) = builtin::lookup(module, offset) {
        return SymbolMatch::named(module, name, offset, residual);
    }
    SymbolMatch::fallback(module, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use dumpfacts_core::ModuleOrigin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        delay: Duration,
        table: Option<SymbolTable>,
    }

    impl SymbolSource for CountingSource {
        fn fetch(&self, _module: &str, _codeview: Option<&CodeViewInfo>) -> Result<SymbolTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.table
                .clone()
                .ok_or(Error::SymbolUnavailable("no table"))
        }
    }

    fn counting(table: Option<SymbolTable>, delay: Duration) -> (CountingSource, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CountingSource {
                calls: calls.clone(),
                delay,
                table,
            },
            calls,
        )
    }

    fn driver_table() -> SymbolTable {
        vec![(0x1000, "DriverEntry"), (0x2000, "DispatchIoctl")]
            .into_iter()
            .collect()
    }

    #[test]
    fn fallback_never_invents_names() {
        let resolver = SymbolResolver::new();
        let result = resolver.resolve("bad.sys", 0x1234);
        assert_eq!(result.symbol, None);
        assert_eq!(result.formatted, "bad.sys+0x1234");
    }

    #[test]
    fn builtin_residuals() {
        let resolver = SymbolResolver::new();
        let exact = resolver.resolve("ntoskrnl.exe", 0x0040_3c40);
        assert_eq!(exact.symbol.as_deref(), Some("KeBugCheckEx"));
        assert_eq!(exact.residual, 0);
        assert_eq!(exact.formatted, "ntoskrnl.exe!KeBugCheckEx");

        let between = resolver.resolve("ntoskrnl.exe", 0x0040_3c5a);
        assert_eq!(between.residual, 0x1a);
        assert_eq!(between.formatted, "ntoskrnl.exe!KeBugCheckEx+0x1a");
    }

    #[test]
    fn loaded_tables_take_precedence() {
        let resolver = SymbolResolver::new();
        assert!(resolver.resolve("drv.sys", 0x2010).is_fallback());

        resolver.load_table("DRV.SYS", driver_table());
        let result = resolver.resolve("drv.sys", 0x2010);
        assert_eq!(result.symbol.as_deref(), Some("DispatchIoctl"));
        assert_eq!(result.residual, 0x10);
    }

    #[test]
    fn fetches_are_single_flight() {
        let (source, calls) = counting(Some(driver_table()), Duration::from_millis(50));
        let resolver = Arc::new(SymbolResolver::new().source(source));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resolver = resolver.clone();
                thread::spawn(move || resolver.resolve("drv.sys", 0x1000 + i))
            })
            .collect();
        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.symbol.as_deref(), Some("DriverEntry"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_memoized() {
        let (source, calls) = counting(None, Duration::from_millis(0));
        let resolver = SymbolResolver::new().source(source);
        assert!(resolver.resolve("drv.sys", 0x10).is_fallback());
        assert!(resolver.resolve("drv.sys", 0x20).is_fallback());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            resolver.fetch_outcome("drv.sys"),
            Some(FetchOutcome::Unavailable)
        ));
    }

    #[test]
    fn timeouts_degrade_to_fallback() {
        let (source, calls) = counting(Some(driver_table()), Duration::from_millis(500));
        let resolver = SymbolResolver::new()
            .source(source)
            .timeout(Duration::from_millis(20));
        assert!(resolver.resolve("drv.sys", 0x1000).is_fallback());
        assert!(resolver.resolve("drv.sys", 0x1004).is_fallback());
        assert!(calls.load(Ordering::SeqCst) <= 1);
        assert!(matches!(
            resolver.fetch_outcome("drv.sys"),
            Some(FetchOutcome::TimedOut)
        ));
    }

    #[test]
    fn cached_lookups_never_fetch() {
        let (source, calls) = counting(Some(driver_table()), Duration::from_millis(0));
        let resolver = SymbolResolver::new().source(source);
        assert!(resolver.resolve_cached("drv.sys", 0x1000).is_fallback());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        resolver.resolve("drv.sys", 0x1000);
        let cached = resolver.resolve_cached("drv.sys", 0x2000);
        assert_eq!(cached.symbol.as_deref(), Some("DispatchIoctl"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absolute_addresses() {
        let resolver = SymbolResolver::new();
        let modules = vec![
            Module::new("ntoskrnl.exe", 0xfffff800_0000_0000, 0x100_0000, ModuleOrigin::DriverTable),
            Module::new("bad.sys", 0xfffff801_0000_0000, 0x8000, ModuleOrigin::DriverTable),
        ];
        let result = resolver
            .resolve_address(0xfffff800_0040_3c41, &modules)
            .unwrap();
        assert_eq!(result.formatted, "ntoskrnl.exe!KeBugCheckEx+0x1");

        let result = resolver
            .resolve_address(0xfffff801_0000_1234, &modules)
            .unwrap();
        assert_eq!(result.formatted, "bad.sys+0x1234");
        assert!(resolver.resolve_address(0x1000, &modules).is_none());
    }
}
