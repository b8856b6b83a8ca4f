use std::collections::HashMap;
use std::convert::TryFrom;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::symbols::source::DEFAULT_FETCH_TIMEOUT_MS;
use crate::symbols::SymbolResolver;

#[cfg(feature = "symstore")]
use crate::symbols::{HttpSymbolSource, SymbolStore};

/// Symbol resolver settings given as a `key=value,key=value` string.
///
/// Recognized keys:
/// - `url`: base url of a json symbol server. A leading value without a key is taken as the url.
/// - `timeout`: fetch timeout in milliseconds.
/// - `store`: pdb symbol store url, `microsoft` for the public microsoft server.
/// - `cache`: local pdb cache directory, `none` disables the cache.
///
/// # Examples
///
/// Construct from a string:
/// ```
/// use dumpfacts_win32::args::SymbolArgs;
/// use std::convert::TryFrom;
///
/// let args = SymbolArgs::try_from("http://localhost/symbols,timeout=2000").unwrap();
/// assert_eq!(args.url().unwrap(), "http://localhost/symbols");
/// ```
///
/// Construct as builder:
/// ```
/// use dumpfacts_win32::args::SymbolArgs;
///
/// let args = SymbolArgs::new()
///     .insert("url", "http://localhost/symbols")
///     .insert("timeout", "500");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolArgs {
    map: HashMap<String, String>,
}

impl SymbolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_parse_str(args: &str) -> Result<Self> {
        let mut map = HashMap::new();

        for (i, kv) in args.split(',').enumerate() {
            let kv = kv.trim();
            if kv.is_empty() {
                continue;
            }
            let kvsplit = kv.splitn(2, '=').collect::<Vec<_>>();
            if kvsplit.len() == 2 {
                if kvsplit[0].is_empty() {
                    return Err(Error::Args("empty argument name"));
                }
                map.insert(kvsplit[0].to_string(), kvsplit[1].to_string());
            } else if i == 0 {
                map.insert("default".to_string(), kv.to_string());
            } else {
                return Err(Error::Args("argument without a value"));
            }
        }

        Ok(Self { map })
    }

    pub fn insert(mut self, key: &str, value: &str) -> Self {
        self.map.insert(key.to_string(), value.to_string());
        self
    }

    /// Overrides the values of `self` with all values set in `other`.
    pub fn extend(mut self, other: SymbolArgs) -> Self {
        self.map.extend(other.map);
        self
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.map.get(key)
    }

    pub fn get_default(&self) -> Option<&String> {
        self.get("default")
    }

    /// Json symbol server url.
    pub fn url(&self) -> Option<&String> {
        self.get("url").or_else(|| self.get_default())
    }

    pub fn timeout(&self) -> Result<Duration> {
        match self.get("timeout") {
            Some(ms) => ms
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| Error::Args("timeout must be a number of milliseconds")),
            None => Ok(Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS)),
        }
    }

    /// Builds a resolver with the configured sources.
    ///
    /// The json server is queried before the pdb store.
    pub fn build_resolver(&self) -> Result<SymbolResolver> {
        let timeout = self.timeout()?;
        let resolver = SymbolResolver::new().timeout(timeout);
        self.add_sources(resolver, timeout)
    }

    #[cfg(feature = "symstore")]
    fn add_sources(&self, mut resolver: SymbolResolver, timeout: Duration) -> Result<SymbolResolver> {
        if let Some(url) = self.url() {
            resolver = resolver.source(HttpSymbolSource::new(url).timeout(timeout));
        }

        if let Some(store) = self.get("store") {
            let mut symstore = SymbolStore::new().timeout(timeout);
            if store != "microsoft" {
                symstore = symstore.base_url(store);
            }
            match self.get("cache").map(String::as_str) {
                Some("none") => symstore = symstore.no_cache(),
                Some(path) => symstore = symstore.cache_path(path),
                None => {}
            }
            resolver = resolver.source(symstore);
        }

        Ok(resolver)
    }

    #[cfg(not(feature = "symstore"))]
    fn add_sources(&self, resolver: SymbolResolver, _timeout: Duration) -> Result<SymbolResolver> {
        if self.url().is_some() || self.get("store").is_some() {
            return Err(Error::Args("symbol fetching requires the symstore feature"));
        }
        Ok(resolver)
    }
}

impl TryFrom<&str> for SymbolArgs {
    type Error = Error;

    fn try_from(args: &str) -> Result<Self> {
        SymbolArgs::try_parse_str(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn from_str() {
        let argstr = "url=http://a/b,timeout=250,store=microsoft";
        let args = SymbolArgs::try_from(argstr).unwrap();
        assert_eq!(args.url().unwrap(), "http://a/b");
        assert_eq!(args.timeout().unwrap(), Duration::from_millis(250));
        assert_eq!(args.get("store").unwrap(), "microsoft");
    }

    #[test]
    pub fn from_str_default() {
        let argstr = "http://a/b,cache=none";
        let args = SymbolArgs::try_from(argstr).unwrap();
        assert_eq!(args.get_default().unwrap(), "http://a/b");
        assert_eq!(args.url().unwrap(), "http://a/b");
        assert_eq!(args.get("cache").unwrap(), "none");
    }

    #[test]
    pub fn values_may_contain_equals() {
        let args = SymbolArgs::try_from("url=http://a/?x=1").unwrap();
        assert_eq!(args.url().unwrap(), "http://a/?x=1");
    }

    #[test]
    pub fn invalid() {
        assert!(SymbolArgs::try_from("timeout=1,stray").is_err());
        assert!(SymbolArgs::try_from("=value").is_err());
        let args = SymbolArgs::try_from("timeout=soon").unwrap();
        assert!(args.timeout().is_err());
    }

    #[test]
    pub fn builder() {
        let args = SymbolArgs::new().insert("timeout", "10");
        assert_eq!(args.timeout().unwrap(), Duration::from_millis(10));
        assert!(args.url().is_none());
        assert!(args.build_resolver().is_ok());
    }

    #[test]
    pub fn extend_overrides() {
        let file = SymbolArgs::try_from("url=http://a/b,timeout=250").unwrap();
        let flags = SymbolArgs::try_from("timeout=10,cache=none").unwrap();
        let args = file.extend(flags);
        assert_eq!(args.url().unwrap(), "http://a/b");
        assert_eq!(args.timeout().unwrap(), Duration::from_millis(10));
        assert_eq!(args.get("cache").unwrap(), "none");
    }

    #[test]
    pub fn parse_empty() {
        let args = SymbolArgs::try_from("").unwrap();
        assert_eq!(args.get_default(), None);
        assert_eq!(args.timeout().unwrap(), Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS));
    }
}
