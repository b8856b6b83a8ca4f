use std::fs;
use std::io::{Error, ErrorKind, Result};

use serde::Deserialize;

use dumpfacts_win32::analysis::AnalysisConfig;
use dumpfacts_win32::args::SymbolArgs;

/// `[symbols]` table of the config file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SymbolsConfig {
    pub url: Option<String>,
    /// Fetch timeout in milliseconds.
    pub timeout: Option<u64>,
    pub store: Option<String>,
    pub cache: Option<String>,
}

/// `[analysis]` table of the config file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalysisSection {
    pub text_scan: Option<bool>,
    pub scan_limit: Option<usize>,
    pub stack_scan: Option<bool>,
    pub symbolize: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    pub symbols: Option<SymbolsConfig>,
    pub analysis: Option<AnalysisSection>,
}

impl Config {
    pub fn symbol_args(&self) -> SymbolArgs {
        let mut args = SymbolArgs::new();
        if let Some(symbols) = &self.symbols {
            if let Some(url) = &symbols.url {
                args = args.insert("url", url);
            }
            if let Some(timeout) = symbols.timeout {
                args = args.insert("timeout", &timeout.to_string());
            }
            if let Some(store) = &symbols.store {
                args = args.insert("store", store);
            }
            if let Some(cache) = &symbols.cache {
                args = args.insert("cache", cache);
            }
        }
        args
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        if let Some(analysis) = &self.analysis {
            config.text_scan = analysis.text_scan.unwrap_or(config.text_scan);
            config.scan_limit = analysis.scan_limit.unwrap_or(config.scan_limit);
            config.stack_scan = analysis.stack_scan.unwrap_or(config.stack_scan);
            config.symbolize = analysis.symbolize.unwrap_or(config.symbolize);
        }
        config
    }
}

pub fn parse_str(cfg: &str) -> Result<Config> {
    toml::from_str::<Config>(cfg).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

pub fn try_parse(name: &str) -> Result<Config> {
    let cfg = fs::read_to_string(name)?;
    parse_str(&cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn full_file() {
        let cfg = parse_str(
            r#"
            [symbols]
            url = "http://localhost/symbols"
            timeout = 750
            cache = "none"

            [analysis]
            text_scan = false
            scan_limit = 4096
            "#,
        )
        .unwrap();

        let args = cfg.symbol_args();
        assert_eq!(args.url().unwrap(), "http://localhost/symbols");
        assert_eq!(args.timeout().unwrap(), Duration::from_millis(750));
        assert_eq!(args.get("cache").unwrap(), "none");
        assert_eq!(args.get("store"), None);

        let analysis = cfg.analysis_config();
        assert!(!analysis.text_scan);
        assert_eq!(analysis.scan_limit, 4096);
        assert!(analysis.stack_scan);
        assert!(analysis.symbolize);
    }

    #[test]
    fn empty_file() {
        let cfg = parse_str("").unwrap();
        assert_eq!(cfg.analysis_config(), AnalysisConfig::default());
        assert_eq!(cfg.symbol_args(), SymbolArgs::new());
    }

    #[test]
    fn invalid_file() {
        assert!(parse_str("[symbols]\ntimeout = \"soon\"").is_err());
    }
}
