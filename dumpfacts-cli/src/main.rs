mod config;
mod summary;

use std::convert::TryFrom;
use std::fs;
use std::process;

use clap::{crate_version, App, Arg, ArgMatches};
use log::{error, info, Level};

use dumpfacts_win32::prelude::v1::*;

use config::Config;

fn main() {
    let matches = parse_args();

    let level = match matches.occurrences_of("verbose") {
        0 => Level::Error,
        1 => Level::Warn,
        2 => Level::Info,
        3 => Level::Debug,
        4 => Level::Trace,
        _ => Level::Trace,
    };
    if let Err(err) = simple_logger::SimpleLogger::new()
        .with_level(level.to_level_filter())
        .init()
    {
        eprintln!("unable to initialize logger: {}", err);
    }

    if let Err(err) = run(&matches) {
        error!("{}", err);
        process::exit(1);
    }
}

fn parse_args<'a>() -> ArgMatches<'a> {
    App::new("dumpfacts")
        .version(crate_version!())
        .about("extracts facts and likely culprits from windows crash dumps")
        .arg(Arg::with_name("verbose").short("v").multiple(true))
        .arg(
            Arg::with_name("input")
                .help("kernel dump or minidump to analyze")
                .index(1)
                .required_unless("resolve"),
        )
        .arg(
            Arg::with_name("json")
                .long("json")
                .short("j")
                .help("print the analysis as json"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .short("c")
                .takes_value(true)
                .help("toml file with [symbols] and [analysis] tables"),
        )
        .arg(
            Arg::with_name("symbols")
                .long("symbols")
                .short("s")
                .takes_value(true)
                .help("symbol arguments, e.g. url=http://host/symbols,timeout=2000,store=microsoft"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .short("t")
                .takes_value(true)
                .help("symbol fetch timeout in milliseconds"),
        )
        .arg(
            Arg::with_name("pdb")
                .long("pdb")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("loads a local pdb as module=path"),
        )
        .arg(
            Arg::with_name("resolve")
                .long("resolve")
                .short("r")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("resolves module+0x<offset>"),
        )
        .arg(Arg::with_name("no-text-scan").long("no-text-scan"))
        .arg(Arg::with_name("no-stack-scan").long("no-stack-scan"))
        .arg(Arg::with_name("no-symbolize").long("no-symbolize"))
        .get_matches()
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = match matches.value_of("config") {
        Some(path) => config::try_parse(path).map_err(|err| {
            error!("unable to load config {}: {}", path, err);
            Error::Initialization("unable to load config file")
        })?,
        None => Config::default(),
    };

    // command line values take precedence over the config file
    let mut symbol_args = config.symbol_args();
    if let Some(args) = matches.value_of("symbols") {
        symbol_args = symbol_args.extend(SymbolArgs::try_from(args)?);
    }
    if let Some(timeout) = matches.value_of("timeout") {
        symbol_args = symbol_args.insert("timeout", timeout);
    }
    let resolver = symbol_args.build_resolver()?;

    if let Some(pdbs) = matches.values_of("pdb") {
        for pdb in pdbs {
            load_pdb(&resolver, pdb)?;
        }
    }

    let mut analysis = config.analysis_config();
    if matches.is_present("no-text-scan") {
        analysis.text_scan = false;
    }
    if matches.is_present("no-stack-scan") {
        analysis.stack_scan = false;
    }
    if matches.is_present("no-symbolize") {
        analysis.symbolize = false;
    }

    if let Some(input) = matches.value_of("input") {
        let bytes = fs::read(input).map_err(|err| {
            error!("unable to read {}: {}", input, err);
            Error::Initialization("unable to read dump file")
        })?;
        info!("read {} bytes from {}", bytes.len(), input);

        let result = Analyzer::new()
            .config(analysis)
            .resolver(&resolver)
            .analyze_bytes(bytes, Some(input))?;

        if matches.is_present("json") {
            let json = serde_json::to_string_pretty(&result).map_err(|_| Error::Encoding)?;
            println!("{}", json);
        } else {
            print!("{}", summary::summary(&result));
        }
    }

    if let Some(queries) = matches.values_of("resolve") {
        for query in queries {
            let (module, offset) = parse_query(query)?;
            println!("{}", resolver.resolve(module, offset));
        }
    }

    Ok(())
}

fn load_pdb(resolver: &SymbolResolver, arg: &str) -> Result<()> {
    let mut split = arg.splitn(2, '=');
    let (module, path) = match (split.next(), split.next()) {
        (Some(module), Some(path)) if !module.is_empty() && !path.is_empty() => (module, path),
        _ => return Err(Error::Args("pdb files are given as module=path")),
    };

    let table = PdbSymbols::from_file(path)?.into_table();
    resolver.load_table(module, table);
    Ok(())
}

/// Splits `module+0x<offset>`. The offset is always hexadecimal.
fn parse_query(query: &str) -> Result<(&str, u64)> {
    let mut split = query.rsplitn(2, '+');
    let (offset, module) = match (split.next(), split.next()) {
        (Some(offset), Some(module)) if !module.is_empty() => (offset, module),
        _ => return Err(Error::Args("queries are given as module+0x<offset>")),
    };
    let digits = offset.trim_start_matches("0x").trim_start_matches("0X");
    let offset = u64::from_str_radix(digits, 16)
        .map_err(|_| Error::Args("query offset is not a hex number"))?;
    Ok((module, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries() {
        assert_eq!(parse_query("nt+0x403c40").unwrap(), ("nt", 0x403c40));
        assert_eq!(parse_query("ndis.sys+1a").unwrap(), ("ndis.sys", 0x1a));
        assert_eq!(parse_query("my+mod.sys+0x10").unwrap(), ("my+mod.sys", 0x10));
        assert!(parse_query("nt").is_err());
        assert!(parse_query("+0x10").is_err());
        assert!(parse_query("nt+0xzz").is_err());
    }

    #[test]
    fn invalid_pdb_arg() {
        let resolver = SymbolResolver::new();
        assert!(load_pdb(&resolver, "ntoskrnl.pdb").is_err());
        assert!(load_pdb(&resolver, "nt=").is_err());
        assert!(load_pdb(&resolver, "nt=/nonexistent/ntkrnlmp.pdb").is_err());
    }
}
