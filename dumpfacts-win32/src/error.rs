use std::{convert, error, fmt, result, str};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    /// Generic error type containing a string
    Other(&'static str),
    /// dumpfacts core error.
    ///
    /// Catch-all for decoding related errors.
    Core(dumpfacts_core::Error),
    /// The container holds no structure the analysis can start from.
    Initialization(&'static str),
    /// Symbol data for a module could not be obtained.
    SymbolUnavailable(&'static str),
    SymbolStore(&'static str),
    PDB(&'static str),
    /// Invalid argument string.
    Args(&'static str),
    /// Encoding error.
    ///
    /// Catch-all for string related errors such as malformed json.
    Encoding,
}

/// Convert from &str to error
impl convert::From<&'static str> for Error {
    fn from(error: &'static str) -> Self {
        Error::Other(error)
    }
}

/// Convert from dumpfacts_core::Error
impl From<dumpfacts_core::Error> for Error {
    fn from(error: dumpfacts_core::Error) -> Error {
        Error::Core(error)
    }
}

/// Convert from str::Utf8Error
impl From<str::Utf8Error> for Error {
    fn from(_err: str::Utf8Error) -> Error {
        Error::Encoding
    }
}

impl Error {
    /// Returns a tuple representing the error description and its string value.
    pub fn to_str_pair(self) -> (&'static str, Option<&'static str>) {
        match self {
            Error::Other(e) => ("other error", Some(e)),
            Error::Core(e) => e.to_str_pair(),
            Error::Initialization(e) => ("error during initialization", Some(e)),
            Error::SymbolUnavailable(e) => ("symbols unavailable", Some(e)),
            Error::SymbolStore(e) => ("error in symbol store", Some(e)),
            Error::PDB(e) => ("error handling pdb", Some(e)),
            Error::Args(e) => ("invalid arguments", Some(e)),
            Error::Encoding => ("encoding error", None),
        }
    }

    /// Returns a simple string representation of the error.
    pub fn to_str(self) -> &'static str {
        self.to_str_pair().0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Core(e) => fmt::Display::fmt(e, f),
            _ => {
                let (desc, value) = self.to_str_pair();

                if let Some(value) = value {
                    write!(f, "{}: {}", desc, value)
                } else {
                    f.write_str(desc)
                }
            }
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        self.to_str()
    }
}

/// Specialized `Result` type for dumpfacts_win32 errors.
pub type Result<T> = result::Result<T, Error>;
