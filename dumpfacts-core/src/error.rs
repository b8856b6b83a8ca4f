/*!
Specialized `Error` and `Result` types for dumpfacts.
*/

use std::{convert, fmt, result, str, string};

use std::error;

/// Specialized `Error` type for dump decoding errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    /// Generic error type containing a string
    Other(&'static str),
    /// Unknown format.
    ///
    /// The buffer does not start with any supported dump signature.
    UnknownFormat,
    /// Truncated read.
    ///
    /// A primitive read at `offset` of `width` bytes would go past the end of the buffer.
    TruncatedRead { offset: u64, width: u64 },
    /// Truncated buffer.
    ///
    /// A structure declares a size or count that extends past the end of the buffer.
    TruncatedBuffer(&'static str),
    /// The buffer is shorter than the minimum header size of its format.
    HeaderTooSmall,
    /// The signature did not match when the header was re-validated.
    BadSignature,
    /// The requested minidump stream is not present in the stream directory.
    MissingStream(u32),
    /// Invalid Architecture error.
    ///
    /// The architecture is not supported by the requested decoder.
    InvalidArchitecture,
    /// Encoding error.
    ///
    /// Catch-all for string related errors such as odd utf-16 lengths.
    Encoding,
}

/// Convert from &str to error
impl convert::From<&'static str> for Error {
    fn from(error: &'static str) -> Self {
        Error::Other(error)
    }
}

/// Convert from str::Utf8Error
impl From<str::Utf8Error> for Error {
    fn from(_err: str::Utf8Error) -> Self {
        Error::Encoding
    }
}

/// Convert from string::FromUtf16Error
impl From<string::FromUtf16Error> for Error {
    fn from(_err: string::FromUtf16Error) -> Self {
        Error::Encoding
    }
}

impl Error {
    /// Returns a tuple representing the error description and its string value.
    pub fn to_str_pair(self) -> (&'static str, Option<&'static str>) {
        match self {
            Error::Other(e) => ("other error", Some(e)),
            Error::UnknownFormat => ("unknown dump format", None),
            Error::TruncatedRead { .. } => ("truncated read", None),
            Error::TruncatedBuffer(e) => ("truncated buffer", Some(e)),
            Error::HeaderTooSmall => ("header too small", None),
            Error::BadSignature => ("bad signature", None),
            Error::MissingStream(_) => ("missing stream", None),
            Error::InvalidArchitecture => ("invalid architecture", None),
            Error::Encoding => ("encoding error", None),
        }
    }

    /// Returns a simple string representation of the error.
    pub fn to_str(self) -> &'static str {
        self.to_str_pair().0
    }

    /// Returns true for all errors caused by data ending earlier than a structure claims.
    pub fn is_truncation(self) -> bool {
        matches!(
            self,
            Error::TruncatedRead { .. } | Error::TruncatedBuffer(_) | Error::HeaderTooSmall
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::TruncatedRead { offset, width } => write!(
                f,
                "{}: {} bytes at offset {:#x}",
                self.to_str(),
                width,
                offset
            ),
            Error::MissingStream(ty) => write!(f, "{}: type {}", self.to_str(), ty),
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

/// Specialized `Result` type for dumpfacts results.
pub type Result<T> = result::Result<T, Error>;
