use std::cmp::{Ord, Ordering, PartialEq};
use std::fmt;

/// Windows version as reported by a dump.
///
/// Kernel dumps only carry the build number (plus a free/checked marker), minidumps carry the
/// full major.minor.build triple.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct OsVersion {
    major_version: u32,
    minor_version: u32,
    build_number: u32,
    checked_build: bool,
}

impl OsVersion {
    pub fn new(major_version: u32, minor_version: u32, build_number: u32) -> Self {
        Self {
            major_version,
            minor_version,
            build_number,
            checked_build: false,
        }
    }

    /// Builds a version out of the `MajorVersion` / `MinorVersion` pair of a kernel dump header.
    ///
    /// The major value is 0xf for free builds and 0xc for checked builds,
    /// the minor value holds the build number.
    pub fn from_kernel_header(major: u32, minor: u32) -> Self {
        Self {
            major_version: 0,
            minor_version: 0,
            build_number: minor,
            checked_build: major == 0xc,
        }
    }

    pub fn major_version(&self) -> u32 {
        self.major_version
    }

    pub fn minor_version(&self) -> u32 {
        self.minor_version
    }

    pub fn build_number(&self) -> u32 {
        self.build_number & 0xFFFF
    }

    pub fn is_checked_build(&self) -> bool {
        self.checked_build
    }

    /// Marketing name of the release, derived from the build number.
    pub fn release_name(&self) -> Option<&'static str> {
        let name = match self.build_number() {
            0 => return None,
            b if b >= 22000 => "Windows 11",
            b if b >= 10240 => "Windows 10",
            b if b >= 9600 => "Windows 8.1",
            b if b >= 9200 => "Windows 8",
            b if b >= 7600 => "Windows 7",
            b if b >= 6000 => "Windows Vista",
            _ => return None,
        };
        Some(name)
    }

    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (
            self.major_version(),
            self.minor_version(),
            self.build_number(),
        )
    }
}

impl PartialOrd for OsVersion {
    fn partial_cmp(&self, other: &OsVersion) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OsVersion {
    fn cmp(&self, other: &OsVersion) -> Ordering {
        if self.build_number != 0 && other.build_number != 0 {
            return self.build_number().cmp(&other.build_number());
        }

        self.major_version
            .cmp(&other.major_version)
            .then(self.minor_version.cmp(&other.minor_version))
    }
}

impl PartialEq for OsVersion {
    fn eq(&self, other: &OsVersion) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OsVersion {}

impl From<(u32, u32, u32)> for OsVersion {
    fn from((major, minor, build): (u32, u32, u32)) -> OsVersion {
        OsVersion::new(major, minor, build)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.major_version != 0 {
            write!(
                f,
                "{}.{}.{}",
                self.major_version(),
                self.minor_version(),
                self.build_number()
            )
        } else {
            write!(f, "{}", self.build_number())
        }
    }
}
