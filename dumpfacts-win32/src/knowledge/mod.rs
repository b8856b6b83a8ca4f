/*!
Static knowledge about windows crashes.

All tables are immutable and lookups never fail: unknown codes map to placeholder names.
*/

pub mod bugcheck;
#[doc(hidden)]
pub use bugcheck::BugCheckFacts;

pub mod ntstatus;
#[doc(hidden)]
pub use ntstatus::{Severity, StatusFacts};

pub mod mce;
#[doc(hidden)]
pub use mce::{MachineCheckFacts, McaComponent, McaSeverity, WheaErrorSource, WheaFacts};

pub mod drivers;
#[doc(hidden)]
pub use drivers::{DriverCategory, DriverInfo};

pub mod vendors;
