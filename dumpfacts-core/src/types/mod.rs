/*!
Fact types shared by the kernel dump and minidump decoders.
*/

pub mod arch;
#[doc(hidden)]
pub use arch::Architecture;

pub mod exception;
#[doc(hidden)]
pub use exception::{AccessKind, ExceptionFacts};

pub mod module;
#[doc(hidden)]
pub use module::{dedup_modules, file_name, find_module, CodeViewInfo, Module, ModuleOrigin};

pub mod version;
#[doc(hidden)]
pub use version::OsVersion;
