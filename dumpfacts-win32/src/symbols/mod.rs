/*!
Symbolization of module offsets.

A [`SymbolResolver`](resolver::SymbolResolver) answers `(module, offset)` queries from rich tables
(loaded pdb files or fetched from a [`SymbolSource`](source::SymbolSource)), a small built-in
kernel table, or the plain `module+0x<offset>` form.
*/

pub mod table;
#[doc(hidden)]
pub use table::{SymbolMatch, SymbolTable};

pub mod builtin;

pub mod source;
#[doc(hidden)]
pub use source::SymbolSource;
#[cfg(feature = "symstore")]
#[doc(hidden)]
pub use source::HttpSymbolSource;

pub mod resolver;
#[doc(hidden)]
pub use resolver::{FetchOutcome, SymbolResolver};

#[cfg(feature = "symstore")]
pub mod pdb;
#[cfg(feature = "symstore")]
#[doc(hidden)]
pub use self::pdb::PdbSymbols;

#[cfg(feature = "symstore")]
pub mod symstore;
#[cfg(feature = "symstore")]
#[doc(hidden)]
pub use symstore::SymbolStore;
