/*!
This crate contains the windows specific interpretation of crash dumps decoded by
`dumpfacts-core`.

It provides static knowledge bases (stop codes, NTSTATUS values, machine check decoding and a
catalog of drivers known to cause crashes), a validator and ranker that point at the module most
likely responsible for a crash, and a symbol resolver for module offsets.

The [`analysis::Analyzer`] combines all of them:

```
use dumpfacts_core::dummy::MinidumpBuilder;
use dumpfacts_win32::prelude::*;

let bytes = MinidumpBuilder::new()
    .module("a.sys", 0x1000, 0x2000)
    .module("b.sys", 0x4000, 0x1000)
    .exception(1, 0xc000_0005, 0x1500, &[0, 0])
    .build();

let result = analyze(bytes).unwrap();
let culprit = result.culprit().unwrap();
assert_eq!(culprit.module, "a.sys");
assert_eq!(culprit.confidence, Confidence::High);
```
*/

pub mod error;

pub mod knowledge;

pub mod culprit;

pub mod symbols;

pub mod args;

pub mod analysis;

pub mod prelude {
    pub mod v1 {
        pub use crate::analysis::*;
        pub use crate::args::*;
        pub use crate::culprit::*;
        pub use crate::error::*;
        pub use crate::knowledge::*;
        pub use crate::symbols::*;
    }
    pub use v1::*;
}
