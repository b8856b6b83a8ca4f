/*!
Module name validation and culprit ranking.
*/

pub mod validator;

pub mod scan;
#[doc(hidden)]
pub use scan::scan_module_names;

pub mod stack;
#[doc(hidden)]
pub use stack::stack_hits;

pub mod ranker;
#[doc(hidden)]
pub use ranker::{Confidence, DriverVerdict, Ranker, Reason};
