//! Rule file loader.
//!
//! Reads one rule file (JSON or YAML), validates every record and produces a
//! [`RuleSet`]. Loading is all-or-nothing per file: one bad record fails the
//! whole file. A missing file is a valid, empty contribution.

mod core;
mod error;
mod records;
mod suggest;


pub use self::core::{load, RuleFormat, RuleSet};
pub use self::error::{LoadError, LoadErrorKind, Result, RuleError};
pub use self::records::RecordError;
