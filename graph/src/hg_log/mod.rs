//! Reader for the verbose Mercurial log format (`hg log -v`).

pub mod error;
pub mod parser;

pub use error::ParseError;
pub use parser::{read_changesets, restore_elided_parents, DATE_FORMAT};
