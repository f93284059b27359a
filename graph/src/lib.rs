pub mod core;
pub mod diagnostic;
pub mod hg_log;

pub use self::core::{
    Changeset, ChangesetGraph, Edge, EdgeType, GraphError, GraphStats, ParentRef, RawChangeset,
    Serial, NULL_ID, NULL_SERIAL,
};
pub use hg_log::{read_changesets, restore_elided_parents, ParseError, DATE_FORMAT};
