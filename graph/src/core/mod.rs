pub mod changeset;
pub mod edge;
pub mod error;
pub mod repository;

pub use changeset::{Changeset, ParentRef, RawChangeset, Serial, NULL_ID, NULL_SERIAL};
pub use edge::{Edge, EdgeType};
pub use error::GraphError;
pub use repository::{ChangesetGraph, GraphStats, SerialOrder};
