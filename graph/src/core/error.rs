use super::changeset::{ParentRef, Serial};

/// Errors raised while loading a changeset graph.
///
/// Unresolved and inconsistent parents are always fatal. Duplicates and
/// unusable records are handed to the caller's diagnostic policy first.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("{serial}:{id}: parent changeset {parent} not found")]
    UnresolvedParent {
        serial: Serial,
        id: String,
        parent: ParentRef,
    },

    #[error("{serial}:{id}: parent {parent} resolves to changeset {actual}")]
    ParentMismatch {
        serial: Serial,
        id: String,
        parent: ParentRef,
        actual: String,
    },

    #[error("{serial}:{id}: parent {parent} is not older than its child")]
    ParentOrder {
        serial: Serial,
        id: String,
        parent: ParentRef,
    },

    #[error("record {record}: no serial or changeset id, skipped")]
    MissingIdentity { record: usize },

    #[error("{serial}:{id}: negative serial, skipped")]
    NegativeSerial { serial: Serial, id: String },

    #[error("duplicate serial {serial}: {previous} replaced by {id}")]
    DuplicateSerial {
        serial: Serial,
        previous: String,
        id: String,
    },

    #[error("duplicate changeset id {id}: serial {previous} replaced by {serial}")]
    DuplicateId {
        id: String,
        previous: Serial,
        serial: Serial,
    },
}
