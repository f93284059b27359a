use chrono::{DateTime, FixedOffset};
use smallvec::SmallVec;
use std::fmt;

/// Creation-order revision number assigned by the source repository
pub type Serial = i64;

/// Serial of the null revision that parentless history hangs off
pub const NULL_SERIAL: Serial = -1;

/// Changeset id of the null revision, in short form
pub const NULL_ID: &str = "000000000000";

/// Reference from a changeset to one of its parents, as printed by `hg log`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub serial: Serial,
    /// Parent changeset id, when the log carries one
    pub id: Option<String>,
}

impl ParentRef {
    pub fn new(serial: Serial, id: Option<String>) -> Self {
        Self { serial, id }
    }

    pub fn is_null(&self) -> bool {
        self.serial == NULL_SERIAL
    }

    /// Check the carried id against a resolved changeset id.
    ///
    /// Short and full hashes are mixed freely in logs, so the shorter one only
    /// has to be a prefix of the longer one.
    pub fn matches(&self, id: &str) -> bool {
        match &self.id {
            Some(own) => own.starts_with(id) || id.starts_with(own.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.serial, id),
            None => write!(f, "{}", self.serial),
        }
    }
}

/// A changeset record as read from the log, before the graph resolves it.
///
/// Identity is optional: a record whose boundary line could not be parsed is
/// still emitted so that record counts follow boundary markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChangeset {
    pub serial: Option<Serial>,
    pub id: Option<String>,
    pub parent_refs: SmallVec<[ParentRef; 2]>,
    pub user: String,
    pub date: Option<DateTime<FixedOffset>>,
    pub tags: Vec<String>,
    pub files: Vec<String>,
    pub branch: Option<String>,
    pub description: String,
}

impl RawChangeset {
    pub fn new(serial: Serial, id: impl Into<String>) -> Self {
        Self {
            serial: Some(serial),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, serial: Serial, id: Option<&str>) -> Self {
        self.parent_refs
            .push(ParentRef::new(serial, id.map(str::to_string)));
        self
    }
}

/// A changeset in a loaded graph
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    pub serial: Serial,
    /// Content hash, as printed by the source
    pub id: String,
    /// Parent references exactly as read from the log
    pub parent_refs: SmallVec<[ParentRef; 2]>,
    /// Resolved parent serials, in `parent_refs` order; filled in by the graph
    pub parents: SmallVec<[Serial; 2]>,
    pub user: String,
    pub date: Option<DateTime<FixedOffset>>,
    pub tags: Vec<String>,
    pub files: Vec<String>,
    /// Named branch, when the source reports one other than its default
    pub branch: Option<String>,
    pub description: String,
}

impl Changeset {
    /// The sentinel that `-1:000000000000` parent references resolve to
    pub fn null() -> Self {
        Self {
            serial: NULL_SERIAL,
            id: NULL_ID.to_string(),
            parent_refs: SmallVec::new(),
            parents: SmallVec::new(),
            user: String::new(),
            date: None,
            tags: Vec::new(),
            files: Vec::new(),
            branch: None,
            description: String::new(),
        }
    }

    /// Promote a raw record; `None` when the record has no identity
    pub(crate) fn from_raw(raw: RawChangeset) -> Option<Self> {
        Some(Self {
            serial: raw.serial?,
            id: raw.id?,
            parent_refs: raw.parent_refs,
            parents: SmallVec::new(),
            user: raw.user,
            date: raw.date,
            tags: raw.tags,
            files: raw.files,
            branch: raw.branch,
            description: raw.description,
        })
    }

    pub fn is_null(&self) -> bool {
        self.serial == NULL_SERIAL
    }

    /// Check if this changeset starts a line of history (no real parents)
    pub fn is_root(&self) -> bool {
        self.parents.iter().all(|&p| p == NULL_SERIAL)
    }

    /// Check if this is a merge changeset (two parents)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.serial, self.id)
    }
}
