use crate::author::Signature;
use crate::process::ProcessError;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Destination commit id, as printed by the destination tool
pub type CommitId = String;

/// Everything a destination commit carries besides its tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub message: String,
    pub author: Signature,
    pub date: Option<DateTime<FixedOffset>>,
}

/// The commit merged into the active branch, and the branch it was on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub branch: String,
    pub commit: CommitId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeOutcome {
    Merged,
    /// The merge stopped on conflicts; the working copy is left for the next checkout
    Conflicted,
}

/// Mutations the replay engine issues against the destination repository.
///
/// Every method acts on the single working directory of the destination and
/// sees the effects of the previous call.
pub trait Destination {
    /// Check out `at` onto a new branch `name`, which becomes active
    fn create_branch(&mut self, at: &str, name: &str) -> Result<(), ProcessError>;

    /// Merge `source` into the active branch without committing
    fn merge(&mut self, source: &MergeSource) -> Result<MergeOutcome, ProcessError>;

    /// Stop tracking paths removed by the changeset
    fn remove(&mut self, paths: &[String]) -> Result<(), ProcessError>;

    /// Track paths added or modified by the changeset
    fn add(&mut self, paths: &[String]) -> Result<(), ProcessError>;

    /// Commit the working copy on the active branch
    fn commit(&mut self, meta: &CommitMeta) -> Result<CommitId, ProcessError>;

    fn delete_branch(&mut self, name: &str) -> Result<(), ProcessError>;

    fn rename_branch(&mut self, from: &str, to: &str) -> Result<(), ProcessError>;

    /// Create a lightweight tag
    fn tag(&mut self, name: &str, commit: &str) -> Result<(), ProcessError>;

    /// Compact the repository storage
    fn compact(&mut self) -> Result<(), ProcessError>;
}
