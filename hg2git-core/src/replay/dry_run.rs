use crate::destination::{CommitId, CommitMeta, Destination, MergeOutcome, MergeSource};
use crate::process::ProcessError;
use crate::source::{FileChanges, Source};
use graph::Changeset;
use std::collections::HashSet;
use std::fmt;

/// Source that reports the files listed in the log as added.
///
/// The log does not say which files were removed, so nothing is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListedFilesSource;

impl Source for ListedFilesSource {
    fn checkout(&mut self, _changeset: &Changeset) -> Result<(), ProcessError> {
        Ok(())
    }

    fn changes(&mut self, changeset: &Changeset) -> Result<FileChanges, ProcessError> {
        Ok(FileChanges {
            added: changeset.files.clone(),
            removed: Vec::new(),
        })
    }
}

/// A destination call captured by [`RecordingDestination`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateBranch { at: CommitId, name: String },
    Merge { branch: String, commit: CommitId },
    Remove(Vec<String>),
    Add(Vec<String>),
    Commit { commit: CommitId, message: String },
    DeleteBranch(String),
    RenameBranch { from: String, to: String },
    Tag { name: String, commit: CommitId },
    Compact,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateBranch { at, name } => write!(f, "checkout -b {name} {at}"),
            Operation::Merge { branch, commit } => write!(f, "merge {commit} ({branch})"),
            Operation::Remove(paths) => write!(f, "rm {}", paths.join(" ")),
            Operation::Add(paths) => write!(f, "add {}", paths.join(" ")),
            Operation::Commit { commit, message } => {
                let subject = message.lines().next().unwrap_or_default();
                write!(f, "commit {commit} {subject:?}")
            }
            Operation::DeleteBranch(name) => write!(f, "branch -d {name}"),
            Operation::RenameBranch { from, to } => write!(f, "branch -m {from} {to}"),
            Operation::Tag { name, commit } => write!(f, "tag {name} {commit}"),
            Operation::Compact => write!(f, "gc"),
        }
    }
}

/// Destination that only records what it is asked to do.
///
/// Commits get sequential synthetic ids, so two replays of the same graph
/// record identical operations.
#[derive(Debug, Clone, Default)]
pub struct RecordingDestination {
    operations: Vec<Operation>,
    commits: u64,
    conflicts: HashSet<CommitId>,
}

impl RecordingDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id handed out for the `n`-th commit, counting from zero
    pub fn synthetic_id(n: u64) -> CommitId {
        format!("{n:012x}")
    }

    /// Record the empty root commit a real destination starts with
    pub fn init_root(&mut self) -> CommitId {
        self.next_commit("zero".to_string())
    }

    /// Report conflicts whenever `commit` is merged
    pub fn conflict_on(&mut self, commit: impl Into<CommitId>) {
        self.conflicts.insert(commit.into());
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn next_commit(&mut self, message: String) -> CommitId {
        let commit = Self::synthetic_id(self.commits);
        self.commits += 1;
        self.operations.push(Operation::Commit {
            commit: commit.clone(),
            message,
        });
        commit
    }
}

impl Destination for RecordingDestination {
    fn create_branch(&mut self, at: &str, name: &str) -> Result<(), ProcessError> {
        self.operations.push(Operation::CreateBranch {
            at: at.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn merge(&mut self, source: &MergeSource) -> Result<MergeOutcome, ProcessError> {
        self.operations.push(Operation::Merge {
            branch: source.branch.clone(),
            commit: source.commit.clone(),
        });
        if self.conflicts.contains(&source.commit) {
            Ok(MergeOutcome::Conflicted)
        } else {
            Ok(MergeOutcome::Merged)
        }
    }

    fn remove(&mut self, paths: &[String]) -> Result<(), ProcessError> {
        if !paths.is_empty() {
            self.operations.push(Operation::Remove(paths.to_vec()));
        }
        Ok(())
    }

    fn add(&mut self, paths: &[String]) -> Result<(), ProcessError> {
        if !paths.is_empty() {
            self.operations.push(Operation::Add(paths.to_vec()));
        }
        Ok(())
    }

    fn commit(&mut self, meta: &CommitMeta) -> Result<CommitId, ProcessError> {
        Ok(self.next_commit(meta.message.clone()))
    }

    fn delete_branch(&mut self, name: &str) -> Result<(), ProcessError> {
        self.operations.push(Operation::DeleteBranch(name.to_string()));
        Ok(())
    }

    fn rename_branch(&mut self, from: &str, to: &str) -> Result<(), ProcessError> {
        self.operations.push(Operation::RenameBranch {
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    fn tag(&mut self, name: &str, commit: &str) -> Result<(), ProcessError> {
        self.operations.push(Operation::Tag {
            name: name.to_string(),
            commit: commit.to_string(),
        });
        Ok(())
    }

    fn compact(&mut self) -> Result<(), ProcessError> {
        self.operations.push(Operation::Compact);
        Ok(())
    }
}
