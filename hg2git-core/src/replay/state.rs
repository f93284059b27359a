use crate::destination::CommitId;
use graph::NULL_ID;
use std::collections::{BTreeMap, HashMap};

/// Where a replayed changeset landed in the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapped {
    pub commit: CommitId,
    pub branch: String,
}

/// Bookkeeping carried from one replay step to the next
#[derive(Debug, Clone)]
pub struct ReplayState {
    id_map: HashMap<String, Mapped>,
    last_id: String,
    last_branch: String,
    fork_counter: u32,
    /// Live destination branches and their tips
    branches: BTreeMap<String, CommitId>,
}

impl ReplayState {
    /// Fresh state before the first changeset, active on `main_branch`
    pub fn new(main_branch: &str) -> Self {
        Self {
            id_map: HashMap::new(),
            last_id: NULL_ID.to_string(),
            last_branch: main_branch.to_string(),
            fork_counter: 0,
            branches: BTreeMap::new(),
        }
    }

    /// Map the null revision onto the destination's empty root commit
    pub fn seed_root(&mut self, commit: impl Into<CommitId>) {
        let commit = commit.into();
        self.branches.insert(self.last_branch.clone(), commit.clone());
        self.id_map.insert(
            NULL_ID.to_string(),
            Mapped {
                commit,
                branch: self.last_branch.clone(),
            },
        );
    }

    pub fn lookup(&self, id: &str) -> Option<&Mapped> {
        self.id_map.get(id)
    }

    /// Record a materialized changeset; it becomes the tip of `branch`
    pub fn record(&mut self, id: &str, commit: &str, branch: &str) {
        self.id_map.insert(
            id.to_string(),
            Mapped {
                commit: commit.to_string(),
                branch: branch.to_string(),
            },
        );
        self.branches.insert(branch.to_string(), commit.to_string());
        self.last_id = id.to_string();
        self.last_branch = branch.to_string();
    }

    /// A fork branch was created at `at`
    pub fn start_branch(&mut self, name: &str, at: &str, counter: u32) {
        self.branches.insert(name.to_string(), at.to_string());
        self.fork_counter = counter;
    }

    pub fn drop_branch(&mut self, name: &str) {
        self.branches.remove(name);
    }

    /// Follow a destination rename, in the live branches and in every mapping
    pub fn rename_branch(&mut self, from: &str, to: &str) {
        if let Some(tip) = self.branches.remove(from) {
            self.branches.insert(to.to_string(), tip);
        }
        for mapped in self.id_map.values_mut().filter(|m| m.branch == from) {
            mapped.branch = to.to_string();
        }
        if self.last_branch == from {
            self.last_branch = to.to_string();
        }
    }

    pub fn last_id(&self) -> &str {
        &self.last_id
    }

    pub fn last_branch(&self) -> &str {
        &self.last_branch
    }

    pub fn fork_counter(&self) -> u32 {
        self.fork_counter
    }

    pub fn branch_tip(&self, name: &str) -> Option<&str> {
        self.branches.get(name).map(String::as_str)
    }

    /// Live branches, sorted by name
    pub fn branches(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.branches.iter().map(|(b, c)| (b.as_str(), c.as_str()))
    }

    /// Number of mapped changesets, the seeded null revision included
    pub fn mapped(&self) -> usize {
        self.id_map.len()
    }
}
