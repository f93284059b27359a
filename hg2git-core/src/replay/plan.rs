use super::state::ReplayState;
use super::ReplayError;
use crate::config::MigrateConfig;
use crate::destination::{CommitId, MergeSource};
use graph::{Changeset, ChangesetGraph};
use serde::Serialize;
use smallvec::SmallVec;

/// How a changeset relates to the one replayed before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// No parents; committed on the active branch
    Root,
    /// First parent is the previous changeset
    Linear,
    /// Second parent is the previous changeset
    Symmetric,
    /// Neither parent is the previous changeset; a new branch is needed
    Fork,
}

/// A branch to create before committing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    pub branch: String,
    pub base: CommitId,
    pub counter: u32,
}

/// What one replay step will do, decided before touching the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub topology: Topology,
    /// Branch the commit lands on
    pub branch: String,
    pub fork: Option<Fork>,
    pub merge: Option<MergeSource>,
}

/// Decide the topology of replaying `cs` after everything in `state`.
///
/// Pure: neither the state nor any repository is touched.
pub fn plan(
    state: &ReplayState,
    cs: &Changeset,
    graph: &ChangesetGraph,
    config: &MigrateConfig,
) -> Result<StepPlan, ReplayError> {
    let parents: SmallVec<[&Changeset; 2]> = graph.parents(cs).collect();
    if parents.len() > 2 {
        return Err(ReplayError::TooManyParents {
            serial: cs.serial,
            id: cs.id.clone(),
            count: parents.len(),
        });
    }

    let Some(&first) = parents.first() else {
        return Ok(StepPlan {
            topology: Topology::Root,
            branch: state.last_branch().to_string(),
            fork: None,
            merge: None,
        });
    };
    let second = parents.get(1).copied();

    let (topology, other) = if first.id == state.last_id() {
        (Topology::Linear, second)
    } else if second.is_some_and(|p| p.id == state.last_id()) {
        (Topology::Symmetric, Some(first))
    } else {
        (Topology::Fork, second)
    };

    let fork = if topology == Topology::Fork {
        let base = mapped_commit(state, cs, first)?;
        let counter = state.fork_counter() + 1;
        Some(Fork {
            branch: config.fork_branch_name(counter),
            base: base.commit,
            counter,
        })
    } else {
        None
    };

    let merge = other.map(|p| mapped_commit(state, cs, p)).transpose()?;

    let branch = match &fork {
        Some(fork) => fork.branch.clone(),
        None => state.last_branch().to_string(),
    };

    Ok(StepPlan {
        topology,
        branch,
        fork,
        merge,
    })
}

fn mapped_commit(
    state: &ReplayState,
    cs: &Changeset,
    parent: &Changeset,
) -> Result<MergeSource, ReplayError> {
    state
        .lookup(&parent.id)
        .map(|m| MergeSource {
            branch: m.branch.clone(),
            commit: m.commit.clone(),
        })
        .ok_or_else(|| ReplayError::UnresolvedBranch {
            serial: cs.serial,
            id: cs.id.clone(),
            parent: parent.to_string(),
        })
}
