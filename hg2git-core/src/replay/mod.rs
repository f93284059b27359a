//! Replays a changeset graph into a destination repository.
//!
//! Changesets are visited in ascending serial order. Each step first decides
//! its topology with [`plan`], then drives the source and destination to
//! materialize it. The step outcome is recorded in [`ReplayState`].

mod dry_run;
mod plan;
mod state;

pub use dry_run::{ListedFilesSource, Operation, RecordingDestination};
pub use plan::{plan, Fork, StepPlan, Topology};
pub use state::{Mapped, ReplayState};

use crate::author::Signature;
use crate::config::MigrateConfig;
use crate::destination::{CommitId, CommitMeta, Destination, MergeOutcome, MergeSource};
use crate::process::ProcessError;
use crate::source::{FileChanges, Source};
use graph::{Changeset, ChangesetGraph, Serial};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Tag the source keeps on its newest changeset; never replayed
const TIP_TAG: &str = "tip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Add,
    Remove,
}

impl FileAction {
    fn apply<D>(self, dest: &mut D, paths: &[String]) -> Result<(), ProcessError>
    where
        D: Destination + ?Sized,
    {
        match self {
            FileAction::Add => dest.add(paths),
            FileAction::Remove => dest.remove(paths),
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAction::Add => write!(f, "add"),
            FileAction::Remove => write!(f, "remove"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("changeset {serial}:{id}: no destination commit for parent {parent}")]
    UnresolvedBranch {
        serial: Serial,
        id: String,
        parent: String,
    },

    #[error("changeset {serial}:{id}: {count} parents, at most two are supported")]
    TooManyParents {
        serial: Serial,
        id: String,
        count: usize,
    },

    #[error("changeset {serial}:{id}: cannot {action} {path}: {source}")]
    File {
        serial: Serial,
        id: String,
        action: FileAction,
        path: String,
        #[source]
        source: ProcessError,
    },

    #[error("cannot {action}: {source}")]
    Housekeeping {
        action: String,
        #[source]
        source: ProcessError,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Outcome of replaying one changeset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub serial: Serial,
    pub source_id: String,
    pub commit: CommitId,
    pub branch: String,
    pub topology: Topology,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<MergeOutcome>,
}

/// Summary of a whole replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub replayed: usize,
    /// Changesets left out because traversal stopped at a serial gap
    pub skipped: usize,
    pub forks: u32,
    pub merges: usize,
    pub conflicted_merges: usize,
    pub tags: usize,
    pub main_branch: String,
    /// Every replayed changeset in serial order
    pub mapping: Vec<StepRecord>,
}

impl ReplayReport {
    pub fn mapping_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.mapping)
    }

    fn rename_branch(&mut self, from: &str, to: &str) {
        for step in self.mapping.iter_mut().filter(|s| s.branch == from) {
            step.branch = to.to_string();
        }
    }
}

/// Drives one replay with a fixed configuration
#[derive(Debug, Clone)]
pub struct Replayer {
    config: MigrateConfig,
}

impl Replayer {
    pub fn new(config: MigrateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Replay every changeset reachable in serial order, then tag, put the
    /// last-touched branch on main and compact.
    ///
    /// Per-file and housekeeping problems go to `on_diagnostic`. Topology and
    /// tool failures end the replay.
    pub fn replay<S, D, F>(
        &self,
        state: &mut ReplayState,
        graph: &ChangesetGraph,
        source: &mut S,
        dest: &mut D,
        mut on_diagnostic: F,
    ) -> Result<ReplayReport, ReplayError>
    where
        S: Source + ?Sized,
        D: Destination + ?Sized,
        F: FnMut(ReplayError) -> Result<(), ReplayError>,
    {
        let forks_before = state.fork_counter();
        let mut report = ReplayReport {
            main_branch: self.config.main_branch.clone(),
            ..ReplayReport::default()
        };

        for cs in graph.iter() {
            let step = self.step(state, graph, cs, source, dest, &mut on_diagnostic)?;
            info!(
                changeset = %cs,
                branch = %step.branch,
                commit = %step.commit,
                "replayed"
            );
            if let Some(outcome) = step.merged {
                report.merges += 1;
                if outcome == MergeOutcome::Conflicted {
                    report.conflicted_merges += 1;
                }
            }
            report.mapping.push(step);
        }

        report.replayed = report.mapping.len();
        report.skipped = graph.len().saturating_sub(report.replayed);
        if report.skipped > 0 {
            warn!(
                skipped = report.skipped,
                "serials are not contiguous; history after the first gap was not replayed"
            );
        }
        report.forks = state.fork_counter() - forks_before;

        self.finish(state, graph, dest, &mut report, &mut on_diagnostic)?;
        Ok(report)
    }

    /// Replay one changeset on top of `state`
    pub fn step<S, D, F>(
        &self,
        state: &mut ReplayState,
        graph: &ChangesetGraph,
        cs: &Changeset,
        source: &mut S,
        dest: &mut D,
        on_diagnostic: &mut F,
    ) -> Result<StepRecord, ReplayError>
    where
        S: Source + ?Sized,
        D: Destination + ?Sized,
        F: FnMut(ReplayError) -> Result<(), ReplayError>,
    {
        let plan = plan(state, cs, graph, &self.config)?;
        debug!(changeset = %cs, topology = ?plan.topology, branch = %plan.branch, "planned");

        if let Some(fork) = &plan.fork {
            dest.create_branch(&fork.base, &fork.branch)?;
            state.start_branch(&fork.branch, &fork.base, fork.counter);
        }
        let merged = match &plan.merge {
            Some(merge) => Some(dest.merge(merge)?),
            None => None,
        };

        source.checkout(cs)?;
        let changes = source.changes(cs)?;
        self.stage(cs, &changes, dest, on_diagnostic)?;
        let commit = dest.commit(&self.commit_meta(cs))?;
        state.record(&cs.id, &commit, &plan.branch);

        if let Some(merge) = &plan.merge {
            self.retire_merged(state, merge, dest, on_diagnostic)?;
        }

        Ok(StepRecord {
            serial: cs.serial,
            source_id: cs.id.clone(),
            commit,
            branch: plan.branch,
            topology: plan.topology,
            merged,
        })
    }

    /// Apply removals then additions, retrying file by file when a batch fails
    fn stage<D, F>(
        &self,
        cs: &Changeset,
        changes: &FileChanges,
        dest: &mut D,
        on_diagnostic: &mut F,
    ) -> Result<(), ReplayError>
    where
        D: Destination + ?Sized,
        F: FnMut(ReplayError) -> Result<(), ReplayError>,
    {
        for (action, paths) in [
            (FileAction::Remove, &changes.removed),
            (FileAction::Add, &changes.added),
        ] {
            if paths.is_empty() || action.apply(dest, paths).is_ok() {
                continue;
            }
            for path in paths {
                if let Err(source) = action.apply(dest, std::slice::from_ref(path)) {
                    on_diagnostic(ReplayError::File {
                        serial: cs.serial,
                        id: cs.id.clone(),
                        action,
                        path: path.clone(),
                        source,
                    })?;
                }
            }
        }
        Ok(())
    }

    fn commit_meta(&self, cs: &Changeset) -> CommitMeta {
        let mut message = cs.description.clone();
        if self.config.source_id_trailer {
            if !message.is_empty() {
                message.push_str("\n\n");
            }
            message.push_str("HG: ");
            message.push_str(&cs.id);
        }
        CommitMeta {
            message,
            author: Signature::from_hg_user(&cs.user),
            date: cs.date,
        }
    }

    /// Delete a merged-in branch that has nothing left of its own
    fn retire_merged<D, F>(
        &self,
        state: &mut ReplayState,
        merge: &MergeSource,
        dest: &mut D,
        on_diagnostic: &mut F,
    ) -> Result<(), ReplayError>
    where
        D: Destination + ?Sized,
        F: FnMut(ReplayError) -> Result<(), ReplayError>,
    {
        if merge.branch == state.last_branch()
            || state.branch_tip(&merge.branch) != Some(merge.commit.as_str())
        {
            return Ok(());
        }
        match dest.delete_branch(&merge.branch) {
            Ok(()) => {
                debug!(branch = %merge.branch, "deleted merged branch");
                state.drop_branch(&merge.branch);
                Ok(())
            }
            Err(source) => on_diagnostic(ReplayError::Housekeeping {
                action: format!("delete branch {}", merge.branch),
                source,
            }),
        }
    }

    fn finish<D, F>(
        &self,
        state: &mut ReplayState,
        graph: &ChangesetGraph,
        dest: &mut D,
        report: &mut ReplayReport,
        on_diagnostic: &mut F,
    ) -> Result<(), ReplayError>
    where
        D: Destination + ?Sized,
        F: FnMut(ReplayError) -> Result<(), ReplayError>,
    {
        if self.config.tags {
            for (tag, cs) in graph.tags().filter(|(tag, _)| *tag != TIP_TAG) {
                let Some(mapped) = state.lookup(&cs.id) else {
                    warn!(tag, changeset = %cs, "tagged changeset was not replayed");
                    continue;
                };
                match dest.tag(tag, &mapped.commit) {
                    Ok(()) => report.tags += 1,
                    Err(source) => on_diagnostic(ReplayError::Housekeeping {
                        action: format!("tag {tag}"),
                        source,
                    })?,
                }
            }
        }

        self.swap_to_main(state, dest, report)?;

        if self.config.compact {
            dest.compact()?;
        }
        Ok(())
    }

    /// Rename branches so the active one ends up as the main branch
    fn swap_to_main<D>(
        &self,
        state: &mut ReplayState,
        dest: &mut D,
        report: &mut ReplayReport,
    ) -> Result<(), ReplayError>
    where
        D: Destination + ?Sized,
    {
        let main = self.config.main_branch.as_str();
        let active = state.last_branch().to_string();
        if active == main || state.branch_tip(&active).is_none() {
            return Ok(());
        }

        let mut renames = Vec::with_capacity(3);
        if state.branch_tip(main).is_some() {
            let parked = unused_branch_name(state, &format!("{main}-swap"));
            renames.push((main.to_string(), parked.clone()));
            renames.push((active.clone(), main.to_string()));
            renames.push((parked, active));
        } else {
            renames.push((active, main.to_string()));
        }

        for (from, to) in renames {
            dest.rename_branch(&from, &to)?;
            state.rename_branch(&from, &to);
            report.rename_branch(&from, &to);
        }
        info!(branch = main, "moved last replayed branch to main");
        Ok(())
    }
}

fn unused_branch_name(state: &ReplayState, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while state.branch_tip(&name).is_some() {
        n += 1;
        name = format!("{base}{n}");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::{diagnostic, RawChangeset, NULL_ID};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn id(serial: i64) -> String {
        format!("{:012x}", 0xbeef_0000 + serial)
    }

    fn raw(serial: i64, parents: &[i64]) -> RawChangeset {
        let mut raw = parents
            .iter()
            .fold(RawChangeset::new(serial, id(serial)), |raw, &p| {
                let parent_id = if p < 0 { NULL_ID.to_string() } else { id(p) };
                raw.with_parent(p, Some(&parent_id))
            });
        raw.user = "HAYAMA_Kaoru <iyahaya@nifty.com>".to_string();
        raw.description = format!("change {serial}");
        raw.files = vec![format!("file{serial}.txt")];
        raw
    }

    fn linear(count: i64) -> ChangesetGraph {
        let records = (0..count).map(|s| if s == 0 { raw(0, &[]) } else { raw(s, &[s - 1]) });
        ChangesetGraph::load(records).unwrap()
    }

    /// 0 <- 1 <- 2 <- 3 <- 4, 2 <- 5 (fork), 6 merges 4 and 5, 7 follows 6
    fn branchy() -> ChangesetGraph {
        ChangesetGraph::load(vec![
            raw(0, &[]),
            raw(1, &[0]),
            raw(2, &[1]),
            raw(3, &[2]),
            raw(4, &[3]),
            raw(5, &[2]),
            raw(6, &[4, 5]),
            raw(7, &[6]),
        ])
        .unwrap()
    }

    fn replay(
        graph: &ChangesetGraph,
        config: MigrateConfig,
    ) -> (ReplayReport, RecordingDestination, ReplayState) {
        let mut dest = RecordingDestination::new();
        let mut state = ReplayState::new(&config.main_branch);
        if config.empty_root {
            state.seed_root(dest.init_root());
        }
        let report = Replayer::new(config)
            .replay(&mut state, graph, &mut ListedFilesSource, &mut dest, diagnostic::warn)
            .unwrap();
        (report, dest, state)
    }

    fn count(dest: &RecordingDestination, pred: impl Fn(&Operation) -> bool) -> usize {
        dest.operations().iter().filter(|op| pred(op)).count()
    }

    #[test]
    fn test_linear_history_stays_on_one_branch() {
        let graph = linear(5);
        let (report, dest, _) = replay(&graph, MigrateConfig::default());

        assert_eq!(report.replayed, 5);
        assert_eq!(report.forks, 0);
        assert_eq!(report.merges, 0);
        assert!(report.mapping.iter().all(|s| s.branch == "master"));
        // the seeded root plus one commit per changeset
        assert_eq!(count(&dest, |op| matches!(op, Operation::Commit { .. })), 6);
        assert_eq!(count(&dest, |op| matches!(op, Operation::CreateBranch { .. })), 0);
        assert_eq!(count(&dest, |op| matches!(op, Operation::Merge { .. })), 0);
    }

    #[test]
    fn test_merge_of_known_parent_into_current_branch() {
        // 5 merges 3 into 4, with 4 replayed last
        let graph = ChangesetGraph::load(vec![
            raw(0, &[]),
            raw(1, &[0]),
            raw(2, &[1]),
            raw(3, &[2]),
            raw(4, &[2]),
            raw(5, &[3, 4]),
        ])
        .unwrap();
        let (report, dest, _) = replay(&graph, MigrateConfig::default());

        let step4 = &report.mapping[4];
        let step5 = &report.mapping[5];
        assert_eq!(step5.topology, Topology::Symmetric);
        assert_eq!(step5.merged, Some(MergeOutcome::Merged));
        assert_eq!(report.merges, 1);
        // the fork for 4 is the only branch ever created
        assert_eq!(report.forks, 1);

        let ops = dest.operations();
        let merge_at = ops
            .iter()
            .position(|op| matches!(op, Operation::Merge { .. }))
            .unwrap();
        assert_eq!(
            ops[merge_at],
            Operation::Merge {
                branch: "master".to_string(),
                commit: report.mapping[3].commit.clone(),
            }
        );
        assert!(matches!(ops[merge_at + 2], Operation::Commit { .. }));
        assert_eq!(step5.branch, step4.branch);
    }

    #[test]
    fn test_fork_creates_exactly_one_branch() {
        // 6 hangs off 2 while 5 was replayed last
        let graph = ChangesetGraph::load(vec![
            raw(0, &[]),
            raw(1, &[0]),
            raw(2, &[1]),
            raw(3, &[2]),
            raw(4, &[3]),
            raw(5, &[4]),
            raw(6, &[2]),
        ])
        .unwrap();
        let (report, dest, _) = replay(&graph, MigrateConfig::default());

        assert_eq!(report.forks, 1);
        let step6 = &report.mapping[6];
        assert_eq!(step6.topology, Topology::Fork);

        let ops = dest.operations();
        let create_at = ops
            .iter()
            .position(|op| matches!(op, Operation::CreateBranch { .. }))
            .unwrap();
        assert_eq!(
            ops[create_at],
            Operation::CreateBranch {
                at: report.mapping[2].commit.clone(),
                name: "fork0001".to_string(),
            }
        );
        let commit_at = ops
            .iter()
            .rposition(|op| matches!(op, Operation::Commit { .. }))
            .unwrap();
        assert!(create_at < commit_at);
    }

    #[test]
    fn test_fork_then_merge_operation_order() {
        // 5 merges 3 and 2 while 4 was replayed last
        let graph = ChangesetGraph::load(vec![
            raw(0, &[]),
            raw(1, &[0]),
            raw(2, &[1]),
            raw(3, &[1]),
            raw(4, &[2]),
            raw(5, &[3, 2]),
        ])
        .unwrap();
        let (report, dest, state) = replay(&graph, MigrateConfig::default());

        let step5 = &report.mapping[5];
        assert_eq!(step5.topology, Topology::Fork);
        assert_eq!(step5.merged, Some(MergeOutcome::Merged));
        assert_eq!(report.forks, 3);
        assert_eq!(report.merges, 1);

        let ops = dest.operations();
        let start = ops
            .iter()
            .position(|op| matches!(op, Operation::CreateBranch { name, .. } if name == "fork0003"))
            .unwrap();
        assert_eq!(
            ops[start..start + 5].to_vec(),
            vec![
                Operation::CreateBranch {
                    at: report.mapping[3].commit.clone(),
                    name: "fork0003".to_string(),
                },
                Operation::Merge {
                    branch: "master".to_string(),
                    commit: report.mapping[2].commit.clone(),
                },
                Operation::Add(vec!["file5.txt".to_string()]),
                Operation::Commit {
                    commit: step5.commit.clone(),
                    message: format!("change 5\n\nHG: {}", id(5)),
                },
                Operation::DeleteBranch("master".to_string()),
            ]
        );

        // master was merged away, so fork0003 simply takes its name
        assert_eq!(state.last_branch(), "master");
        assert_eq!(state.branch_tip("master"), Some(step5.commit.as_str()));
    }

    #[test]
    fn test_final_swap_puts_last_branch_on_main() {
        let graph = ChangesetGraph::load(vec![
            raw(0, &[]),
            raw(1, &[0]),
            raw(2, &[0]),
        ])
        .unwrap();
        let (report, dest, state) = replay(&graph, MigrateConfig::default());

        assert_eq!(state.last_branch(), "master");
        assert_eq!(state.branch_tip("master"), Some(report.mapping[2].commit.as_str()));
        assert_eq!(state.branch_tip("fork0001"), Some(report.mapping[1].commit.as_str()));
        assert_eq!(report.mapping[2].branch, "master");
        assert_eq!(report.mapping[1].branch, "fork0001");

        let renames: Vec<_> = dest
            .operations()
            .iter()
            .filter(|op| matches!(op, Operation::RenameBranch { .. }))
            .map(|op| op.to_string())
            .collect();
        assert_eq!(
            renames,
            vec![
                "branch -m master master-swap",
                "branch -m fork0001 master",
                "branch -m master-swap fork0001",
            ]
        );
        assert_eq!(dest.operations().last(), Some(&Operation::Compact));
    }

    #[test]
    fn test_merged_branch_is_deleted_and_main_reclaimed() {
        let graph = branchy();
        let (report, dest, state) = replay(&graph, MigrateConfig::default());

        // 6 continues on fork0001 and merges master, whose tip is 4
        assert_eq!(report.mapping[6].topology, Topology::Symmetric);
        assert!(dest
            .operations()
            .contains(&Operation::DeleteBranch("master".to_string())));

        // master was gone, so the active branch is simply renamed
        assert_eq!(state.last_branch(), "master");
        assert_eq!(state.branches().count(), 1);
        assert!(report.mapping[5..].iter().all(|s| s.branch == "master"));
    }

    #[test]
    fn test_null_parent_forks_from_seeded_root() {
        let graph = ChangesetGraph::load(vec![raw(0, &[]), raw(1, &[0]), raw(2, &[-1])]).unwrap();
        let (report, dest, _) = replay(&graph, MigrateConfig::default());

        let root = match &dest.operations()[0] {
            Operation::Commit { commit, .. } => commit.clone(),
            other => panic!("expected the root commit first, got {other}"),
        };
        assert!(dest.operations().contains(&Operation::CreateBranch {
            at: root,
            name: "fork0001".to_string(),
        }));
        assert_eq!(report.mapping[2].topology, Topology::Fork);
    }

    #[test]
    fn test_null_parent_without_root_is_unresolved() {
        let graph = ChangesetGraph::load(vec![raw(0, &[]), raw(1, &[-1])]).unwrap();
        let config = MigrateConfig {
            empty_root: false,
            ..MigrateConfig::default()
        };
        let mut state = ReplayState::new(&config.main_branch);
        let err = Replayer::new(config)
            .replay(
                &mut state,
                &graph,
                &mut ListedFilesSource,
                &mut RecordingDestination::new(),
                diagnostic::warn,
            )
            .unwrap_err();
        assert!(matches!(err, ReplayError::UnresolvedBranch { serial: 1, .. }));
    }

    #[test]
    fn test_replays_are_identical() {
        let graph = branchy();
        let (first, first_dest, _) = replay(&graph, MigrateConfig::default());
        let (second, second_dest, _) = replay(&graph, MigrateConfig::default());
        assert_eq!(first, second);
        assert_eq!(first_dest.operations(), second_dest.operations());
    }

    #[test]
    fn test_commit_message_carries_source_id() {
        let graph = linear(1);
        let (_, dest, _) = replay(&graph, MigrateConfig::default());
        let messages: Vec<_> = dest
            .operations()
            .iter()
            .filter_map(|op| match op {
                Operation::Commit { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["zero".to_string(), format!("change 0\n\nHG: {}", id(0))]);

        let config = MigrateConfig {
            source_id_trailer: false,
            empty_root: false,
            ..MigrateConfig::default()
        };
        let (_, dest, _) = replay(&graph, config);
        assert!(dest
            .operations()
            .iter()
            .any(|op| matches!(op, Operation::Commit { message, .. } if message == "change 0")));
    }

    #[test]
    fn test_tags_skip_tip() {
        let mut records: Vec<_> = (0..3)
            .map(|s| if s == 0 { raw(0, &[]) } else { raw(s, &[s - 1]) })
            .collect();
        records[1].tags = vec!["v1.0".to_string()];
        records[2].tags = vec!["tip".to_string()];
        let graph = ChangesetGraph::load(records).unwrap();
        let (report, dest, _) = replay(&graph, MigrateConfig::default());

        assert_eq!(report.tags, 1);
        assert!(dest.operations().contains(&Operation::Tag {
            name: "v1.0".to_string(),
            commit: report.mapping[1].commit.clone(),
        }));

        let config = MigrateConfig {
            tags: false,
            compact: false,
            ..MigrateConfig::default()
        };
        let (report, dest, _) = replay(&graph, config);
        assert_eq!(report.tags, 0);
        assert_eq!(count(&dest, |op| matches!(op, Operation::Tag { .. } | Operation::Compact)), 0);
    }

    #[test]
    fn test_gap_stops_traversal() {
        let graph = ChangesetGraph::load(vec![raw(0, &[]), raw(1, &[0]), raw(3, &[1])]).unwrap();
        let (report, _, _) = replay(&graph, MigrateConfig::default());
        assert_eq!(report.replayed, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_mapping_json() {
        let graph = linear(1);
        let (report, _, _) = replay(&graph, MigrateConfig::default());
        let json: serde_json::Value =
            serde_json::from_str(&report.mapping_json().unwrap()).unwrap();
        assert_eq!(json[0]["serial"], 0);
        assert_eq!(json[0]["source_id"], id(0));
        assert_eq!(json[0]["topology"], "root");
        assert!(json[0].get("merged").is_none());
    }

    /// Recording destination that refuses to stage some paths
    struct PickyDestination {
        inner: RecordingDestination,
        refused: HashSet<String>,
    }

    impl PickyDestination {
        fn check(&self, paths: &[String]) -> Result<(), ProcessError> {
            match paths.iter().find(|p| self.refused.contains(*p)) {
                Some(path) => Err(ProcessError::Exit {
                    command: format!("git add -- {path}"),
                    code: Some(128),
                }),
                None => Ok(()),
            }
        }
    }

    impl Destination for PickyDestination {
        fn create_branch(&mut self, at: &str, name: &str) -> Result<(), ProcessError> {
            self.inner.create_branch(at, name)
        }
        fn merge(&mut self, source: &MergeSource) -> Result<MergeOutcome, ProcessError> {
            self.inner.merge(source)
        }
        fn remove(&mut self, paths: &[String]) -> Result<(), ProcessError> {
            self.check(paths)?;
            self.inner.remove(paths)
        }
        fn add(&mut self, paths: &[String]) -> Result<(), ProcessError> {
            self.check(paths)?;
            self.inner.add(paths)
        }
        fn commit(&mut self, meta: &CommitMeta) -> Result<CommitId, ProcessError> {
            self.inner.commit(meta)
        }
        fn delete_branch(&mut self, name: &str) -> Result<(), ProcessError> {
            self.inner.delete_branch(name)
        }
        fn rename_branch(&mut self, from: &str, to: &str) -> Result<(), ProcessError> {
            self.inner.rename_branch(from, to)
        }
        fn tag(&mut self, name: &str, commit: &str) -> Result<(), ProcessError> {
            self.inner.tag(name, commit)
        }
        fn compact(&mut self) -> Result<(), ProcessError> {
            self.inner.compact()
        }
    }

    #[test]
    fn test_failed_file_is_a_diagnostic() {
        let mut records = vec![raw(0, &[])];
        records[0].files = vec!["good.txt".to_string(), "bad.txt".to_string()];
        let graph = ChangesetGraph::load(records).unwrap();

        let mut dest = PickyDestination {
            inner: RecordingDestination::new(),
            refused: HashSet::from(["bad.txt".to_string()]),
        };
        let mut state = ReplayState::new("master");
        let mut reported = Vec::new();
        let report = Replayer::new(MigrateConfig::default())
            .replay(&mut state, &graph, &mut ListedFilesSource, &mut dest, |err| {
                reported.push(err.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(report.replayed, 1);
        assert_eq!(reported.len(), 1);
        assert!(reported[0].starts_with(&format!("changeset 0:{}: cannot add bad.txt", id(0))));
        assert!(dest
            .inner
            .operations()
            .contains(&Operation::Add(vec!["good.txt".to_string()])));

        let mut state = ReplayState::new("master");
        let err = Replayer::new(MigrateConfig::default())
            .replay(
                &mut state,
                &graph,
                &mut ListedFilesSource,
                &mut dest,
                diagnostic::abort,
            )
            .unwrap_err();
        assert!(matches!(err, ReplayError::File { action: FileAction::Add, .. }));
    }

    #[test]
    fn test_conflicted_merge_continues() {
        let graph = branchy();
        let mut dest = RecordingDestination::new();
        let mut state = ReplayState::new("master");
        state.seed_root(dest.init_root());

        let replayer = Replayer::new(MigrateConfig::default());
        // commit ids are handed out in order, so 4 is the fifth after the root
        dest.conflict_on(RecordingDestination::synthetic_id(5));
        let report = replayer
            .replay(&mut state, &graph, &mut ListedFilesSource, &mut dest, diagnostic::warn)
            .unwrap();

        assert_eq!(report.mapping[4].commit, RecordingDestination::synthetic_id(5));
        assert_eq!(report.mapping[6].merged, Some(MergeOutcome::Conflicted));
        assert_eq!(report.conflicted_merges, 1);
        assert_eq!(report.replayed, 8);
    }
}
