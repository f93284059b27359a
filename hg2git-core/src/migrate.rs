use crate::config::{ConfigError, MigrateConfig};
use crate::git::GitDestination;
use crate::process::ProcessError;
use crate::replay::{
    ListedFilesSource, RecordingDestination, ReplayError, ReplayReport, ReplayState, Replayer,
};
use crate::source::{HgSource, LogError};
use graph::{
    diagnostic, read_changesets, restore_elided_parents, ChangesetGraph, GraphError, ParseError,
    RawChangeset,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("{}: destination already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("source repository has no changesets")]
    EmptySource,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read source log: {0}")]
    Log(#[from] LogError),

    #[error("failed to parse source log: {0}")]
    Parse(#[from] ParseError),

    #[error("inconsistent source history: {0}")]
    Graph(#[from] GraphError),

    #[error("replay failed: {0}")]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// End-to-end conversion of one Mercurial repository into a new Git repository
#[derive(Debug, Clone)]
pub struct Migration {
    config: MigrateConfig,
}

impl Migration {
    pub fn new(config: MigrateConfig) -> Result<Self, MigrateError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    /// Read and load the history of a Mercurial working copy
    pub fn load_graph(&self, source: &HgSource) -> Result<ChangesetGraph, MigrateError> {
        let records = source.log(diagnostic::policy(self.config.strict))?;
        self.build_graph(records)
    }

    /// Load a history from saved `hg log -v` output
    pub fn load_graph_from_reader<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<ChangesetGraph, MigrateError> {
        let mut records = read_changesets(reader, diagnostic::policy(self.config.strict))?;
        restore_elided_parents(&mut records);
        self.build_graph(records)
    }

    fn build_graph(&self, records: Vec<RawChangeset>) -> Result<ChangesetGraph, MigrateError> {
        let graph = ChangesetGraph::load_with(records, diagnostic::policy(self.config.strict))?;
        if graph.is_empty() {
            return Err(MigrateError::EmptySource);
        }
        Ok(graph)
    }

    /// Replay `graph` without touching any repository
    pub fn dry_run(
        &self,
        graph: &ChangesetGraph,
    ) -> Result<(ReplayReport, RecordingDestination), MigrateError> {
        let mut dest = RecordingDestination::new();
        let mut state = ReplayState::new(&self.config.main_branch);
        if self.config.empty_root {
            state.seed_root(dest.init_root());
        }
        let report = Replayer::new(self.config.clone()).replay(
            &mut state,
            graph,
            &mut ListedFilesSource,
            &mut dest,
            diagnostic::policy(self.config.strict_files),
        )?;
        Ok((report, dest))
    }

    /// Clone `src` into `dst` and turn the clone into a Git repository.
    ///
    /// The Mercurial clone and the Git repository share `dst`; Git only ever
    /// tracks the files the replay adds.
    pub fn convert(&self, src: &str, dst: &Path) -> Result<ReplayReport, MigrateError> {
        if dst.exists() {
            return Err(MigrateError::DestinationExists(dst.to_path_buf()));
        }

        let mut source = HgSource::clone_into(src, dst, self.config.hg.as_str())?;
        let graph = self.load_graph(&source)?;
        let stats = graph.stats();
        info!(
            changesets = stats.total_changesets,
            merges = stats.merge_changesets,
            tags = stats.tags,
            "loaded source history"
        );

        let mut dest = GitDestination::new(dst, self.config.git.as_str());
        let root = dest.init(&self.config.main_branch, self.config.empty_root)?;
        let mut state = ReplayState::new(&self.config.main_branch);
        if let Some(root) = root {
            state.seed_root(root);
        }

        let report = Replayer::new(self.config.clone()).replay(
            &mut state,
            &graph,
            &mut source,
            &mut dest,
            diagnostic::policy(self.config.strict_files),
        )?;
        info!(
            replayed = report.replayed,
            forks = report.forks,
            merges = report.merges,
            "conversion finished"
        );
        Ok(report)
    }
}
