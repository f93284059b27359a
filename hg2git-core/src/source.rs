use crate::process::{ProcessError, ProcessRunner};
use graph::{read_changesets, restore_elided_parents, Changeset, ParseError, RawChangeset};
use std::path::Path;
use tracing::debug;

/// Paths a changeset touched, split the way the destination needs them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl FileChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Read access to the source working copy during replay
pub trait Source {
    /// Make the working copy match `changeset`, discarding local changes
    fn checkout(&mut self, changeset: &Changeset) -> Result<(), ProcessError>;

    /// Files added, modified or removed by `changeset`
    fn changes(&mut self, changeset: &Changeset) -> Result<FileChanges, ProcessError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Mercurial working copy driven through the `hg` executable
#[derive(Debug, Clone)]
pub struct HgSource {
    runner: ProcessRunner,
    hg: String,
}

impl HgSource {
    /// Drive the working copy at `dir` with the executable `hg`.
    ///
    /// Output is forced to plain, C-locale, UTF-8 form so the log parser sees
    /// the same layout on every machine.
    pub fn new(dir: &Path, hg: impl Into<String>) -> Self {
        Self {
            runner: Self::plain_runner().current_dir(dir),
            hg: hg.into(),
        }
    }

    fn plain_runner() -> ProcessRunner {
        ProcessRunner::new()
            .env("HGPLAIN", "1")
            .env("LANG", "C")
            .env("HGENCODING", "utf-8")
    }

    /// Clone `src` into `dst` and open the clone
    pub fn clone_into(src: &str, dst: &Path, hg: impl Into<String>) -> Result<Self, ProcessError> {
        let hg = hg.into();
        let dst_arg = dst.to_string_lossy().into_owned();
        Self::plain_runner().run(&hg, ["clone", "-q", "-U", src, dst_arg.as_str()])?;
        Ok(Self::new(dst, hg))
    }

    /// Read the whole history with `hg log -v`.
    ///
    /// Parent lines hg leaves out are restored before the records are returned.
    pub fn log<F>(&self, on_diagnostic: F) -> Result<Vec<RawChangeset>, LogError>
    where
        F: FnMut(ParseError) -> Result<(), ParseError>,
    {
        let mut records = self.runner.stream(
            &self.hg,
            ["log", "-v", "-r", "all()"],
            |reader| -> Result<_, LogError> { Ok(read_changesets(reader, on_diagnostic)?) },
        )?;
        restore_elided_parents(&mut records);
        debug!(records = records.len(), "read source log");
        Ok(records)
    }
}

impl Source for HgSource {
    fn checkout(&mut self, changeset: &Changeset) -> Result<(), ProcessError> {
        self.runner
            .run(&self.hg, ["update", "-q", "-C", "-r", changeset.id.as_str()])
    }

    fn changes(&mut self, changeset: &Changeset) -> Result<FileChanges, ProcessError> {
        let output = self
            .runner
            .quote(&self.hg, ["status", "--change", changeset.id.as_str()])?;
        Ok(parse_status(&output))
    }
}

/// Split `hg status` output into added and removed paths.
///
/// `R` lines are removals; every other status letter is something the
/// destination has to add.
pub fn parse_status(output: &str) -> FileChanges {
    let mut changes = FileChanges::default();
    for line in output.lines() {
        let Some((status, path)) = line.split_once(' ') else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        if status == "R" {
            changes.removed.push(path.to_string());
        } else {
            changes.added.push(path.to_string());
        }
    }
    changes
}
