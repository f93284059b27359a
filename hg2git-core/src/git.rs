use crate::destination::{CommitId, CommitMeta, Destination, MergeOutcome, MergeSource};
use crate::process::{ProcessError, ProcessRunner};
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use tracing::warn;

/// Stamp for commits without a usable source date, so replays stay repeatable
pub const FALLBACK_DATE: &str = "@0 +0000";

/// Git repository driven through the `git` executable
#[derive(Debug, Clone)]
pub struct GitDestination {
    runner: ProcessRunner,
    git: String,
}

impl GitDestination {
    /// Drive the repository at `dir`, which must already exist
    pub fn new(dir: &Path, git: impl Into<String>) -> Self {
        Self {
            runner: ProcessRunner::new().current_dir(dir),
            git: git.into(),
        }
    }

    /// Create a repository with HEAD on `main_branch`.
    ///
    /// With `empty_root` an empty commit is made so that unrelated lines of
    /// history have something to branch from; its id is returned.
    pub fn init(
        &mut self,
        main_branch: &str,
        empty_root: bool,
    ) -> Result<Option<CommitId>, ProcessError> {
        let head = format!("refs/heads/{main_branch}");
        self.git(["init", "-q"])?;
        self.git(["symbolic-ref", "HEAD", head.as_str()])?;
        self.git(["config", "core.autocrlf", "false"])?;
        if !empty_root {
            return Ok(None);
        }

        self.runner
            .clone()
            .env("GIT_AUTHOR_DATE", FALLBACK_DATE)
            .env("GIT_COMMITTER_DATE", FALLBACK_DATE)
            .run(
                &self.git,
                [
                    "-c",
                    "user.name=hg2git",
                    "-c",
                    "user.email=hg2git@localhost",
                    "commit",
                    "-q",
                    "--allow-empty",
                    "-m",
                    "zero",
                ],
            )?;
        self.head().map(Some)
    }

    /// Id of the commit HEAD points at
    pub fn head(&self) -> Result<CommitId, ProcessError> {
        self.runner.quote(&self.git, ["rev-parse", "HEAD"])
    }

    fn git<const N: usize>(&self, args: [&str; N]) -> Result<(), ProcessError> {
        self.runner.run(&self.git, args)
    }

    fn git_with_paths(&self, args: &[&str], paths: &[String]) -> Result<(), ProcessError> {
        if paths.is_empty() {
            return Ok(());
        }
        let args = args
            .iter()
            .map(|a| a.to_string())
            .chain(std::iter::once("--".to_string()))
            .chain(paths.iter().cloned());
        self.runner.run(&self.git, args)
    }
}

impl Destination for GitDestination {
    fn create_branch(&mut self, at: &str, name: &str) -> Result<(), ProcessError> {
        self.git(["checkout", "-q", "-f", at])?;
        self.git(["checkout", "-q", "-b", name])
    }

    fn merge(&mut self, source: &MergeSource) -> Result<MergeOutcome, ProcessError> {
        let result = self.git([
            "merge",
            "-q",
            "--no-commit",
            "--no-ff",
            "--no-edit",
            source.commit.as_str(),
        ]);
        let outcome = merge_outcome(result)?;
        if outcome == MergeOutcome::Conflicted {
            warn!(branch = %source.branch, commit = %source.commit, "merge stopped on conflicts");
        }
        Ok(outcome)
    }

    fn remove(&mut self, paths: &[String]) -> Result<(), ProcessError> {
        self.git_with_paths(&["rm", "-q", "-r", "--cached", "--ignore-unmatch"], paths)
    }

    fn add(&mut self, paths: &[String]) -> Result<(), ProcessError> {
        self.git_with_paths(&["add", "-f"], paths)
    }

    fn commit(&mut self, meta: &CommitMeta) -> Result<CommitId, ProcessError> {
        let author = meta.author.to_string();
        let mut args = vec![
            "commit".to_string(),
            "-q".to_string(),
            "-a".to_string(),
            "--allow-empty".to_string(),
            "--allow-empty-message".to_string(),
            "-m".to_string(),
            meta.message.clone(),
            format!("--author={author}"),
        ];

        let date = match &meta.date {
            Some(date) => git_date(date),
            None => {
                warn!(author = %author, "commit has no source date, using the epoch");
                FALLBACK_DATE.to_string()
            }
        };
        args.push(format!("--date={date}"));

        self.runner
            .clone()
            .env("GIT_COMMITTER_NAME", meta.author.name.as_str())
            .env("GIT_COMMITTER_EMAIL", meta.author.email.as_str())
            .env("GIT_COMMITTER_DATE", date)
            .run(&self.git, args)?;
        self.head()
    }

    fn delete_branch(&mut self, name: &str) -> Result<(), ProcessError> {
        self.git(["branch", "-q", "-d", name])
    }

    fn rename_branch(&mut self, from: &str, to: &str) -> Result<(), ProcessError> {
        self.git(["branch", "-m", from, to])
    }

    fn tag(&mut self, name: &str, commit: &str) -> Result<(), ProcessError> {
        self.git(["tag", name, commit])
    }

    fn compact(&mut self) -> Result<(), ProcessError> {
        self.git(["gc", "-q"])
    }
}

/// `git merge` exits with 1 when it stops on conflicts; anything else is fatal
pub fn merge_outcome(result: Result<(), ProcessError>) -> Result<MergeOutcome, ProcessError> {
    match result {
        Ok(()) => Ok(MergeOutcome::Merged),
        Err(err) if err.exit_code() == Some(1) => Ok(MergeOutcome::Conflicted),
        Err(err) => Err(err),
    }
}

/// Git's internal date format, which keeps the source's UTC offset
pub fn git_date(date: &DateTime<FixedOffset>) -> String {
    format!("@{} {}", date.timestamp(), date.format("%z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::Signature;

    #[test]
    fn test_git_date_keeps_offset() {
        let date = DateTime::parse_from_str("Wed Jan 04 14:26:31 2012 +0900", graph::DATE_FORMAT)
            .unwrap();
        assert_eq!(git_date(&date), "@1325654791 +0900");
    }

    #[test]
    fn test_merge_outcome() {
        assert_eq!(merge_outcome(Ok(())).unwrap(), MergeOutcome::Merged);

        let conflict = ProcessError::Exit {
            command: "git merge".to_string(),
            code: Some(1),
        };
        assert_eq!(merge_outcome(Err(conflict)).unwrap(), MergeOutcome::Conflicted);

        let broken = ProcessError::Exit {
            command: "git merge".to_string(),
            code: Some(128),
        };
        assert!(merge_outcome(Err(broken)).is_err());
    }

    fn git_available() -> bool {
        ProcessRunner::new().quote("git", ["--version"]).is_ok()
    }

    #[test]
    fn test_missing_date_uses_fallback() {
        if !git_available() {
            return;
        }
        let meta = CommitMeta {
            message: "undated".to_string(),
            author: Signature::from_hg_user("alice"),
            date: None,
        };
        let mut commits = Vec::new();
        for _ in 0..2 {
            let dir = tempfile::tempdir().unwrap();
            let mut git = GitDestination::new(dir.path(), "git");
            git.init("master", true).unwrap();
            let commit = git.commit(&meta).unwrap();

            let shown = ProcessRunner::new()
                .current_dir(dir.path())
                .quote("git", ["log", "-n1", "--format=%at|%ct", commit.as_str()])
                .unwrap();
            assert_eq!(shown, "0|0");
            commits.push(commit);
        }
        assert_eq!(commits[0], commits[1]);
    }

    #[test]
    fn test_init_and_commit_with_source_metadata() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut git = GitDestination::new(dir.path(), "git");
        let root = git.init("master", true).unwrap().unwrap();
        assert_eq!(root.len(), 40);

        std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        git.add(&["a.txt".to_string()]).unwrap();
        let date = DateTime::parse_from_str("Wed Jan 04 14:26:31 2012 +0900", graph::DATE_FORMAT)
            .unwrap();
        let commit = git
            .commit(&CommitMeta {
                message: "first\n\nHG: 09d459452118".to_string(),
                author: Signature::from_hg_user("HAYAMA_Kaoru <iyahaya@nifty.com>"),
                date: Some(date),
            })
            .unwrap();
        assert_ne!(commit, root);

        let runner = ProcessRunner::new().current_dir(dir.path());
        let shown = runner
            .quote("git", ["log", "-n1", "--format=%an|%ae|%at|%cn|%ct", commit.as_str()])
            .unwrap();
        assert_eq!(
            shown,
            "HAYAMA_Kaoru|iyahaya@nifty.com|1325654791|HAYAMA_Kaoru|1325654791"
        );
        let branch = runner.quote("git", ["rev-parse", "--abbrev-ref", "HEAD"]).unwrap();
        assert_eq!(branch, "master");
    }
}
