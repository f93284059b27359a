use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one conversion run.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    /// Branch the last-touched line of history ends up on
    pub main_branch: String,
    /// Prefix of branches created for forks
    pub fork_prefix: String,
    /// Zero padding of the fork counter
    pub fork_width: usize,
    /// Start the destination with an empty root commit that the null revision maps to
    pub empty_root: bool,
    /// Append `HG: <changeset id>` to every commit message
    pub source_id_trailer: bool,
    /// Replay source tags as lightweight tags
    pub tags: bool,
    /// Compact the destination repository when done
    pub compact: bool,
    /// Abort on log or graph diagnostics instead of warning
    pub strict: bool,
    /// Abort when a single file cannot be added or removed
    pub strict_files: bool,
    /// Mercurial executable
    pub hg: String,
    /// Git executable
    pub git: String,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            main_branch: "master".to_string(),
            fork_prefix: "fork".to_string(),
            fork_width: 4,
            empty_root: true,
            source_id_trailer: true,
            tags: true,
            compact: true,
            strict: false,
            strict_files: false,
            hg: "hg".to_string(),
            git: "git".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl MigrateConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce clashing or empty branch names
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.main_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("main_branch is empty".to_string()));
        }
        if self.fork_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("fork_prefix is empty".to_string()));
        }
        if let Some(rest) = self.main_branch.strip_prefix(&self.fork_prefix) {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::Invalid(format!(
                    "main_branch {:?} collides with fork branch names",
                    self.main_branch
                )));
            }
        }
        Ok(())
    }

    /// Name of the branch created by the `counter`-th fork
    pub fn fork_branch_name(&self, counter: u32) -> String {
        format!("{}{:0width$}", self.fork_prefix, counter, width = self.fork_width)
    }
}
