pub mod author;
pub mod config;
pub mod destination;
pub mod git;
pub mod migrate;
pub mod process;
pub mod replay;
pub mod source;

pub use author::Signature;
pub use config::{ConfigError, MigrateConfig};
pub use destination::{CommitId, CommitMeta, Destination, MergeOutcome, MergeSource};
pub use git::GitDestination;
pub use migrate::{MigrateError, Migration};
pub use process::{ProcessError, ProcessRunner};
pub use replay::{
    plan, FileAction, ListedFilesSource, Operation, RecordingDestination, ReplayError, ReplayReport,
    ReplayState, Replayer, StepPlan, StepRecord, Topology,
};
pub use source::{parse_status, FileChanges, HgSource, LogError, Source};
