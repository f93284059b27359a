/// Problems found while reading `hg log -v` output.
///
/// Everything except [`ParseError::Io`] is a diagnostic: it goes through the
/// caller's policy, which decides whether the line is skipped or the parse
/// aborts.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: missing ':' separator in {text:?}")]
    MissingSeparator { line: usize, text: String },

    #[error("line {line}: {key}: not a supported field")]
    UnknownField { line: usize, key: String },

    #[error("line {line}: {key} field outside of a changeset")]
    OrphanField { line: usize, key: String },

    #[error("line {line}: bad revision {text:?}: {reason}")]
    BadRevision {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("line {line}: bad date {text:?}: {source}")]
    BadDate {
        line: usize,
        text: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("line {line}: changeset lists more than two parents")]
    TooManyParents { line: usize },

    #[error("line {line}: not valid UTF-8, undecodable bytes replaced")]
    InvalidUtf8 { line: usize },

    #[error("failed to read log stream: {0}")]
    Io(#[from] std::io::Error),
}
