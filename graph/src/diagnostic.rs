//! Ready-made diagnostic policies.
//!
//! Recoverable problems (a malformed log line, a duplicate serial, a file that
//! could not be staged) are handed to a caller-supplied callback of shape
//! `FnMut(E) -> Result<(), E>`. Returning `Ok(())` skips the problem and keeps
//! going; returning the error aborts the surrounding operation with it.

use std::fmt::Display;

/// Log the problem as a warning and continue
pub fn warn<E: Display>(err: E) -> Result<(), E> {
    tracing::warn!("{err}");
    Ok(())
}

/// Abort on the first problem
pub fn abort<E>(err: E) -> Result<(), E> {
    Err(err)
}

/// Pick [`abort`] when `strict`, [`warn`] otherwise
pub fn policy<E: Display>(strict: bool) -> fn(E) -> Result<(), E> {
    if strict {
        abort
    } else {
        warn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_selection() {
        assert_eq!(policy::<String>(false)("skip me".to_string()), Ok(()));
        assert_eq!(
            policy::<String>(true)("stop".to_string()),
            Err("stop".to_string())
        );
    }
}
