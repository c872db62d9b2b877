//! Scoring error types

use thiserror::Error;

/// Error returned by an individual check function.
///
/// The built-in catalog degrades malformed manifest data to a graded result
/// instead of erroring, so in practice this surfaces only genuine bugs in a
/// check implementation.
pub type CheckError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Check {id:?} is already registered for kind {kind}")]
    DuplicateCheckId { id: String, kind: String },

    #[error("Check {check:?} failed on {object}: {source}")]
    CheckFailed {
        check: String,
        object: String,
        #[source]
        source: CheckError,
    },

    #[error("No checks registered")]
    NoChecksRegistered,
}

pub type Result<T> = std::result::Result<T, ScoreError>;
