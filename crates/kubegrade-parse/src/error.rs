//! Parse error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid document at {file}:{line}: {message}")]
    InvalidDocument {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Failed to decode {kind} at {file}:{line}: {source}")]
    Decode {
        kind: String,
        file: String,
        line: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid skip expression {expression:?}: {message}")]
    InvalidSkipExpression { expression: String, message: String },
}

pub type Result<T> = std::result::Result<T, ParseError>;
