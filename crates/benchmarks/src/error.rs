//! Errors raised by the history store and its file I/O.

use benchwatch_core::MalformedRunError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while appending to, loading or saving the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Run failed structural validation
    #[error(transparent)]
    MalformedRun(#[from] MalformedRunError),

    /// Run is dated before the last run already stored for its tool
    #[error(
        "run for commit {commit_id} dated {date} is older than the last {tool} run ({last_date})"
    )]
    OutOfOrder {
        /// Tool the run was appended to
        tool: String,
        /// Commit of the rejected run
        commit_id: String,
        /// Date of the rejected run
        date: i64,
        /// Date of the most recent stored run
        last_date: i64,
    },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File contents are not a benchmark document
    #[error("Invalid benchmark document {}: {source}", path.display())]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
