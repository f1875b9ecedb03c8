//! Error types shared by the stores, the asset layer and the editor.

use std::fmt;

use crate::content::ValidationError;

/// Failure talking to the content backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("request to content API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content API answered {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("record not found")]
    NotFound,

    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),

    #[error("content backend is not configured")]
    Unavailable,
}

/// Failure talking to the asset store (upload or delete).
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("asset store answered {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected asset store response: {0}")]
    Malformed(String),

    #[error("{failed} of {total} images could not be deleted")]
    Incomplete { failed: usize, total: usize },

    #[error("asset store is not configured")]
    Unavailable,
}

/// Which image slot an upload was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Main,
    Gallery,
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadTarget::Main => f.write_str("main image"),
            UploadTarget::Gallery => f.write_str("gallery"),
        }
    }
}

/// Which backend write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOp::Insert => f.write_str("insert"),
            WriteOp::Update => f.write_str("update"),
            WriteOp::Delete => f.write_str("delete"),
        }
    }
}

/// Outcome of an editor operation that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("{target} upload failed")]
    UploadFailed {
        target: UploadTarget,
        #[source]
        source: AssetError,
    },

    #[error("remote image deletion failed")]
    RemoteDeleteFailed(#[source] AssetError),

    #[error("backend {op} failed")]
    BackendWriteFailed {
        op: WriteOp,
        #[source]
        source: StoreError,
    },

    #[error("backend read failed")]
    BackendReadFailed(#[source] StoreError),

    #[error("invalid form: {0}")]
    Validation(#[from] ValidationError),

    #[error("an operation is already in progress")]
    Busy,

    #[error("deletion was not confirmed")]
    Cancelled,
}
