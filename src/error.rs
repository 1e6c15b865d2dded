use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the blueprint [`Store`](crate::store::Store) and its
/// collaborators.
///
/// `NotFound` and `Closed` are the two sentinel variants the public API
/// contract guarantees: callers match on them directly instead of inspecting
/// error text.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested id has no entry, or the cache is disabled.
    #[error("blueprint not found")]
    NotFound,

    /// The store has been closed; this error is terminal.
    #[error("store is closed")]
    Closed,

    /// Retrieving the remote blob failed (network error, unexpected EOF, ...).
    #[error("failed to retrieve blueprint blob: {0}")]
    RemoteBlob(#[source] anyhow::Error),

    /// The blob or manifest could not be decoded (gzip mismatch, tar
    /// corruption, bad `blueprint.yaml`).
    #[error("failed to decode blueprint: {0}")]
    Decoding(#[source] anyhow::Error),

    /// A filesystem operation that must succeed for the Store to remain
    /// consistent failed.
    #[error("filesystem operation on {path} failed: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store configuration is invalid; fatal at construction time.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn remote_blob(err: impl Into<anyhow::Error>) -> Self {
        StoreError::RemoteBlob(err.into())
    }

    pub fn decoding(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Decoding(err.into())
    }

    /// Whether this is the `NotFound` sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// Whether this is the `Closed` sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, StoreError::Closed)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
