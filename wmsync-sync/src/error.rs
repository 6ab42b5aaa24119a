//! Error types for wmsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use wmsync_core::error::{ConfigError, PathError};

/// All errors that can arise while flattening, reconciling or tracking locks.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration could not be loaded or resolved.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("path error: {0}")]
    Path(#[from] PathError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two files of the same tree flattened to one canonical path.
    #[error("'{first}' and '{second}' both map to '{path}'")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },

    /// YAML error in the lock state file.
    #[error("lock state YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Failure reported by a [`LockResolver`](crate::lock_cache::LockResolver).
///
/// Failures are never cached: the next request for the same key resolves again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("lock resolution failed for {path}: {message}")]
    Resolution { path: String, message: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
