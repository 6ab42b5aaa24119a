//! Error types for wmsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or resolving sync configuration.
///
/// All of these are fatal and surface before any tree is walked.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration file did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// A glob in `includes`, `excludes` or a specific-items list is malformed.
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An explicit branch override could not be verified against git.
    #[error("branch '{branch}' could not be verified against the git repository: {reason}")]
    UnverifiedBranch { branch: String, reason: String },

    /// Two `gitBranches` entries sanitize to the same file-name segment.
    #[error("git branches '{first}' and '{second}' both map to branch segment '{sanitized}'")]
    BranchNameCollision {
        first: String,
        second: String,
        sanitized: String,
    },

    /// The git collaborator failed (binary missing, not a repository, ...).
    #[error("git error: {0}")]
    Git(String),
}

/// Errors raised when a path is expected to carry a resource suffix but does not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path '{path}' does not end with expected suffix '{suffix}'")]
    MissingSuffix { path: String, suffix: String },

    #[error("'{kind}' resources are not stored as a single file")]
    NotSingleFile { kind: String },
}
