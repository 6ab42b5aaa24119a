//! wmsync core library — resource paths, branch codec, sync configuration.
//!
//! - [`types`] — canonical paths and resource kinds
//! - [`paths`] — folder-suffix conventions ([`PathConvention`])
//! - [`branch`] — branch-qualified paths
//! - [`config`] — `wmill.yaml` schema and loader
//! - [`specific`] — branch-specific item predicates
//! - [`effective`] — effective configuration for a branch
//! - [`error`] — [`ConfigError`], [`PathError`]

pub mod branch;
pub mod config;
pub mod effective;
pub mod error;
pub mod language;
pub mod paths;
pub mod specific;
pub mod types;

pub use config::{BranchConfig, GitBranches, SpecificItems, SyncConfig, SyncOptions};
pub use effective::{
    effective_settings, BranchSource, EffectiveConfig, GitCli, ResolveOptions, StaticBranches,
};
pub use error::{ConfigError, PathError};
pub use language::Language;
pub use paths::{FolderNaming, PathConvention};
pub use types::{CanonicalPath, MetadataFormat, ResourceKind, TriggerKind};
