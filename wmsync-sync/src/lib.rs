//! # wmsync-sync
//!
//! Turns two resource trees into a change set, and keeps dependency locks
//! from being resolved more than once.
//!
//! [`plan`] flattens the local and remote trees under an effective
//! configuration and reconciles them. [`LockCache`] memoizes lock
//! resolution per dependency digest; [`lock_state`] tracks which locks are
//! stale on disk.

pub mod diff;
pub mod error;
pub mod flatten;
pub mod lock_cache;
pub mod lock_state;
pub mod pipeline;
pub mod reconcile;
pub mod side;
pub mod tree;

pub use diff::{render_change, render_changes, FileDiff};
pub use error::{LockError, SyncError};
pub use flatten::{
    flatten, FlattenRequest, Flattened, FlattenedTree, PathFilter, SkipFlags, SkipReason,
    SkippedEntry,
};
pub use lock_cache::{
    compute_lock_cache_key, extract_annotation, workspace_dependencies_for, AnnotationMode,
    DependencyAnnotation, LockCache, LockRequest, LockResolver,
};
pub use lock_state::{LockState, LockStatus};
pub use pipeline::{plan, plan_directories, SyncDirection, SyncPlan};
pub use reconcile::{reconcile, ChangeEntry, ChangeKind, ChangeSet, ChangeSummary};
pub use side::{BranchContext, Inclusion, LocalSide, RemoteSide, Side, SidePolicy};
pub use tree::{DirTree, ResourceTree, SnapshotTree, TreeEntry};
