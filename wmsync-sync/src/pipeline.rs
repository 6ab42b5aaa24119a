//! Pull / push planning shared by the CLI commands.
//!
//! A plan is always computed in full before anything is applied; a failure
//! anywhere discards it.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use wmsync_core::config::{self, SyncConfig};
use wmsync_core::effective::{effective_settings, BranchSource, EffectiveConfig, ResolveOptions};

use crate::error::SyncError;
use crate::flatten::{flatten, FlattenRequest, Flattened, PathFilter, SkipFlags, SkippedEntry};
use crate::reconcile::{reconcile, ChangeSet};
use crate::side::Side;
use crate::tree::{DirTree, ResourceTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Bring the local tree up to date with the remote.
    Pull,
    /// Bring the remote up to date with the local tree.
    Push,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Pull => f.write_str("pull"),
            SyncDirection::Push => f.write_str("push"),
        }
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" => Ok(SyncDirection::Pull),
            "push" => Ok(SyncDirection::Push),
            other => Err(format!("unknown direction '{other}' (expected pull or push)")),
        }
    }
}

/// Result of planning one sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub direction: SyncDirection,
    pub branch: Option<String>,
    pub changes: ChangeSet,
    pub local_skipped: Vec<SkippedEntry>,
    pub remote_skipped: Vec<SkippedEntry>,
}

impl SyncPlan {
    /// True when there is nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

fn flatten_side(
    tree: &dyn ResourceTree,
    side: Side,
    effective: &EffectiveConfig,
    filter: &PathFilter,
) -> Result<Flattened, SyncError> {
    let ignore = |path: &str, is_directory: bool| filter.ignores(path, is_directory);
    let request = FlattenRequest {
        ignore: &ignore,
        skip: SkipFlags::from_options(&effective.options),
        convention: effective.options.path_convention(),
        side,
        branch: effective.branch.as_deref(),
        specific_items: effective.specific_items.as_ref(),
    };
    flatten(tree, &request)
}

/// Plan a sync between two trees under an already resolved configuration.
pub fn plan(
    direction: SyncDirection,
    local: &dyn ResourceTree,
    remote: &dyn ResourceTree,
    effective: &EffectiveConfig,
) -> Result<SyncPlan, SyncError> {
    let filter = PathFilter::from_options(&effective.options)?;
    let local = flatten_side(local, Side::Local, effective, &filter)?;
    let remote = flatten_side(remote, Side::Remote, effective, &filter)?;

    let changes = match direction {
        SyncDirection::Pull => reconcile(&local.tree, &remote.tree),
        SyncDirection::Push => reconcile(&remote.tree, &local.tree),
    };
    let summary = changes.summary();
    tracing::info!(
        "{direction}: {} added, {} modified, {} deleted",
        summary.added,
        summary.modified,
        summary.deleted
    );

    Ok(SyncPlan {
        direction,
        branch: effective.branch.clone(),
        changes,
        local_skipped: local.skipped,
        remote_skipped: remote.skipped,
    })
}

/// Configuration of a local workspace directory; defaults when it has no
/// `wmill.yaml`.
pub fn load_workspace_config(dir: &Path) -> Result<SyncConfig, SyncError> {
    if config::config_path_at(dir).exists() {
        Ok(config::load_at(dir)?)
    } else {
        tracing::debug!("no config in {}, using defaults", dir.display());
        Ok(SyncConfig::default())
    }
}

/// Plan a sync between a local workspace directory and a directory holding a
/// remote snapshot.
pub fn plan_directories(
    direction: SyncDirection,
    local_dir: &Path,
    remote_dir: &Path,
    resolve: &ResolveOptions,
    git: &dyn BranchSource,
) -> Result<SyncPlan, SyncError> {
    let config = load_workspace_config(local_dir)?;
    let effective = effective_settings(&config, resolve, git)?;
    plan(
        direction,
        &DirTree::new(local_dir),
        &DirTree::new(remote_dir),
        &effective,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ChangeKind;
    use crate::tree::SnapshotTree;
    use wmsync_core::effective::StaticBranches;

    #[test]
    fn pull_and_push_are_mirror_images() {
        let local: SnapshotTree = [("f/a/only_local.py", "1")].into_iter().collect();
        let remote: SnapshotTree = [("f/a/only_remote.py", "2")].into_iter().collect();
        let effective = EffectiveConfig::default();

        let pull = plan(SyncDirection::Pull, &local, &remote, &effective).unwrap();
        let push = plan(SyncDirection::Push, &local, &remote, &effective).unwrap();

        let added: Vec<_> = pull.changes.paths(ChangeKind::Added).collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].as_str(), "f/a/only_remote.py");
        let added: Vec<_> = push.changes.paths(ChangeKind::Added).collect();
        assert_eq!(added[0].as_str(), "f/a/only_local.py");
    }

    #[test]
    fn identical_trees_plan_nothing() {
        let tree: SnapshotTree = [("f/a/job.py", "print(1)")].into_iter().collect();
        let plan = plan(SyncDirection::Pull, &tree, &tree, &EffectiveConfig::default()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn direction_parses() {
        assert_eq!("pull".parse::<SyncDirection>(), Ok(SyncDirection::Pull));
        assert!("sideways".parse::<SyncDirection>().is_err());
    }

    #[test]
    fn directories_without_config_use_defaults() {
        let local = tempfile::TempDir::new().unwrap();
        let remote = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(remote.path().join("f/a")).unwrap();
        std::fs::write(remote.path().join("f/a/k.variable.yaml"), "value: 1\n").unwrap();

        let plan = plan_directories(
            SyncDirection::Pull,
            local.path(),
            remote.path(),
            &ResolveOptions::default(),
            &StaticBranches::default(),
        )
        .unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.branch, None);
    }
}
