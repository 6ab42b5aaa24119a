//! Per-side inclusion policy.
//!
//! The remote side stores every resource under its base path and is taken
//! as-is. The local side may hold branch-qualified siblings; for the current
//! branch they replace their base file under the base path.

use wmsync_core::branch::{from_branch_specific_path, is_branch_specific_file, is_current_branch_file};
use wmsync_core::config::SpecificItems;
use wmsync_core::paths::PathConvention;
use wmsync_core::specific::{is_item_type_configured, is_specific_item};
use wmsync_core::types::{normalize_separators, CanonicalPath};

/// What a side decided for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inclusion {
    /// Keep the file under this canonical path.
    Included(CanonicalPath),
    /// A base file whose branch-qualified sibling takes its place.
    SkippedBaseSuperseded,
    /// Branch-qualified for another branch (or no branch is active).
    SkippedWrongBranch,
    /// Branch-qualified for the current branch, but the path is not selected
    /// as specific.
    SkippedNotSpecific,
}

/// Branch state the policy decides against.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchContext<'a> {
    pub branch: Option<&'a str>,
    pub specific_items: Option<&'a SpecificItems>,
}

pub trait SidePolicy {
    fn name(&self) -> &'static str;

    /// Path of `raw` in the on-disk form `convention` describes.
    fn disk_path(&self, raw: &str, _convention: PathConvention) -> String {
        normalize_separators(raw)
    }

    fn should_include(&self, path: &str, ctx: &BranchContext<'_>) -> Inclusion;
}

/// Remote trees never contain branch-qualified names under their base form,
/// so everything passes through unchanged. Their paths arrive in the dotted
/// API form and are rewritten to the local folder convention first.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteSide;

impl SidePolicy for RemoteSide {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn disk_path(&self, raw: &str, convention: PathConvention) -> String {
        convention.api_path_to_disk(raw)
    }

    fn should_include(&self, path: &str, _ctx: &BranchContext<'_>) -> Inclusion {
        Inclusion::Included(CanonicalPath::new(path))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSide;

impl SidePolicy for LocalSide {
    fn name(&self) -> &'static str {
        "local"
    }

    fn should_include(&self, path: &str, ctx: &BranchContext<'_>) -> Inclusion {
        let items = ctx.specific_items;

        // Kinds absent from the specific-items block keep their own path.
        if is_branch_specific_file(path) && is_item_type_configured(path, items) {
            let Some(branch) = ctx.branch else {
                return Inclusion::SkippedWrongBranch;
            };
            if !is_current_branch_file(path, branch) {
                return Inclusion::SkippedWrongBranch;
            }
            let base = from_branch_specific_path(path, branch);
            if !is_specific_item(&base, items) {
                return Inclusion::SkippedNotSpecific;
            }
            return Inclusion::Included(CanonicalPath::new(base));
        }

        if ctx.branch.is_some() && is_specific_item(path, items) {
            return Inclusion::SkippedBaseSuperseded;
        }
        Inclusion::Included(CanonicalPath::new(path))
    }
}

/// Which side of a sync a tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    pub fn policy(self) -> &'static dyn SidePolicy {
        match self {
            Side::Local => &LocalSide,
            Side::Remote => &RemoteSide,
        }
    }
}
