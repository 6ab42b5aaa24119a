//! Flatten a resource tree into a canonical path → content map.
//!
//! Per file, in order:
//! 1. the side's path rewrite (remote paths move from the dotted API form to
//!    the active folder convention),
//! 2. the ignore predicate (includes / excludes),
//! 3. classification by [`PathConvention`],
//! 4. the kind skip flags (`skipVariables`, `includeSchedules`, ...),
//! 5. secret filtering for variables,
//! 6. the side's branch policy.
//!
//! Two files landing on the same canonical path is an error, never a silent
//! overwrite.

use std::collections::BTreeMap;
use std::fmt;

use glob::{MatchOptions, Pattern};

use wmsync_core::config::{SpecificItems, SyncOptions};
use wmsync_core::error::ConfigError;
use wmsync_core::paths::PathConvention;
use wmsync_core::types::{normalize_separators, CanonicalPath, ResourceKind};

use crate::error::SyncError;
use crate::side::{BranchContext, Inclusion, Side};
use crate::tree::ResourceTree;

/// Canonical path → file content, ordered by path.
pub type FlattenedTree = BTreeMap<CanonicalPath, String>;

/// Why a file did not make it into a [`FlattenedTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Ignored,
    Unrecognized,
    KindSkipped(ResourceKind),
    Secret,
    BaseSuperseded,
    WrongBranch,
    NotSpecific,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Ignored => f.write_str("ignored"),
            SkipReason::Unrecognized => f.write_str("not a workspace resource"),
            SkipReason::KindSkipped(kind) => write!(f, "{kind} resources are skipped"),
            SkipReason::Secret => f.write_str("secret variable"),
            SkipReason::BaseSuperseded => f.write_str("superseded by branch-specific file"),
            SkipReason::WrongBranch => f.write_str("belongs to another branch"),
            SkipReason::NotSpecific => f.write_str("not configured as branch-specific"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: SkipReason,
}

/// Output of [`flatten`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    pub tree: FlattenedTree,
    pub skipped: Vec<SkippedEntry>,
}

// ---------------------------------------------------------------------------
// Kind flags
// ---------------------------------------------------------------------------

/// Resolved kind switches. `skip*` default to false; `include*` default to
/// false as well, so schedules, triggers, users, groups and settings are
/// opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipFlags {
    pub skip_variables: bool,
    pub skip_resources: bool,
    pub skip_resource_types: bool,
    pub skip_secrets: bool,
    pub skip_scripts: bool,
    pub skip_flows: bool,
    pub skip_apps: bool,
    pub skip_folders: bool,
    pub include_schedules: bool,
    pub include_triggers: bool,
    pub include_users: bool,
    pub include_groups: bool,
    pub include_settings: bool,
}

impl SkipFlags {
    pub fn from_options(options: &SyncOptions) -> Self {
        let flag = |v: Option<bool>| v.unwrap_or(false);
        Self {
            skip_variables: flag(options.skip_variables),
            skip_resources: flag(options.skip_resources),
            skip_resource_types: flag(options.skip_resource_types),
            skip_secrets: flag(options.skip_secrets),
            skip_scripts: flag(options.skip_scripts),
            skip_flows: flag(options.skip_flows),
            skip_apps: flag(options.skip_apps),
            skip_folders: flag(options.skip_folders),
            include_schedules: flag(options.include_schedules),
            include_triggers: flag(options.include_triggers),
            include_users: flag(options.include_users),
            include_groups: flag(options.include_groups),
            include_settings: flag(options.include_settings),
        }
    }

    /// Everything on: every kind included, nothing skipped.
    pub fn everything() -> Self {
        Self {
            include_schedules: true,
            include_triggers: true,
            include_users: true,
            include_groups: true,
            include_settings: true,
            ..Self::default()
        }
    }

    pub fn skips(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Script => self.skip_scripts,
            ResourceKind::Flow => self.skip_flows,
            ResourceKind::App | ResourceKind::RawApp => self.skip_apps,
            ResourceKind::Resource => self.skip_resources,
            ResourceKind::ResourceType => self.skip_resource_types,
            ResourceKind::Variable => self.skip_variables,
            ResourceKind::Folder => self.skip_folders,
            ResourceKind::Schedule => !self.include_schedules,
            ResourceKind::Trigger(_) => !self.include_triggers,
            ResourceKind::User => !self.include_users,
            ResourceKind::Group => !self.include_groups,
            ResourceKind::Settings => !self.include_settings,
        }
    }
}

// ---------------------------------------------------------------------------
// Include / exclude
// ---------------------------------------------------------------------------

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled `includes` / `excludes` globs.
///
/// Include globs only gate workspace items (`f/...`, `u/...`). Workspace-level
/// files such as `settings.yaml` or `groups/*.group.yaml` bypass them and are
/// governed by their kind flags; excludes apply to every path.
#[derive(Debug, Clone)]
pub struct PathFilter {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

fn compile(patterns: Vec<String>) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .into_iter()
        .map(|p| {
            Pattern::new(&p).map_err(|e| ConfigError::InvalidPattern {
                pattern: p.clone(),
                message: e.msg.to_string(),
            })
        })
        .collect()
}

impl PathFilter {
    pub fn from_options(options: &SyncOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            includes: compile(options.include_patterns())?,
            excludes: compile(options.exclude_patterns())?,
        })
    }

    /// Filter that lets every path through.
    pub fn allow_all() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }

    pub fn ignores(&self, path: &str, is_directory: bool) -> bool {
        if is_directory {
            return false;
        }
        let path = normalize_separators(path);
        if self.excludes.iter().any(|p| p.matches_with(&path, MATCH_OPTIONS)) {
            return true;
        }
        let workspace_item = path.starts_with("f/") || path.starts_with("u/");
        workspace_item
            && !self.includes.is_empty()
            && !self.includes.iter().any(|p| p.matches_with(&path, MATCH_OPTIONS))
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Everything [`flatten`] needs besides the tree itself.
pub struct FlattenRequest<'a> {
    pub ignore: &'a dyn Fn(&str, bool) -> bool,
    pub skip: SkipFlags,
    pub convention: PathConvention,
    pub side: Side,
    pub branch: Option<&'a str>,
    pub specific_items: Option<&'a SpecificItems>,
}

fn is_secret_variable(content: &str) -> bool {
    serde_yaml::from_str::<serde_yaml::Value>(content)
        .ok()
        .and_then(|doc| doc.get("is_secret").and_then(serde_yaml::Value::as_bool))
        .unwrap_or(false)
}

/// Flatten `tree` for one side of a sync.
pub fn flatten(tree: &dyn ResourceTree, request: &FlattenRequest<'_>) -> Result<Flattened, SyncError> {
    let ctx = BranchContext {
        branch: request.branch,
        specific_items: request.specific_items,
    };
    let policy = request.side.policy();

    let mut out = Flattened::default();
    let mut sources: BTreeMap<CanonicalPath, String> = BTreeMap::new();
    let skip = |path: String, reason: SkipReason, skipped: &mut Vec<SkippedEntry>| {
        tracing::debug!("{}: skipping {path}: {reason}", policy.name());
        skipped.push(SkippedEntry { path, reason });
    };

    for entry in tree.entries()? {
        if entry.is_directory {
            continue;
        }
        let path = policy.disk_path(&entry.path, request.convention);

        if (request.ignore)(&path, false) {
            skip(path, SkipReason::Ignored, &mut out.skipped);
            continue;
        }
        let Some(kind) = request.convention.classify(&path) else {
            skip(path, SkipReason::Unrecognized, &mut out.skipped);
            continue;
        };
        if request.skip.skips(kind) {
            skip(path, SkipReason::KindSkipped(kind), &mut out.skipped);
            continue;
        }
        let content = entry.content.unwrap_or_default();
        if kind == ResourceKind::Variable && request.skip.skip_secrets && is_secret_variable(&content) {
            skip(path, SkipReason::Secret, &mut out.skipped);
            continue;
        }

        let key = match policy.should_include(&path, &ctx) {
            Inclusion::Included(key) => key,
            Inclusion::SkippedBaseSuperseded => {
                skip(path, SkipReason::BaseSuperseded, &mut out.skipped);
                continue;
            }
            Inclusion::SkippedWrongBranch => {
                skip(path, SkipReason::WrongBranch, &mut out.skipped);
                continue;
            }
            Inclusion::SkippedNotSpecific => {
                skip(path, SkipReason::NotSpecific, &mut out.skipped);
                continue;
            }
        };

        if let Some(first) = sources.get(&key) {
            return Err(SyncError::DuplicatePath {
                path: key.into_string(),
                first: first.clone(),
                second: path,
            });
        }
        sources.insert(key.clone(), path);
        out.tree.insert(key, content);
    }

    tracing::debug!(
        "{}: flattened {} files ({} skipped)",
        policy.name(),
        out.tree.len(),
        out.skipped.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SnapshotTree;

    fn request<'a>(ignore: &'a dyn Fn(&str, bool) -> bool, side: Side) -> FlattenRequest<'a> {
        FlattenRequest {
            ignore,
            skip: SkipFlags::everything(),
            convention: PathConvention::default(),
            side,
            branch: None,
            specific_items: None,
        }
    }

    #[test]
    fn default_includes_gate_workspace_items_only() {
        let filter = PathFilter::from_options(&SyncOptions::default()).unwrap();
        assert!(!filter.ignores("f/a/job.py", false));
        assert!(filter.ignores("u/alice/job.py", false));
        assert!(!filter.ignores("settings.yaml", false));
        assert!(!filter.ignores("u", true));
    }

    #[test]
    fn excludes_win_over_includes() {
        let options = SyncOptions {
            excludes: Some(vec!["f/tmp/**".to_string()]),
            ..Default::default()
        };
        let filter = PathFilter::from_options(&options).unwrap();
        assert!(filter.ignores("f/tmp/x.variable.yaml", false));
        assert!(!filter.ignores("f/keep/x.variable.yaml", false));
    }

    #[test]
    fn bad_glob_is_config_error() {
        let options = SyncOptions {
            includes: Some(vec!["f/[".to_string()]),
            ..Default::default()
        };
        let err = PathFilter::from_options(&options).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn opt_in_kinds_are_skipped_by_default() {
        let flags = SkipFlags::from_options(&SyncOptions::default());
        assert!(flags.skips(ResourceKind::Schedule));
        assert!(flags.skips(ResourceKind::Settings));
        assert!(!flags.skips(ResourceKind::Variable));
        assert!(!flags.skips(ResourceKind::Flow));
    }

    #[test]
    fn unrecognized_and_ignored_files_are_reported() {
        let tree: SnapshotTree = [
            ("f/a/job.py", "print(1)"),
            ("f/a/notes.txt", "hi"),
            ("wmill.yaml", "includes: []"),
        ]
        .into_iter()
        .collect();
        let ignore = |p: &str, _: bool| p == "wmill.yaml";
        let flat = flatten(&tree, &request(&ignore, Side::Remote)).unwrap();
        assert_eq!(flat.tree.len(), 1);
        assert_eq!(
            flat.skipped,
            vec![
                SkippedEntry {
                    path: "f/a/notes.txt".to_string(),
                    reason: SkipReason::Unrecognized
                },
                SkippedEntry {
                    path: "wmill.yaml".to_string(),
                    reason: SkipReason::Ignored
                },
            ]
        );
    }

    #[test]
    fn secrets_dropped_only_when_asked() {
        let tree: SnapshotTree = [
            ("f/a/token.variable.yaml", "value: x\nis_secret: true\n"),
            ("f/a/plain.variable.yaml", "value: y\nis_secret: false\n"),
        ]
        .into_iter()
        .collect();
        let ignore = |_: &str, _: bool| false;

        let keep = flatten(&tree, &request(&ignore, Side::Remote)).unwrap();
        assert_eq!(keep.tree.len(), 2);

        let mut req = request(&ignore, Side::Remote);
        req.skip.skip_secrets = true;
        let dropped = flatten(&tree, &req).unwrap();
        assert_eq!(dropped.tree.len(), 1);
        assert!(dropped
            .tree
            .contains_key(&CanonicalPath::new("f/a/plain.variable.yaml")));
    }

    #[test]
    fn duplicate_canonical_path_is_an_error() {
        let tree: SnapshotTree = [
            ("f\\a\\k.variable.yaml", "a"),
            ("f/a/k.variable.yaml", "b"),
        ]
        .into_iter()
        .collect();
        // Snapshot insertion already merges these two.
        assert_eq!(tree.len(), 1);

        struct Doubled;
        impl ResourceTree for Doubled {
            fn entries(&self) -> Result<Vec<crate::tree::TreeEntry>, SyncError> {
                Ok(vec![
                    crate::tree::TreeEntry::file("f/a/k.variable.yaml", "a"),
                    crate::tree::TreeEntry::file("f\\a\\k.variable.yaml", "b"),
                ])
            }
        }
        let ignore = |_: &str, _: bool| false;
        let err = flatten(&Doubled, &request(&ignore, Side::Remote)).unwrap_err();
        assert!(matches!(err, SyncError::DuplicatePath { .. }), "got: {err}");
    }
}
