//! Effective configuration for a branch.
//!
//! Resolution order:
//! 1. Reject `gitBranches` names that sanitize to the same segment.
//! 2. Pick the branch: an explicit override (verified against git unless
//!    validation is skipped) or the repository's current branch.
//! 3. Overlay `promotionOverrides` of the promotion branch when requested,
//!    otherwise the branch's own `overrides`.
//! 4. Merge specific items for the branch.
//!
//! A branch absent from `gitBranches` is valid: the base settings apply.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::branch::find_sanitization_collision;
use crate::config::{SpecificItems, SyncConfig, SyncOptions};
use crate::error::ConfigError;
use crate::specific::specific_items_for_branch;

// ---------------------------------------------------------------------------
// Git collaborator
// ---------------------------------------------------------------------------

/// Source of truth for git branch names.
pub trait BranchSource {
    /// Currently checked-out branch, `None` outside a repository or on a
    /// detached HEAD.
    fn current_branch(&self) -> Result<Option<String>, ConfigError>;

    /// Whether `branch` exists locally or on a remote.
    fn branch_exists(&self, branch: &str) -> Result<bool, ConfigError>;
}

/// [`BranchSource`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn git(&self, args: &[&str]) -> Result<std::process::Output, ConfigError> {
        Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|e| ConfigError::Git(format!("failed to run git: {e}")))
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }
}

impl BranchSource for GitCli {
    fn current_branch(&self) -> Result<Option<String>, ConfigError> {
        let output = match self.git(&["rev-parse", "--abbrev-ref", "HEAD"]) {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("{e}; assuming no branch");
                return Ok(None);
            }
        };
        if !output.status.success() {
            tracing::debug!(
                "git rev-parse failed in {}: {}",
                self.repo.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if name.is_empty() || name == "HEAD" {
            return Ok(None);
        }
        Ok(Some(name))
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, ConfigError> {
        let inside = self.git(&["rev-parse", "--is-inside-work-tree"])?;
        if !inside.status.success() {
            return Err(ConfigError::Git(format!(
                "{} is not a git repository",
                self.repo.display()
            )));
        }
        for reference in [
            format!("refs/heads/{branch}"),
            format!("refs/remotes/origin/{branch}"),
        ] {
            let output = self.git(&["rev-parse", "--verify", "--quiet", &reference])?;
            if output.status.success() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Fixed answers, for callers that already know the branch (and for tests).
#[derive(Debug, Clone, Default)]
pub struct StaticBranches {
    pub current: Option<String>,
    pub known: Vec<String>,
}

impl StaticBranches {
    pub fn on(branch: &str) -> Self {
        Self {
            current: Some(branch.to_string()),
            known: vec![branch.to_string()],
        }
    }
}

impl BranchSource for StaticBranches {
    fn current_branch(&self) -> Result<Option<String>, ConfigError> {
        Ok(self.current.clone())
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, ConfigError> {
        Ok(self.known.iter().any(|b| b == branch))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Knobs for [`effective_settings`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Apply this branch's `promotionOverrides` instead of the current
    /// branch's `overrides`.
    pub promotion: Option<String>,
    pub skip_branch_validation: bool,
    pub suppress_logs: bool,
    /// Use this branch instead of asking git for the current one.
    pub branch_override: Option<String>,
}

/// Configuration actually applied for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectiveConfig {
    pub options: SyncOptions,
    pub branch: Option<String>,
    pub specific_items: Option<SpecificItems>,
}

fn check_branch_names(config: &SyncConfig) -> Result<(), ConfigError> {
    let Some(git) = &config.git_branches else {
        return Ok(());
    };
    match find_sanitization_collision(git.branches.keys().map(String::as_str)) {
        Some((first, second, sanitized)) => Err(ConfigError::BranchNameCollision {
            first,
            second,
            sanitized,
        }),
        None => Ok(()),
    }
}

fn resolve_branch(
    options: &ResolveOptions,
    git: &dyn BranchSource,
) -> Result<Option<String>, ConfigError> {
    let Some(branch) = &options.branch_override else {
        return git.current_branch();
    };
    if options.skip_branch_validation {
        return Ok(Some(branch.clone()));
    }
    match git.branch_exists(branch) {
        Ok(true) => Ok(Some(branch.clone())),
        Ok(false) => Err(ConfigError::UnverifiedBranch {
            branch: branch.clone(),
            reason: "no such local or remote branch".to_string(),
        }),
        Err(e) => Err(ConfigError::UnverifiedBranch {
            branch: branch.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Resolve the configuration for the current (or overridden) branch.
pub fn effective_settings(
    config: &SyncConfig,
    options: &ResolveOptions,
    git: &dyn BranchSource,
) -> Result<EffectiveConfig, ConfigError> {
    check_branch_names(config)?;
    let branch = resolve_branch(options, git)?;

    let mut effective = EffectiveConfig {
        options: config.options.clone(),
        branch: branch.clone(),
        specific_items: None,
    };
    let Some(branch) = branch else {
        return Ok(effective);
    };

    let promoted = options
        .promotion
        .as_deref()
        .and_then(|p| config.branch(p).map(|b| (p, b)))
        .and_then(|(p, b)| b.promotion_overrides.as_ref().map(|o| (p, o)));

    if let Some((promotion, overrides)) = promoted {
        effective.options = effective.options.overlay(overrides);
        if !options.suppress_logs {
            tracing::info!("applied promotion settings from branch '{promotion}'");
        }
    } else if let Some(overrides) = config.branch(&branch).and_then(|b| b.overrides.as_ref()) {
        effective.options = effective.options.overlay(overrides);
        if !options.suppress_logs {
            tracing::info!("applied branch-specific overrides for '{branch}'");
        }
    } else if !options.suppress_logs {
        tracing::debug!("no overrides configured for branch '{branch}'");
    }

    effective.specific_items = specific_items_for_branch(config, &branch);
    Ok(effective)
}
