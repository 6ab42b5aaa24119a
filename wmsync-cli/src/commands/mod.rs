pub mod config;
pub mod diff;
pub mod lock_key;

use std::path::PathBuf;

use clap::Args;

use wmsync_core::effective::ResolveOptions;

/// Branch selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct BranchArgs {
    /// Resolve for this branch instead of the checked-out one.
    #[arg(long)]
    pub branch: Option<String>,

    /// Apply this branch's `promotionOverrides`.
    #[arg(long)]
    pub promotion: Option<String>,

    /// Accept `--branch` without checking that git knows it.
    #[arg(long)]
    pub skip_branch_validation: bool,
}

impl BranchArgs {
    pub fn resolve_options(&self, suppress_logs: bool) -> ResolveOptions {
        ResolveOptions {
            promotion: self.promotion.clone(),
            skip_branch_validation: self.skip_branch_validation,
            suppress_logs,
            branch_override: self.branch.clone(),
        }
    }
}

pub fn current_dir_or(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from("."))
}
