//! `wmsync config` — print the configuration a branch actually gets.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use wmsync_core::config::{SpecificItems, SyncOptions};
use wmsync_core::effective::{effective_settings, GitCli};
use wmsync_sync::pipeline::load_workspace_config;

use super::{current_dir_or, BranchArgs};

/// Arguments for `wmsync config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Workspace directory holding `wmill.yaml` (defaults to the current directory).
    #[arg(long)]
    pub dir: Option<PathBuf>,

    #[command(flatten)]
    pub branch: BranchArgs,

    /// Emit JSON instead of YAML.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EffectiveView<'a> {
    branch: Option<&'a str>,
    #[serde(flatten)]
    options: &'a SyncOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    specific_items: Option<&'a SpecificItems>,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let dir = current_dir_or(self.dir.clone());
        let config = load_workspace_config(&dir)
            .with_context(|| format!("failed to load config in {}", dir.display()))?;
        let effective = effective_settings(
            &config,
            &self.branch.resolve_options(true),
            &GitCli::new(&dir),
        )
        .context("failed to resolve effective configuration")?;

        let view = EffectiveView {
            branch: effective.branch.as_deref(),
            options: &effective.options,
            specific_items: effective.specific_items.as_ref(),
        };
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&view).context("failed to serialize config JSON")?
            );
        } else {
            print!(
                "{}",
                serde_yaml::to_string(&view).context("failed to serialize config YAML")?
            );
        }
        Ok(())
    }
}
