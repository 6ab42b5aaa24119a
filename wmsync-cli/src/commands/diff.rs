//! `wmsync diff` — show what a pull or push would change.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use wmsync_core::effective::GitCli;
use wmsync_sync::{
    plan_directories, render_changes, ChangeKind, ChangeSet, ChangeSummary, SkippedEntry,
    SyncDirection, SyncPlan,
};

use super::{current_dir_or, BranchArgs};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    Pull,
    Push,
}

impl From<DirectionArg> for SyncDirection {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::Pull => SyncDirection::Pull,
            DirectionArg::Push => SyncDirection::Push,
        }
    }
}

/// Arguments for `wmsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Directory holding the remote workspace snapshot.
    #[arg(long)]
    pub remote: PathBuf,

    /// Local workspace directory (defaults to the current directory).
    #[arg(long)]
    pub local: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "pull")]
    pub direction: DirectionArg,

    #[command(flatten)]
    pub branch: BranchArgs,

    /// Only print the summary table, no unified diffs.
    #[arg(long)]
    pub stat: bool,

    /// Also list files left out of the comparison and why.
    #[arg(long)]
    pub show_skipped: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let local = current_dir_or(self.local.clone());
        let git = GitCli::new(&local);
        let plan = plan_directories(
            self.direction.into(),
            &local,
            &self.remote,
            &self.branch.resolve_options(self.json),
            &git,
        )
        .with_context(|| {
            format!(
                "failed to compare {} with {}",
                local.display(),
                self.remote.display()
            )
        })?;

        if self.json {
            return print_json(&plan);
        }
        print_plan(&plan, self.stat, self.show_skipped);
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanJson<'a> {
    direction: String,
    branch: Option<&'a str>,
    summary: ChangeSummary,
    changes: &'a ChangeSet,
    skipped: Vec<SkippedJson>,
}

#[derive(Serialize)]
struct SkippedJson {
    side: &'static str,
    path: String,
    reason: String,
}

fn skipped_rows<'a>(
    side: &'static str,
    entries: &'a [SkippedEntry],
) -> impl Iterator<Item = SkippedJson> + 'a {
    entries.iter().map(move |entry| SkippedJson {
        side,
        path: entry.path.clone(),
        reason: entry.reason.to_string(),
    })
}

fn print_json(plan: &SyncPlan) -> Result<()> {
    let payload = PlanJson {
        direction: plan.direction.to_string(),
        branch: plan.branch.as_deref(),
        summary: plan.changes.summary(),
        changes: &plan.changes,
        skipped: skipped_rows("local", &plan.local_skipped)
            .chain(skipped_rows("remote", &plan.remote_skipped))
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "change")]
    change: String,
    #[tabled(rename = "path")]
    path: String,
}

fn change_label(kind: ChangeKind) -> String {
    match kind {
        ChangeKind::Added => "+ added".green().to_string(),
        ChangeKind::Modified => "~ modified".yellow().to_string(),
        ChangeKind::Deleted => "- deleted".red().to_string(),
    }
}

fn print_plan(plan: &SyncPlan, stat: bool, show_skipped: bool) {
    let branch = plan.branch.as_deref().unwrap_or("(no branch)");
    if plan.is_noop() {
        println!("Nothing to {} on {branch}: trees are in sync.", plan.direction);
    } else {
        let summary = plan.changes.summary();
        println!(
            "{} on {branch}: {} added, {} modified, {} deleted",
            plan.direction.to_string().bold(),
            summary.added,
            summary.modified,
            summary.deleted
        );
        let rows: Vec<ChangeRow> = plan
            .changes
            .iter()
            .map(|entry| ChangeRow {
                change: change_label(entry.kind),
                path: entry.path.to_string(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));

        if !stat {
            for diff in render_changes(&plan.changes) {
                print!("{}", diff.unified_diff);
                if !diff.unified_diff.ends_with('\n') {
                    println!();
                }
            }
        }
    }

    if show_skipped {
        for (side, entries) in [("local", &plan.local_skipped), ("remote", &plan.remote_skipped)] {
            for entry in entries {
                println!(
                    "{} {side}: {} ({})",
                    "skip".bright_black(),
                    entry.path,
                    entry.reason
                );
            }
        }
    }
}
