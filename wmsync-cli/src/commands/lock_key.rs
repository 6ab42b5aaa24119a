//! `wmsync lock-key <script>` — dependency cache key and lock freshness of
//! one script.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;

use wmsync_core::language::Language;
use wmsync_core::types::normalize_separators;
use wmsync_sync::lock_cache::DEPENDENCIES_DIR;
use wmsync_sync::lock_state::{self, generate_script_hash, LockStatus};
use wmsync_sync::pipeline::load_workspace_config;
use wmsync_sync::{extract_annotation, DirTree, LockRequest, ResourceTree};

use super::current_dir_or;

/// Arguments for `wmsync lock-key`.
#[derive(Args, Debug)]
pub struct LockKeyArgs {
    /// Script path, relative to the workspace directory.
    pub script: String,

    /// Workspace directory (defaults to the current directory).
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

fn dependency_files(workspace: &Path) -> Result<BTreeMap<String, String>> {
    let dir = workspace.join(DEPENDENCIES_DIR);
    if !dir.is_dir() {
        return Ok(BTreeMap::new());
    }
    let entries = DirTree::new(&dir)
        .entries()
        .with_context(|| format!("failed to read {}", dir.display()))?;
    Ok(entries
        .into_iter()
        .filter(|e| !e.is_directory)
        .map(|e| {
            (
                format!("{DEPENDENCIES_DIR}{}", e.path),
                e.content.unwrap_or_default(),
            )
        })
        .collect())
}

/// `f/a/job.bun.ts` → `f/a/job.script.yaml`, read when present.
fn script_metadata(workspace: &Path, script: &str) -> Result<String> {
    let (dir, name) = script.rsplit_once('/').unwrap_or(("", script));
    let stem = name.split('.').next().unwrap_or(name);
    let meta = if dir.is_empty() {
        workspace.join(format!("{stem}.script.yaml"))
    } else {
        workspace.join(format!("{dir}/{stem}.script.yaml"))
    };
    match std::fs::read_to_string(&meta) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", meta.display())),
    }
}

impl LockKeyArgs {
    pub fn run(self) -> Result<()> {
        let workspace = current_dir_or(self.dir.clone());
        let script = normalize_separators(&self.script);
        let config = load_workspace_config(&workspace)
            .with_context(|| format!("failed to load config in {}", workspace.display()))?;

        let language = Language::from_script_path(&script, config.options.default_ts())
            .ok_or_else(|| anyhow!("cannot infer the language of '{script}'"))?;
        let path = workspace.join(&script);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let files = dependency_files(&workspace)?;
        let request = LockRequest::for_script(&script, language, content, &files);
        let metadata = script_metadata(&workspace, &script)?;
        let hash = generate_script_hash(
            &request.raw_workspace_dependencies,
            &request.content,
            &metadata,
        );
        let state = lock_state::load_at(&workspace).context("failed to load lock state")?;

        println!("{} {script} ({language})", "script".bold());
        match extract_annotation(&request.content, language) {
            Some(annotation) => println!(
                "annotation: {} [{}]{}",
                annotation.mode.as_str(),
                annotation.external.join(", "),
                if annotation.inline.is_some() { " + inline" } else { "" }
            ),
            None => println!("annotation: none"),
        }
        if request.raw_workspace_dependencies.is_empty() {
            println!("workspace dependencies: none (resolved without the shared cache)");
        } else {
            println!("workspace dependencies:");
            for path in request.raw_workspace_dependencies.keys() {
                println!("  {path}");
            }
        }
        println!("cache key: {}", request.cache_key());

        let status = match state.status(&script, None, &hash) {
            LockStatus::Current => "up to date".green().to_string(),
            LockStatus::Stale { .. } => "stale".yellow().to_string(),
            LockStatus::Untracked => "untracked".bright_black().to_string(),
        };
        println!("lock: {status}");
        Ok(())
    }
}
