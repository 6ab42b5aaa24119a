//! Persisted lock state: which script content each generated lock was
//! computed from.
//!
//! Stored as `wmill-lock.yaml` at the workspace root:
//!
//! ```yaml
//! version: v2
//! locks:
//!   f/etl/extract.py: 1f3a...
//!   f/etl/daily.flow+inline_script_0.py: 9b2c...
//! ```
//!
//! Keys always use `/`. Nested content (an inline script of a flow) is keyed
//! `base + "+" + subpath`. Writes use the `.tmp` + rename pattern of the
//! config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use wmsync_core::types::normalize_separators;

use crate::error::{io_err, SyncError};

pub const LOCK_FILE_NAME: &str = "wmill-lock.yaml";
pub const LOCK_STATE_VERSION: &str = "v2";

/// On-disk lock state payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub version: String,
    #[serde(default)]
    pub locks: BTreeMap<String, String>,
}

impl Default for LockState {
    fn default() -> Self {
        Self {
            version: LOCK_STATE_VERSION.to_string(),
            locks: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LockStateCompat {
    Structured(LockStateStructuredCompat),
    Legacy(BTreeMap<String, String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LockStateStructuredCompat {
    version: Option<String>,
    locks: Option<BTreeMap<String, String>>,
}

/// How a path's recorded hash compares to its current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Current,
    Stale { recorded: String },
    Untracked,
}

/// Lock state key for `path`, or for `subpath` nested inside it.
pub fn lock_key(path: &str, subpath: Option<&str>) -> String {
    let base = normalize_separators(path);
    match subpath {
        Some(sub) => format!("{base}+{}", normalize_separators(sub)),
        None => base,
    }
}

impl LockState {
    pub fn status(&self, path: &str, subpath: Option<&str>, hash: &str) -> LockStatus {
        match self.locks.get(&lock_key(path, subpath)) {
            Some(recorded) if recorded == hash => LockStatus::Current,
            Some(recorded) => LockStatus::Stale {
                recorded: recorded.clone(),
            },
            None => LockStatus::Untracked,
        }
    }

    pub fn is_up_to_date(&self, path: &str, subpath: Option<&str>, hash: &str) -> bool {
        self.status(path, subpath, hash) == LockStatus::Current
    }

    pub fn update(&mut self, path: &str, subpath: Option<&str>, hash: impl Into<String>) {
        self.locks.insert(lock_key(path, subpath), hash.into());
    }

    /// Drop `path` and every key nested under it. Returns how many were removed.
    pub fn remove(&mut self, path: &str) -> usize {
        let base = normalize_separators(path);
        let nested = format!("{base}+");
        let before = self.locks.len();
        self.locks
            .retain(|key, _| key != &base && !key.starts_with(&nested));
        before - self.locks.len()
    }
}

/// Hash of everything a script's lock depends on.
///
/// Dependency files are hashed in path order so map order never matters.
pub fn generate_script_hash(
    raw_workspace_dependencies: &BTreeMap<String, String>,
    content: &str,
    metadata: &str,
) -> String {
    let mut hasher = Sha256::new();
    for (path, deps) in raw_workspace_dependencies {
        hasher.update(normalize_separators(path).as_bytes());
        hasher.update([0u8]);
        hasher.update(deps.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(content.as_bytes());
    hasher.update([0u8]);
    hasher.update(metadata.as_bytes());
    hex::encode(hasher.finalize())
}

/// `<dir>/wmill-lock.yaml`
pub fn lock_path_at(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE_NAME)
}

/// Load the lock state in `dir`.
///
/// Returns an empty state if the file does not exist yet. A legacy flat
/// `path: hash` map is migrated, with keys normalized.
pub fn load_at(dir: &Path) -> Result<LockState, SyncError> {
    let path = lock_path_at(dir);
    if !path.exists() {
        return Ok(LockState::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(LockState::default());
    }
    let (version, locks) = match serde_yaml::from_str::<LockStateCompat>(&contents)? {
        LockStateCompat::Structured(state) => (
            state.version.unwrap_or_else(|| LOCK_STATE_VERSION.to_string()),
            state.locks.unwrap_or_default(),
        ),
        LockStateCompat::Legacy(locks) => {
            tracing::debug!("migrating legacy lock state at {}", path.display());
            (LOCK_STATE_VERSION.to_string(), locks)
        }
    };
    let locks = locks
        .into_iter()
        .map(|(key, hash)| (normalize_separators(&key), hash))
        .collect();
    Ok(LockState { version, locks })
}

/// Save the lock state in `dir` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(dir: &Path, state: &LockState) -> Result<(), SyncError> {
    let path = lock_path_at(dir);
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = serde_yaml::to_string(state)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, &yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
